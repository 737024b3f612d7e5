//! Metrics & Baseline Resolver: propagates font metrics down the tree,
//! computes baseline-shift and alignment-baseline offsets, and caches
//! per-node decoration line metrics for the decoration generator.

use hashbrown::HashMap;
use kurbo::Vec2;

use crate::font::{FontBook, FontMetrics, LineMetrics};
use crate::layout::line::LineBox;
use crate::layout::result::CharacterResult;
use crate::style::{Baseline, BaselineShift, DecorationType};
use crate::tree::IndexedTree;

/// Decoration thickness and block-axis offsets for one node, in points.
/// Overline offsets come from measured ink later; only its thickness is
/// meaningful here.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecorationMetrics {
    pub underline: LineMetrics,
    pub overline: LineMetrics,
    pub line_through: LineMetrics,
}

impl DecorationMetrics {
    pub fn get(&self, kind: DecorationType) -> LineMetrics {
        match kind {
            DecorationType::Underline => self.underline,
            DecorationType::Overline => self.overline,
            DecorationType::LineThrough => self.line_through,
        }
    }
}

/// Pre-order walk resolving baseline tables and adding the combined
/// baseline shift to every character's `baseline_offset`.
pub fn compute_font_metrics(
    tree: &IndexedTree<'_>,
    book: &mut FontBook,
    result: &mut [CharacterResult],
    horizontal: bool,
) -> HashMap<usize, DecorationMetrics> {
    let mut decorations = HashMap::new();
    resolve_node(
        tree,
        0,
        book,
        result,
        horizontal,
        &FontMetrics::empty(),
        0.0,
        Vec2::ZERO,
        Vec2::ZERO,
        &mut decorations,
    );
    decorations
}

#[allow(clippy::too_many_arguments)]
fn resolve_node(
    tree: &IndexedTree<'_>,
    id: usize,
    book: &mut FontBook,
    result: &mut [CharacterResult],
    horizontal: bool,
    parent_table: &FontMetrics,
    parent_font_size: f64,
    super_script: Vec2,
    sub_script: Vec2,
    decorations: &mut HashMap<usize, DecorationMetrics>,
) {
    let indexed = &tree.nodes[id];
    let style = &indexed.node.style;
    let font_size = style.font_size;
    let range = indexed.range.clone();

    let baseline_shift_total = match style.baseline_shift {
        BaselineShift::Super => {
            if horizontal {
                super_script
            } else {
                Vec2::new(-super_script.y, super_script.x)
            }
        }
        BaselineShift::Sub => {
            if horizontal {
                sub_script
            } else {
                Vec2::new(-sub_script.y, sub_script.x)
            }
        }
        // Positive shift goes up in the inline direction: up in
        // horizontal, right in vertical.
        BaselineShift::Length(v) => {
            if horizontal {
                Vec2::new(0.0, -v)
            } else {
                Vec2::new(v, 0.0)
            }
        }
        BaselineShift::None => Vec2::ZERO,
    };

    let fresh = book
        .query(&style.font)
        .map(|face| face.metrics(font_size))
        .unwrap_or_else(|| {
            if parent_font_size > 0.0 {
                parent_table.scaled(font_size / parent_font_size)
            } else {
                FontMetrics::empty()
            }
        });

    let mut dominant = style.dominant_baseline;
    let metrics = if dominant == Baseline::ResetSize && parent_font_size > 0.0 {
        dominant = Baseline::Auto;
        parent_table.scaled(font_size / parent_font_size)
    } else if dominant == Baseline::NoChange {
        dominant = Baseline::Auto;
        *parent_table
    } else {
        fresh
    };

    let new_super = metrics.super_offset;
    let new_sub = metrics.sub_offset;

    decorations.insert(
        id,
        DecorationMetrics {
            underline: metrics.underline,
            overline: LineMetrics {
                offset: 0.0,
                thickness: metrics.underline.thickness,
            },
            line_through: LineMetrics {
                // Strikeout offsets point up; block-axis offsets are
                // positive down.
                offset: -metrics.strikeout.offset,
                thickness: metrics.strikeout.thickness,
            },
        },
    );

    for child in indexed.children.clone() {
        resolve_node(
            tree, child, book, result, horizontal, &metrics, font_size, new_super, new_sub,
            decorations,
        );
    }

    let mut baseline_adjust = style.alignment_baseline;
    if baseline_adjust == Baseline::Auto || baseline_adjust == Baseline::UseScript {
        baseline_adjust = dominant;
    }
    if baseline_adjust == Baseline::Auto || baseline_adjust == Baseline::UseScript {
        baseline_adjust = if horizontal {
            Baseline::Alphabetic
        } else {
            Baseline::Central
        };
    }

    let mut shift = Vec2::ZERO;
    // text-top and text-bottom need the final line extents and are
    // handled after line breaking.
    if baseline_adjust != Baseline::TextTop && baseline_adjust != Baseline::TextBottom {
        let offset = parent_table.baseline_value(baseline_adjust) - metrics.baseline_value(baseline_adjust);
        shift = if horizontal {
            Vec2::new(0.0, -offset)
        } else {
            Vec2::new(offset, 0.0)
        };
    }
    shift += baseline_shift_total;

    for k in range {
        if k < result.len() {
            result[k].baseline_offset += shift;
        }
    }
}

/// Ascent/descent contribution of one character to its line.
pub fn line_height_contribution(cr: &CharacterResult, _horizontal: bool) -> (f64, f64) {
    (
        cr.metrics.ascent + cr.half_leading,
        cr.metrics.descent + cr.half_leading,
    )
}

/// Second baseline pass: `text-top`/`text-bottom` alignment against the
/// owning line's anchors, now that lines exist.
pub fn handle_line_box_alignment(
    tree: &IndexedTree<'_>,
    result: &mut [CharacterResult],
    lines: &[LineBox],
    horizontal: bool,
) {
    align_node(tree, 0, result, lines, horizontal);
}

fn align_node(
    tree: &IndexedTree<'_>,
    id: usize,
    result: &mut [CharacterResult],
    lines: &[LineBox],
    horizontal: bool,
) {
    let indexed = &tree.nodes[id];
    let baseline_adjust = indexed.node.style.alignment_baseline;
    let range = indexed.range.clone();

    for child in indexed.children.clone() {
        align_node(tree, child, result, lines, horizontal);
    }

    let mut shift = Vec2::ZERO;
    if baseline_adjust == Baseline::TextTop || baseline_adjust == Baseline::TextBottom {
        let relevant = lines
            .iter()
            .find(|line| {
                line.chunks
                    .iter()
                    .any(|chunk| chunk.indices.contains(&range.start))
            })
            .cloned()
            .unwrap_or_default();

        let mut ascent: f64 = 0.0;
        let mut descent: f64 = 0.0;
        for k in range.clone() {
            if k < result.len() {
                let (a, d) = line_height_contribution(&result[k], horizontal);
                ascent = ascent.max(a);
                descent = descent.max(d);
            }
        }

        if baseline_adjust == Baseline::TextTop {
            // Subtree top edge sits at -ascent from its baseline
            // (horizontal); move it onto the line's top anchor.
            let subtree_top = if horizontal {
                Vec2::new(0.0, -ascent)
            } else {
                Vec2::new(ascent, 0.0)
            };
            shift = relevant.baseline_top - subtree_top;
        } else {
            let subtree_bottom = if horizontal {
                Vec2::new(0.0, descent)
            } else {
                Vec2::new(-descent, 0.0)
            };
            shift = relevant.baseline_bottom - subtree_bottom;
        }
    }

    for k in range {
        if k < result.len() {
            let cr = &mut result[k];
            cr.css_position += shift;
            cr.final_position = cr.css_position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::collect::collect;
    use crate::style::TextStyle;
    use crate::tree::ContentNode;

    #[test]
    fn baseline_shift_length_moves_up_in_horizontal() {
        let mut style = TextStyle::default();
        style.baseline_shift = BaselineShift::Length(3.0);
        let root = ContentNode::leaf("ab", style);
        let flat = collect(&root);
        let mut result = vec![CharacterResult::default(); 2];
        let mut book = FontBook::new();
        compute_font_metrics(&flat.tree, &mut book, &mut result, true);
        assert_eq!(result[0].baseline_offset, Vec2::new(0.0, -3.0));
        assert_eq!(result[1].baseline_offset, Vec2::new(0.0, -3.0));
    }

    #[test]
    fn baseline_shift_length_rotates_for_vertical() {
        let mut style = TextStyle::default();
        style.baseline_shift = BaselineShift::Length(3.0);
        let root = ContentNode::leaf("a", style);
        let flat = collect(&root);
        let mut result = vec![CharacterResult::default(); 1];
        let mut book = FontBook::new();
        compute_font_metrics(&flat.tree, &mut book, &mut result, false);
        assert_eq!(result[0].baseline_offset, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn nested_shifts_accumulate() {
        let mut outer = TextStyle::default();
        outer.baseline_shift = BaselineShift::Length(2.0);
        let mut inner = outer.inherited();
        inner.baseline_shift = BaselineShift::Length(1.0);
        let root = ContentNode::span(
            outer.clone(),
            vec![ContentNode::span(outer, vec![ContentNode::leaf("x", inner)])],
        );
        let flat = collect(&root);
        let mut result = vec![CharacterResult::default(); 1];
        let mut book = FontBook::new();
        compute_font_metrics(&flat.tree, &mut book, &mut result, true);
        // Each ancestor's shift accumulates on the leaf's characters.
        assert_eq!(result[0].baseline_offset, Vec2::new(0.0, -5.0));
    }
}
