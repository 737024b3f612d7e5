//! Text Decoration Generator.
//!
//! Walks the tree in pre-order; every node that declares decoration
//! lines gets one rectangle per anchored-chunk run of its span, a stroke
//! geometry per declared line kind built over that rectangle, offset by
//! the measured ink extents, optionally bent onto the text path, and
//! stroked at the font's decoration thickness (clamped to one device
//! pixel). Decorations are computed before text-on-path bends the glyph
//! positions, which is why the generator re-applies the path clipping to
//! a scratch copy of each character.

use hashbrown::HashMap;
use kurbo::{Affine, BezPath, Cap, Point, Rect, Stroke, Vec2};

use crate::layout::metrics::DecorationMetrics;
use crate::layout::result::CharacterResult;
use crate::layout::text_path::{character_on_path, stretch_glyph_on_path, PathSampler};
use crate::style::{
    DecorationType, TextDecorationStyle, TextPathSide, UnderlinePositionH, UnderlinePositionV,
};
use crate::tree::IndexedTree;

/// Path context threaded down a path-anchored subtree.
struct PathCtx {
    sampler: PathSampler,
    offset: f64,
}

/// Generated decoration outlines keyed by (node id, line kind).
pub type DecorationPaths = HashMap<(usize, DecorationType), BezPath>;

/// Generate stroked decoration paths for every declaring node.
pub fn compute_text_decorations(
    tree: &IndexedTree<'_>,
    result: &[CharacterResult],
    decor_metrics: &HashMap<usize, DecorationMetrics>,
    minimum_thickness: f64,
    horizontal: bool,
    wrapping: bool,
) -> DecorationPaths {
    let mut out = DecorationPaths::new();
    walk(
        tree,
        0,
        result,
        decor_metrics,
        minimum_thickness,
        horizontal,
        wrapping,
        None,
        &mut out,
    );
    out
}

#[allow(clippy::too_many_arguments)]
fn walk(
    tree: &IndexedTree<'_>,
    id: usize,
    result: &[CharacterResult],
    decor_metrics: &HashMap<usize, DecorationMetrics>,
    minimum_thickness: f64,
    horizontal: bool,
    wrapping: bool,
    inherited_ctx: Option<&PathCtx>,
    out: &mut DecorationPaths,
) {
    let indexed = &tree.nodes[id];
    let style = &indexed.node.style;

    // Path bending does not apply once auto-wrapping took over.
    let own_ctx = if wrapping {
        None
    } else {
        indexed.node.text_path.as_ref().and_then(|tp| {
            let sampler = PathSampler::new(&tp.path, tp.side == TextPathSide::Right)?;
            let offset = if tp.start_offset_is_percentage {
                sampler.length() * 0.01 * tp.start_offset
            } else {
                tp.start_offset
            };
            Some(PathCtx { sampler, offset })
        })
    };
    let ctx = own_ctx.as_ref().or(inherited_ctx);

    for child in indexed.children.clone() {
        walk(
            tree,
            child,
            result,
            decor_metrics,
            minimum_thickness,
            horizontal,
            wrapping,
            ctx,
            out,
        );
    }

    let Some(decor) = style.decoration_line else {
        return;
    };
    if decor.is_none() {
        return;
    }

    let metrics = decor_metrics.get(&id).copied().unwrap_or_default();
    let range = indexed.range.clone();
    let paths = generate_decoration_paths(
        &result[range.start.min(result.len())..range.end.min(result.len())],
        &metrics,
        style.decoration_style,
        minimum_thickness,
        horizontal,
        ctx,
        style.underline_position_h,
        style.underline_position_v,
    );

    for kind in DecorationType::ALL {
        if !decor.has(kind) {
            continue;
        }
        let Some(path) = paths.get(&kind) else {
            continue;
        };
        if path.elements().is_empty() {
            continue;
        }
        let thickness = metrics.get(kind).thickness.max(minimum_thickness);
        let mut stroke = Stroke::new(thickness).with_caps(Cap::Butt);
        match style.decoration_style {
            TextDecorationStyle::Dotted => {
                stroke = stroke.with_dashes(0.0, [thickness, thickness * 2.0]);
            }
            TextDecorationStyle::Dashed => {
                stroke = stroke.with_dashes(0.0, [thickness * 4.0, thickness * 2.0]);
            }
            _ => {}
        }
        let stroked = kurbo::stroke(path.elements().iter().copied(), &stroke, &kurbo::StrokeOpts::default(), 0.1);
        out.insert((id, kind), stroked);
    }
}

/// One decoration run: a rectangle bounding an anchored-chunk run of
/// glyphs, and the position its stroke starts from.
struct DecorationRun {
    rect: Rect,
    first_pos: Point,
}

#[allow(clippy::too_many_arguments)]
fn generate_decoration_paths(
    span: &[CharacterResult],
    metrics: &DecorationMetrics,
    style: TextDecorationStyle,
    minimum_thickness: f64,
    horizontal: bool,
    ctx: Option<&PathCtx>,
    underline_pos_h: UnderlinePositionH,
    underline_pos_v: UnderlinePositionV,
) -> HashMap<DecorationType, BezPath> {
    let mut paths: HashMap<DecorationType, BezPath> = HashMap::new();
    for kind in DecorationType::ALL {
        paths.insert(kind, BezPath::new());
    }

    let stroke_width = metrics.underline.thickness.max(minimum_thickness);

    // Collect one rectangle per anchored-chunk run, measuring the ink
    // extents across the whole span as we go.
    let mut top = 0.0f64;
    let mut bottom = 0.0f64;
    let mut runs: Vec<DecorationRun> = Vec::new();
    let mut current_rect: Option<Rect> = None;
    let mut current_final = Point::ZERO;

    let mut push_run = |rect: Option<Rect>, final_pos: Point, runs: &mut Vec<DecorationRun>| {
        if let Some(rect) = rect {
            if rect.width() > 0.0 || rect.height() > 0.0 {
                let first_pos = if horizontal {
                    Point::new(rect.x0, final_pos.y)
                } else {
                    Point::new(final_pos.x, rect.y0)
                };
                runs.push(DecorationRun { rect, first_pos });
            }
        }
    };

    for cr in span {
        let mut scratch;
        let cr = if let Some(ctx) = ctx {
            scratch = cr.clone();
            character_on_path(
                &mut scratch,
                ctx.sampler.length(),
                ctx.offset,
                horizontal,
                ctx.sampler.is_closed(),
            );
            &scratch
        } else {
            cr
        };
        if cr.hidden || !cr.addressable {
            continue;
        }
        if cr.anchored_chunk {
            push_run(current_rect.take(), current_final, &mut runs);
        }
        current_final = cr.final_position;

        let bbox = cr.layout_box(horizontal);
        if horizontal {
            top = top.min(bbox.y0);
            bottom = bottom.max(bbox.y1);
        } else {
            top = top.max(bbox.x1);
            bottom = bottom.min(bbox.x0);
        }

        let translated = bbox + cr.final_position.to_vec2();
        current_rect = Some(match current_rect {
            Some(rect) => rect.union(translated),
            None => translated,
        });
    }
    push_run(current_rect.take(), current_final, &mut runs);

    // Block-axis offsets per line kind: underline from the font table
    // (or the bottom ink for `under` positioning), overline at the top
    // ink, line-through between them.
    let mut offsets: HashMap<DecorationType, Vec2> = HashMap::new();
    let axis = |v: f64| {
        if horizontal {
            Vec2::new(0.0, v)
        } else {
            Vec2::new(v, 0.0)
        }
    };
    let mut flipped = false;
    if horizontal {
        offsets.insert(DecorationType::Overline, Vec2::new(0.0, top));
        let underline = if underline_pos_h == UnderlinePositionH::Under {
            Vec2::new(0.0, bottom)
        } else {
            axis(metrics.underline.offset)
        };
        offsets.insert(DecorationType::Underline, underline);
    } else if underline_pos_v == UnderlinePositionV::Right {
        offsets.insert(DecorationType::Overline, Vec2::new(bottom, 0.0));
        offsets.insert(DecorationType::Underline, Vec2::new(top, 0.0));
        flipped = true;
    } else {
        offsets.insert(DecorationType::Overline, Vec2::new(top, 0.0));
        offsets.insert(DecorationType::Underline, Vec2::new(bottom, 0.0));
    }
    let mid = (offsets[&DecorationType::Underline] + offsets[&DecorationType::Overline]) * 0.5;
    offsets.insert(DecorationType::LineThrough, mid);

    for run in &runs {
        let rect = run.rect;
        let inline_extent = if horizontal {
            rect.width()
        } else {
            rect.height()
        };

        let mut base = BezPath::new();
        let mut path_width = Vec2::ZERO;
        if style != TextDecorationStyle::Wavy {
            base.move_to(Point::ZERO);
            if ctx.is_some() {
                // Segmented so the later warp has points to bend.
                let total = (inline_extent / (stroke_width * 2.0)).floor().max(1.0);
                let segment = inline_extent / total;
                let mut position = 0.0;
                for _ in 0..total as usize {
                    position += segment;
                    if horizontal {
                        base.line_to(Point::new(position, 0.0));
                    } else {
                        base.line_to(Point::new(0.0, position));
                    }
                }
            } else if horizontal {
                base.line_to(Point::new(inline_extent, 0.0));
            } else {
                base.line_to(Point::new(0.0, inline_extent));
            }
        }

        match style {
            TextDecorationStyle::Double => {
                let line_offset = (stroke_width * 1.5).max(minimum_thickness * 2.0);
                let second = if horizontal {
                    Affine::translate(Vec2::new(0.0, line_offset)) * base.clone()
                } else {
                    Affine::translate(Vec2::new(line_offset, 0.0)) * base.clone()
                };
                for el in second.elements() {
                    base.push(*el);
                }
                path_width = if horizontal {
                    Vec2::new(0.0, -line_offset)
                } else {
                    Vec2::new(line_offset, 0.0)
                };
            }
            TextDecorationStyle::Wavy => {
                let height = stroke_width * 2.0;
                let mut down = true;
                base.move_to(Point::ZERO);
                let mut x = 0.0;
                let periods = (inline_extent / height).floor().max(0.0) as usize;
                for _ in 0..periods {
                    x += height;
                    base.line_to(Point::new(x, if down { height } else { 0.0 }));
                    down = !down;
                }
                let rem = inline_extent % height;
                base.line_to(Point::new(
                    inline_extent,
                    if down { rem } else { height - rem },
                ));
                path_width = Vec2::new(0.0, -stroke_width);
                if !horizontal {
                    // Swap axes for vertical: (x, y) maps to (y - 2w, x).
                    let swap = Affine::new([0.0, 1.0, 1.0, 0.0, -height, 0.0]);
                    base = swap * base;
                    path_width = Vec2::new(stroke_width, 0.0);
                }
            }
            _ => {}
        }

        let positioned = Affine::translate(run.first_pos.to_vec2()) * base;

        // The double/wavy extra height moves the outermost line; mirror
        // that into the offsets so the band stays inside the ink.
        let mut local = offsets.clone();
        if flipped {
            *local.get_mut(&DecorationType::Underline).expect("seeded") += path_width;
        } else {
            *local.get_mut(&DecorationType::Overline).expect("seeded") += path_width;
        }
        *local.get_mut(&DecorationType::LineThrough).expect("seeded") += path_width * 0.5;

        for kind in DecorationType::ALL {
            let offset = local[&kind];
            let shifted = Affine::translate(offset) * positioned.clone();
            let final_path = if let Some(ctx) = ctx {
                stretch_glyph_on_path(&shifted, &ctx.sampler, horizontal, ctx.offset)
            } else {
                shifted
            };
            let accumulated = paths.get_mut(&kind).expect("seeded above");
            for el in final_path.elements() {
                accumulated.push(*el);
            }
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontMetrics;
    use crate::layout::collect::collect;
    use crate::layout::metrics::DecorationMetrics;
    use crate::style::{TextDecorationLine, TextStyle};
    use crate::tree::ContentNode;

    fn span_char(x: f64, advance: f64) -> CharacterResult {
        CharacterResult {
            final_position: Point::new(x, 0.0),
            advance: Vec2::new(advance, 0.0),
            metrics: FontMetrics {
                ascent: 8.0,
                descent: 2.0,
                ..FontMetrics::empty()
            },
            ..CharacterResult::default()
        }
    }

    fn underline_style() -> TextStyle {
        TextStyle {
            decoration_line: Some(TextDecorationLine {
                underline: true,
                ..TextDecorationLine::default()
            }),
            ..TextStyle::default()
        }
    }

    #[test]
    fn underline_generates_a_stroked_path() {
        let root = ContentNode::leaf("abc", underline_style());
        let flat = collect(&root);
        let mut result = vec![span_char(0.0, 5.0), span_char(5.0, 5.0), span_char(10.0, 5.0)];
        result[0].anchored_chunk = true;

        let mut metrics = HashMap::new();
        metrics.insert(
            0usize,
            DecorationMetrics {
                underline: crate::font::LineMetrics {
                    offset: 1.5,
                    thickness: 0.8,
                },
                ..DecorationMetrics::default()
            },
        );
        let paths =
            compute_text_decorations(&flat.tree, &result, &metrics, 0.5, true, false);
        let underline = paths
            .get(&(0, DecorationType::Underline))
            .expect("declared underline produces a path");
        assert!(!underline.elements().is_empty());
        assert!(!paths.contains_key(&(0, DecorationType::Overline)));
    }

    #[test]
    fn separate_runs_per_anchored_chunk() {
        let root = ContentNode::leaf("abcd", underline_style());
        let flat = collect(&root);
        let mut result = vec![
            span_char(0.0, 5.0),
            span_char(5.0, 5.0),
            span_char(50.0, 5.0),
            span_char(55.0, 5.0),
        ];
        result[0].anchored_chunk = true;
        result[2].anchored_chunk = true;

        let mut metrics = HashMap::new();
        metrics.insert(0usize, DecorationMetrics::default());
        let paths =
            compute_text_decorations(&flat.tree, &result, &metrics, 0.5, true, false);
        let underline = &paths[&(0, DecorationType::Underline)];
        // Two disjoint runs mean at least two subpaths in the stroke.
        let moves = underline
            .elements()
            .iter()
            .filter(|el| matches!(el, kurbo::PathEl::MoveTo(_)))
            .count();
        assert!(moves >= 2);
    }
}
