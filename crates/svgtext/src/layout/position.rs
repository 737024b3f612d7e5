//! Position Finalizer: the SVG 1.1 adjustment passes.
//!
//! These run only when neither shape flow nor auto-wrapping is active:
//! dx/dy accumulation, `textLength` stretching, absolute x/y resets and
//! per-chunk anchoring, in that order. Shaping may have reordered the
//! text, so every extent measurement walks the visual order through the
//! per-span visual index maps.

use std::collections::BTreeMap;

use kurbo::{Affine, Vec2};

use crate::layout::result::{CharacterResult, Glyph};
use crate::style::{CharTransform, Direction, TextAnchor};
use crate::tree::IndexedTree;

/// Deferred anchored-chunk marker: an absolute position can land on a
/// mid-cluster character, in which case the flag moves to the next
/// cluster leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAnchor {
    None,
    Deferred,
}

/// Pass 1: accumulate relative offsets left to right and seed
/// `final_position`; resolve per-character rotations and anchored-chunk
/// starts.
pub fn apply_dx_dy(result: &mut [CharacterResult], transforms: &[CharTransform]) {
    let mut shift = Vec2::ZERO;
    let mut pending = PendingAnchor::None;
    for i in 0..result.len() {
        if !result[i].addressable {
            continue;
        }
        let transform = transforms[i];
        if transform.has_relative_offset() {
            shift += transform.relative_offset();
        }
        if let Some(angle) = transform.rotate {
            result[i].rotate = Some(angle);
        }
        result[i].final_position = result[i].css_position + shift;

        if pending == PendingAnchor::Deferred && !result[i].middle {
            result[i].anchored_chunk = true;
            pending = PendingAnchor::None;
        }
        if transform.starts_new_chunk() {
            if result[i].middle {
                pending = PendingAnchor::Deferred;
            } else {
                result[i].anchored_chunk = true;
            }
        }
    }
}

/// Pass 2: `textLength` stretching, applied bottom-up per node.
pub fn apply_text_length(tree: &IndexedTree<'_>, result: &mut [CharacterResult], horizontal: bool) {
    let mut resolved = 0;
    apply_text_length_node(tree, 0, result, horizontal, &mut resolved);
}

fn apply_text_length_node(
    tree: &IndexedTree<'_>,
    id: usize,
    result: &mut [CharacterResult],
    horizontal: bool,
    resolved_descendants: &mut usize,
) {
    let indexed = &tree.nodes[id];
    let range = indexed.range.clone();
    let style = &indexed.node.style;

    let mut resolved_children = 0;
    for child in indexed.children.clone() {
        apply_text_length_node(tree, child, result, horizontal, &mut resolved_children);
    }

    let Some(target) = style.text_length else {
        return;
    };

    // Track which typographic item sits where; shaping may have
    // reordered the span.
    let mut visual_to_logical: BTreeMap<usize, usize> = BTreeMap::new();
    let mut a = 0.0f64;
    let mut b = 0.0f64;
    let mut first = true;
    let mut n: i64 = 0;
    for k in range.clone() {
        if k >= result.len() || !result[k].addressable {
            continue;
        }
        if let Some(v) = result[k].visual_index {
            visual_to_logical.insert(v, k);
        }
        let pos = result[k].inline_pos(horizontal);
        let advance = result[k].inline_advance(horizontal);
        if first {
            a = pos.min(pos + advance);
            b = pos.max(pos + advance);
            first = false;
        } else {
            a = a.min(pos.min(pos + advance));
            b = b.max(pos.max(pos + advance));
        }
        if !result[k].text_length_applied {
            n += 1;
        }
    }
    n += resolved_children as i64;
    let spacing_and_glyphs = style.length_adjust == crate::style::LengthAdjust::SpacingAndGlyphs;
    if !spacing_and_glyphs {
        // The trailing edge of the last character does not move.
        n -= 1;
    }
    if visual_to_logical.is_empty() || n < 1 {
        *resolved_descendants += 1;
        return;
    }

    let delta = target - (b - a);
    let d = if horizontal {
        Vec2::new(delta / n as f64, 0.0)
    } else {
        Vec2::new(0.0, delta / n as f64)
    };

    let last_visual = *visual_to_logical
        .keys()
        .next_back()
        .expect("map checked non-empty");
    let mut shift = Vec2::ZERO;
    let mut second_applied = false;
    for (&v, &k) in &visual_to_logical {
        let cr = &mut result[k];
        cr.final_position += shift;
        if spacing_and_glyphs {
            let scale = Vec2::new(
                if d.x != 0.0 && cr.advance.x != 0.0 {
                    d.x / cr.advance.x + 1.0
                } else {
                    1.0
                },
                if d.y != 0.0 && cr.advance.y != 0.0 {
                    d.y / cr.advance.y + 1.0
                } else {
                    1.0
                },
            );
            let tf = Affine::scale_non_uniform(scale.x, scale.y);
            if let Glyph::Outline(path) = &mut cr.glyph {
                *path = tf * path.clone();
            }
            cr.advance = Vec2::new(cr.advance.x * scale.x, cr.advance.y * scale.y);
            cr.ink_bounding_box = tf.transform_rect_bbox(cr.ink_bounding_box);
        }
        let last = !spacing_and_glyphs && v == last_visual;
        // Two adjacent already-stretched characters mean an overlapping
        // second stretch; the first node's distribution stays
        // authoritative and no further spacing is added between them.
        if !(cr.text_length_applied && second_applied) && !last {
            shift += d;
        }
        second_applied = cr.text_length_applied;
        cr.text_length_applied = true;
    }
    *resolved_descendants += 1;

    // Everything after this node up to the next anchored chunk moves by
    // the total shift, scanning forward and backward in visual order.
    let mut trailing: BTreeMap<usize, usize> = BTreeMap::new();
    for k in range.end..result.len() {
        if result[k].anchored_chunk {
            break;
        }
        if let Some(v) = result[k].visual_index {
            trailing.insert(v, k);
        }
    }
    for k in (0..=range.start.min(result.len().saturating_sub(1))).rev() {
        if let Some(v) = result[k].visual_index {
            trailing.insert(v, k);
        }
        if result[k].anchored_chunk {
            break;
        }
    }
    for (&v, &k) in &trailing {
        if v > last_visual {
            result[k].final_position += shift;
        }
    }
}

/// Pass 3: absolute x/y resets. The running shift is recomputed so the
/// final position lands exactly on the explicit coordinate; mid-cluster
/// characters copy their predecessor verbatim.
pub fn apply_absolute_positions(result: &mut [CharacterResult], transforms: &[CharTransform]) {
    let mut shift = Vec2::ZERO;
    for i in 0..result.len() {
        if !result[i].addressable {
            continue;
        }
        let transform = transforms[i];
        if let Some(x) = transform.x {
            let delta = transform.dx.unwrap_or(0.0);
            shift.x = x + (delta - result[i].final_position.x);
        }
        if let Some(y) = transform.y {
            let delta = transform.dy.unwrap_or(0.0);
            shift.y = y + (delta - result[i].final_position.y);
        }
        result[i].final_position += shift;
        if result[i].middle && i > 0 {
            result[i].final_position = result[i - 1].final_position;
        }
    }
}

/// Pass 4: anchoring. Each anchored-chunk run measures its inline
/// extent and shifts as one unit so the anchor lands on the run's
/// pre-shift position; start and end flip for RTL runs.
pub fn apply_anchoring(result: &mut [CharacterResult], horizontal: bool) {
    let mut start = 0;
    while start < result.len() {
        let mut a = 0.0f64;
        let mut b = 0.0f64;
        let mut i = start;
        let mut first = true;
        while i < result.len() {
            if !result[i].addressable {
                i += 1;
                continue;
            }
            if result[i].anchored_chunk && i > start {
                break;
            }
            let pos = result[i].inline_pos(horizontal);
            let advance = result[i].inline_advance(horizontal);
            if first || result[i].anchored_chunk {
                a = pos.min(pos + advance);
                b = pos.max(pos + advance);
                first = false;
            } else {
                a = a.min(pos.min(pos + advance));
                b = b.max(pos.max(pos + advance));
            }
            i += 1;
        }

        let rtl = result[start].direction == Direction::Rtl;
        let pos = result[start].inline_pos(horizontal);
        let shift = match (result[start].anchor, rtl) {
            (TextAnchor::Start, false) | (TextAnchor::End, true) => pos - a,
            (TextAnchor::End, false) | (TextAnchor::Start, true) => pos - b,
            (TextAnchor::Middle, _) => pos - (a + b) * 0.5,
        };

        let shift = if horizontal {
            Vec2::new(shift, 0.0)
        } else {
            Vec2::new(0.0, shift)
        };
        for k in start..i {
            result[k].final_position += shift;
        }
        start = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::collect::collect;
    use crate::style::{LengthAdjust, TextStyle};
    use crate::tree::ContentNode;
    use kurbo::Point;

    fn ch(x: f64, advance: f64) -> CharacterResult {
        CharacterResult {
            css_position: Point::new(x, 0.0),
            final_position: Point::new(x, 0.0),
            advance: Vec2::new(advance, 0.0),
            visual_index: Some(0),
            ..CharacterResult::default()
        }
    }

    #[test]
    fn dx_accumulates_across_characters() {
        let mut result = vec![ch(0.0, 5.0), ch(5.0, 5.0), ch(10.0, 5.0)];
        let transforms = vec![
            CharTransform::default(),
            CharTransform {
                dx: Some(3.0),
                ..CharTransform::default()
            },
            CharTransform::default(),
        ];
        apply_dx_dy(&mut result, &transforms);
        assert_eq!(result[0].final_position.x, 0.0);
        assert_eq!(result[1].final_position.x, 8.0);
        assert_eq!(result[2].final_position.x, 13.0);
    }

    #[test]
    fn deferred_anchor_lands_on_next_leader() {
        let mut result = vec![ch(0.0, 5.0), ch(5.0, 0.0), ch(5.0, 5.0)];
        result[1].middle = true;
        let transforms = vec![
            CharTransform::default(),
            CharTransform {
                x: Some(20.0),
                ..CharTransform::default()
            },
            CharTransform::default(),
        ];
        apply_dx_dy(&mut result, &transforms);
        assert!(!result[1].anchored_chunk);
        assert!(result[2].anchored_chunk);
    }

    #[test]
    fn absolute_position_resets_running_shift() {
        let mut result = vec![ch(0.0, 5.0), ch(5.0, 5.0), ch(10.0, 5.0)];
        let transforms = vec![
            CharTransform::default(),
            CharTransform {
                x: Some(50.0),
                ..CharTransform::default()
            },
            CharTransform::default(),
        ];
        apply_dx_dy(&mut result, &transforms);
        apply_absolute_positions(&mut result, &transforms);
        assert_eq!(result[1].final_position.x, 50.0);
        // The shift carries to the following character.
        assert_eq!(result[2].final_position.x, 55.0);
    }

    #[test]
    fn anchoring_start_leaves_positions() {
        let mut result = vec![ch(0.0, 5.0), ch(5.0, 7.0)];
        result[0].anchored_chunk = true;
        apply_anchoring(&mut result, true);
        assert_eq!(result[0].final_position.x, 0.0);
        assert_eq!(result[1].final_position.x, 5.0);
        // Strictly increasing by the first glyph's advance.
        assert_eq!(
            result[1].final_position.x - result[0].final_position.x,
            result[0].advance.x
        );
    }

    #[test]
    fn anchoring_middle_shifts_by_half_extent() {
        let mut result = vec![ch(0.0, 5.0), ch(5.0, 5.0)];
        result[0].anchored_chunk = true;
        for cr in &mut result {
            cr.anchor = TextAnchor::Middle;
        }
        apply_anchoring(&mut result, true);
        // Extent [0, 10]; everything shifts by -(a+b)/2.
        assert_eq!(result[0].final_position.x, -5.0);
        assert_eq!(result[1].final_position.x, 0.0);
    }

    #[test]
    fn anchoring_is_idempotent() {
        let mut result = vec![ch(0.0, 5.0), ch(5.0, 5.0)];
        result[0].anchored_chunk = true;
        for cr in &mut result {
            cr.anchor = TextAnchor::Middle;
        }
        apply_anchoring(&mut result, true);
        let after_first: Vec<f64> = result.iter().map(|c| c.final_position.x).collect();
        apply_anchoring(&mut result, true);
        let after_second: Vec<f64> = result.iter().map(|c| c.final_position.x).collect();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn anchoring_end_rtl_behaves_like_start() {
        let mut result = vec![ch(0.0, 5.0), ch(5.0, 5.0)];
        result[0].anchored_chunk = true;
        for cr in &mut result {
            cr.anchor = TextAnchor::End;
            cr.direction = Direction::Rtl;
        }
        apply_anchoring(&mut result, true);
        assert_eq!(result[0].final_position.x, 0.0);
    }

    #[test]
    fn text_length_spacing_stretches_to_target() {
        let style = TextStyle {
            text_length: Some(100.0),
            length_adjust: LengthAdjust::Spacing,
            ..TextStyle::default()
        };
        let root = ContentNode::leaf("ab", style);
        let flat = collect(&root);
        let mut result = vec![ch(0.0, 40.0), ch(40.0, 40.0)];
        result[0].visual_index = Some(0);
        result[1].visual_index = Some(1);
        apply_text_length(&flat.tree, &mut result, true);

        // Measured extent was 80; the missing 20 goes between the two
        // characters, so the trailing edge lands on 100.
        let a = result
            .iter()
            .map(|c| c.final_position.x.min(c.final_position.x + c.advance.x))
            .fold(f64::INFINITY, f64::min);
        let b = result
            .iter()
            .map(|c| c.final_position.x.max(c.final_position.x + c.advance.x))
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((b - a - 100.0).abs() < 1e-9);
    }

    #[test]
    fn text_length_shift_propagates_until_anchored_chunk() {
        let style = TextStyle::default();
        let stretched = TextStyle {
            text_length: Some(60.0),
            ..TextStyle::default()
        };
        let root = ContentNode::span(
            style.clone(),
            vec![
                ContentNode::leaf("ab", stretched),
                ContentNode::leaf("cd", style),
            ],
        );
        let flat = collect(&root);
        let mut result = vec![
            ch(0.0, 20.0),
            ch(20.0, 20.0),
            ch(40.0, 20.0),
            ch(60.0, 20.0),
        ];
        for (v, cr) in result.iter_mut().enumerate() {
            cr.visual_index = Some(v);
        }
        apply_text_length(&flat.tree, &mut result, true);
        // Node extent 40 stretched to 60: +20 between 'a' and 'b', and
        // the following characters shift along.
        assert_eq!(result[1].final_position.x, 40.0);
        assert_eq!(result[2].final_position.x, 60.0);
        assert_eq!(result[3].final_position.x, 80.0);
    }
}
