//! Cursor position synthesis: the caret stops an editor steps through,
//! plus the logical-to-visual ordering map over them.

use std::collections::BTreeMap;

use kurbo::Vec2;

use crate::layout::line::LineBox;
use crate::layout::result::{BreakType, CharacterResult, CursorPos};

/// Build the cursor position array from the finished result array.
///
/// Every addressable cluster leader with a plain-text index produces one
/// stop per grapheme inside the cluster; anchored chunk starts get an
/// extra synthetic stop at offset zero so the caret can sit before an
/// independently positioned run.
pub fn build_cursor_positions(
    result: &mut [CharacterResult],
    plain_text_len: usize,
    dummy_index: Option<usize>,
) -> Vec<CursorPos> {
    let mut cursor_pos = Vec::new();

    for i in 0..result.len() {
        if !result[i].addressable || result[i].middle {
            continue;
        }
        let Some(plain_index) = result[i].plain_text_index else {
            continue;
        };
        if dummy_index == Some(i) {
            continue;
        }

        let rtl = result[i].cursor_info.rtl;
        let advance = result[i].advance;
        let mut positions: Vec<Vec2> = Vec::new();
        let mut insert_first = false;

        if result[i].anchored_chunk {
            insert_first = true;
            let new_offset = if rtl { advance } else { Vec2::ZERO };
            result[i].cursor_info.offsets.insert(0, new_offset);
            positions.push(new_offset);
            cursor_pos.push(CursorPos {
                cluster: i,
                index: plain_index,
                offset: 0,
                synthetic: true,
            });
        }

        let graphemes = result[i].cursor_info.grapheme_indices.len();
        for k in 0..graphemes {
            // The caret after a hard break belongs to the next line's
            // synthetic stop, not to the break character.
            if result[i].break_type == BreakType::HardBreak && k + 1 == graphemes {
                continue;
            }
            cursor_pos.push(CursorPos {
                cluster: i,
                index: result[i].cursor_info.grapheme_indices[k],
                offset: if insert_first { k + 1 } else { k },
                synthetic: false,
            });
            let offset = (advance / graphemes as f64) * (k + 1) as f64;
            positions.push(if rtl { advance - offset } else { offset });
        }

        if insert_first {
            result[i].cursor_info.grapheme_indices.insert(0, plain_index);
        }
        if result[i].cursor_info.offsets.len() < positions.len() {
            result[i].cursor_info.offsets = positions;
        }
    }

    // The trailing hard-break dummy gets its own synthetic stop so the
    // empty last line is reachable.
    if let Some(dummy) = dummy_index {
        if dummy < result.len() && result[dummy].anchored_chunk {
            let index = result[dummy].plain_text_index.unwrap_or(plain_text_len);
            cursor_pos.push(CursorPos {
                cluster: dummy,
                index,
                offset: 0,
                synthetic: true,
            });
            result[dummy].plain_text_index = index.checked_sub(1);
            result[dummy].cursor_info.offsets.insert(0, Vec2::ZERO);
        }
    }

    cursor_pos
}

/// Sort cursor positions into visual order: per line chunk by shaped
/// visual index, within a cluster by sub-cluster offset, reversed for
/// RTL clusters, the whole sequence reversed for RTL paragraphs.
///
/// The returned map takes a cursor position's index in the logical array
/// to its rank in visual order.
pub fn logical_to_visual_cursor(
    cursor_pos: &[CursorPos],
    result: &[CharacterResult],
    lines: &[LineBox],
    ltr: bool,
) -> BTreeMap<usize, usize> {
    let mut map = BTreeMap::new();
    for line in lines {
        for chunk in &line.chunks {
            let mut visual_to_logical: BTreeMap<usize, usize> = BTreeMap::new();
            for &j in &chunk.indices {
                if let Some(v) = result[j].visual_index {
                    visual_to_logical.insert(v, j);
                }
            }

            let mut visual: Vec<usize> = Vec::new();
            for &j in visual_to_logical.values() {
                let mut relevant: BTreeMap<usize, usize> = BTreeMap::new();
                for (k, pos) in cursor_pos.iter().enumerate() {
                    if pos.cluster == j {
                        relevant.insert(pos.offset, k);
                    }
                }
                let ordered: Vec<usize> = relevant.values().copied().collect();
                for idx in 0..ordered.len() {
                    let pick = if result[j].cursor_info.rtl {
                        ordered[ordered.len() - 1 - idx]
                    } else {
                        ordered[idx]
                    };
                    visual.push(pick);
                }
            }

            if ltr {
                for &k in &visual {
                    let rank = map.len();
                    map.insert(k, rank);
                }
            } else {
                for &k in visual.iter().rev() {
                    let rank = map.len();
                    map.insert(k, rank);
                }
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::line::LineChunk;
    use kurbo::Vec2 as KVec2;

    fn leader(plain: usize, visual: usize, graphemes: Vec<usize>) -> CharacterResult {
        CharacterResult {
            plain_text_index: Some(plain),
            visual_index: Some(visual),
            advance: KVec2::new(10.0, 0.0),
            cursor_info: crate::layout::result::CursorInfo {
                grapheme_indices: graphemes,
                ..Default::default()
            },
            ..CharacterResult::default()
        }
    }

    #[test]
    fn anchored_chunk_gets_synthetic_stop() {
        let mut result = vec![leader(0, 0, vec![1]), leader(1, 1, vec![2])];
        result[0].anchored_chunk = true;
        let cursor_pos = build_cursor_positions(&mut result, 2, None);
        assert_eq!(cursor_pos.len(), 3);
        assert!(cursor_pos[0].synthetic);
        assert_eq!(cursor_pos[0].offset, 0);
        assert_eq!(cursor_pos[1].offset, 1);
        assert!(!cursor_pos[1].synthetic);
        // The leader records one caret offset per stop.
        assert_eq!(result[0].cursor_info.offsets.len(), 2);
    }

    #[test]
    fn ligature_cluster_yields_one_stop_per_grapheme() {
        // One cluster covering two plain-text graphemes (an "fi"
        // ligature).
        let mut result = vec![leader(0, 0, vec![1, 2])];
        result[0].anchored_chunk = true;
        let cursor_pos = build_cursor_positions(&mut result, 2, None);
        // Synthetic start + two grapheme stops.
        assert_eq!(cursor_pos.len(), 3);
        assert_eq!(cursor_pos[2].index, 2);
        // Caret offsets split the cluster advance evenly.
        let offsets = &result[0].cursor_info.offsets;
        assert_eq!(offsets.len(), 3);
        assert!((offsets[1].x - 5.0).abs() < 1e-9);
        assert!((offsets[2].x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn visual_map_is_identity_for_plain_ltr() {
        let mut result = vec![leader(0, 0, vec![1]), leader(1, 1, vec![2])];
        result[0].anchored_chunk = true;
        let cursor_pos = build_cursor_positions(&mut result, 2, None);
        let lines = vec![LineBox {
            chunks: vec![LineChunk {
                indices: vec![0, 1],
            }],
            ..LineBox::default()
        }];
        let map = logical_to_visual_cursor(&cursor_pos, &result, &lines, true);
        assert_eq!(map.len(), cursor_pos.len());
        for (logical, visual) in &map {
            assert_eq!(logical, visual);
        }
    }

    #[test]
    fn rtl_paragraph_reverses_ranks() {
        let mut result = vec![leader(0, 0, vec![1]), leader(1, 1, vec![2])];
        result[0].anchored_chunk = true;
        let cursor_pos = build_cursor_positions(&mut result, 2, None);
        let lines = vec![LineBox {
            chunks: vec![LineChunk {
                indices: vec![0, 1],
            }],
            ..LineBox::default()
        }];
        let map = logical_to_visual_cursor(&cursor_pos, &result, &lines, false);
        let last = cursor_pos.len() - 1;
        assert_eq!(map[&last], 0);
    }
}
