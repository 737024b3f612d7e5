//! The layout driver: runs the pipeline stages in order and publishes
//! the finished result set.
//!
//! A pass either completes or returns an empty layout (empty input,
//! shaping submission failure, shaping produced no glyphs). Outputs are
//! replaced wholesale; no partial state ever escapes.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use kurbo::{Affine, BezPath, Point, Rect, Vec2};

use crate::font::FontBook;
use crate::layout::collect::collect;
use crate::layout::cursor::{build_cursor_positions, logical_to_visual_cursor};
use crate::layout::decoration::{compute_text_decorations, DecorationPaths};
use crate::layout::line::{break_lines, flow_text_in_shapes, LineBox, LineParams};
use crate::layout::metrics::{compute_font_metrics, handle_line_box_alignment};
use crate::layout::position::{
    apply_absolute_positions, apply_anchoring, apply_dx_dy, apply_text_length,
};
use crate::layout::result::{
    BreakType, CharacterResult, CursorPos, Glyph, LineEdge,
};
use crate::layout::text_path::apply_text_path;
use crate::shaping::{shape_text, ParagraphDirection, RunSpec, ShapedGlyph};
use crate::style::{
    Direction, LineBreakStrictness, OverflowWrap, TextCollapse, TextWrap, WordBreak, WritingMode,
};
use crate::tree::ContentNode;
use crate::unicode::css::{collapse_last_space, collapse_spaces, character_can_hang, hang_last_space, HangClass};
use crate::unicode::segment::{segment_text, substitute_hard_breaks, LineBreakClass};

/// Per-pass configuration resolved by the caller.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub writing_mode: WritingMode,
    /// `inline-size`; `None` is auto (no wrapping).
    pub inline_size: Option<f64>,
    pub wrap: TextWrap,
    pub collapse: TextCollapse,
    /// Regions for shape flow; non-empty switches the line breaker.
    pub shapes_inside: Vec<BezPath>,
    pub shapes_subtract: Vec<BezPath>,
    /// Device resolution, for the one-pixel decoration minimum.
    pub dpi: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            writing_mode: WritingMode::HorizontalTb,
            inline_size: None,
            wrap: TextWrap::Wrap,
            collapse: TextCollapse::Collapse,
            shapes_inside: Vec::new(),
            shapes_subtract: Vec::new(),
            dpi: 72.0,
        }
    }
}

/// The finished layout: everything a renderer or editor consumes.
#[derive(Debug, Default)]
pub struct TextLayout {
    pub result: Vec<CharacterResult>,
    pub lines: Vec<LineBox>,
    pub cursor_positions: Vec<CursorPos>,
    /// Cursor-array index to visual caret rank.
    pub logical_to_visual_cursor: BTreeMap<usize, usize>,
    /// Stroked decoration outlines per (node id, line kind).
    pub decorations: DecorationPaths,
    /// Accumulated ink rectangles per leaf node id, in final space.
    pub node_outlines: HashMap<usize, Vec<Rect>>,
    pub plain_text: String,
    pub initial_position: Point,
    /// Shaped direction disagreed with declared CSS direction somewhere.
    pub is_bidi: bool,
}

impl TextLayout {
    pub fn empty() -> Self {
        TextLayout::default()
    }
}

/// Lay out a styled content tree.
pub fn layout(root: &ContentNode, book: &mut FontBook, options: &LayoutOptions) -> TextLayout {
    let horizontal = options.writing_mode.is_horizontal();

    // 1. Collect the flattened text with bidi controls.
    let flat = collect(root);
    if flat.text.is_empty() {
        return TextLayout::empty();
    }
    let plain_len = flat.plain_text.chars().count();

    // 2. Whitespace collapse, then segmentation over the collapsed text.
    let (collapsed_text, collapsed) = collapse_spaces(&flat.text, options.collapse);
    let seg = segment_text(&collapsed_text);

    let n = collapsed_text.chars().count();
    let mut result: Vec<CharacterResult> = vec![CharacterResult::default(); n];
    for (i, plain) in flat.char_to_plain.iter().enumerate() {
        result[i].plain_text_index = *plain;
    }

    // Bidi treats hard breaks as paragraph separators; shape against a
    // substituted copy so reordering keeps working mid-paragraph.
    let shaping_text = substitute_hard_breaks(&collapsed_text, &seg.line);
    let chars: Vec<char> = shaping_text.chars().collect();

    // 3. Resolve per-character transforms and addressability.
    let wrapped = options.inline_size.is_some() || !options.shapes_inside.is_empty();
    let mut transforms = crate::layout::transform::resolve_transforms(
        &flat.tree,
        &shaping_text,
        &mut result,
        &collapsed,
        horizontal,
        wrapped,
    );

    // 4. Chunk loop: flags, faces and shaping run specs.
    let wrap_enabled = options.wrap != TextWrap::NoWrap;
    let mut forced_breaks = vec![false; n];
    let mut run_specs: Vec<RunSpec> = Vec::new();
    let mut owners: Vec<usize> = vec![0; n];

    for chunk in &flat.chunks {
        let style = &chunk.style;
        let overflow_wrap = style.overflow_wrap != OverflowWrap::Normal;
        let hang = style.hanging_punctuation;

        for i in chunk.range.clone() {
            owners[i] = chunk.node;
            let followed_by_forced_break = i + 1 >= n
                || seg.line.get(i + 1) == Some(&LineBreakClass::MustBreak)
                || transforms[i + 1].starts_new_chunk();

            let cr = &mut result[i];
            cr.anchor = style.anchor;
            cr.direction = style.direction;
            let (justify_before, justify_after) = seg.justify[i];
            cr.justify_before = justify_before;
            cr.justify_after = justify_after;
            cr.overflow_wrap = overflow_wrap;

            match seg.line[i] {
                LineBreakClass::MustBreak => {
                    cr.break_type = BreakType::HardBreak;
                    cr.line_start = LineEdge::Collapse;
                    cr.line_end = LineEdge::Collapse;
                }
                LineBreakClass::AllowBreak if wrap_enabled => {
                    cr.break_type = BreakType::SoftBreak;
                    if collapse_last_space(chars[i], options.collapse) {
                        cr.line_start = LineEdge::Collapse;
                        cr.line_end = LineEdge::Collapse;
                    }
                }
                _ => {}
            }
            if cr.line_end != LineEdge::Collapse {
                if let Some(force) =
                    hang_last_space(chars[i], options.collapse, followed_by_forced_break)
                {
                    cr.line_end = if force {
                        LineEdge::ForceHang
                    } else {
                        LineEdge::ConditionallyHang
                    };
                }
            }
            if (style.word_break == WordBreak::BreakAll
                || style.line_break == LineBreakStrictness::Anywhere)
                && wrap_enabled
                && seg.grapheme_break_after[i]
                && cr.break_type == BreakType::NoBreak
            {
                cr.break_type = BreakType::SoftBreak;
            }
            if cr.line_start != LineEdge::Collapse && hang.first {
                cr.line_start = if character_can_hang(chars[i], HangClass::First) {
                    LineEdge::ForceHang
                } else {
                    cr.line_end
                };
            }
            if cr.line_end != LineEdge::Collapse {
                if hang.last {
                    cr.line_end = if character_can_hang(chars[i], HangClass::Last) {
                        LineEdge::ForceHang
                    } else {
                        cr.line_end
                    };
                }
                if hang.end {
                    let edge = if hang.force_end {
                        LineEdge::ForceHang
                    } else {
                        LineEdge::ConditionallyHang
                    };
                    if character_can_hang(chars[i], HangClass::End) {
                        cr.line_end = edge;
                    }
                }
            }

            cr.cursor_info.is_word_boundary = seg.word_break_after[i];
            cr.cursor_info.color = style.fill;

            if transforms[i].starts_new_chunk() {
                forced_breaks[i] = true;
            }
        }

        if chunk.first_text_in_path {
            for i in chunk.range.clone() {
                if result[i].addressable {
                    result[i].anchored_chunk = true;
                    break;
                }
            }
        }

        // Face runs partition the chunk; metrics snapshot per character.
        let mut start = chunk.range.start;
        for (face, len) in book.faces_for_text(&style.font, &chunk.text) {
            let metrics = face.metrics(style.font_size);
            let end = (start + len).min(chunk.range.end);
            for j in start..end {
                result[j].metrics = metrics;
                result[j].half_leading = metrics.half_leading(style.line_height);
            }
            run_specs.push(RunSpec {
                range: start..end,
                face,
                font_size: style.font_size,
                extra_spacing: style.extra_spacing(),
                features: style.font_features.clone(),
                language: style.language.clone(),
            });
            start = end;
        }
    }

    if let Some(first) = result.first_mut() {
        first.anchored_chunk = true;
    }

    // 5. One shaping pass over the whole text.
    let paragraph = if !horizontal {
        ParagraphDirection::TopToBottom
    } else if root.style.direction == Direction::Rtl {
        ParagraphDirection::Rtl
    } else {
        ParagraphDirection::Ltr
    };
    let Some(glyphs) = shape_text(&shaping_text, paragraph, &run_specs, &forced_breaks) else {
        return TextLayout::empty();
    };
    if glyphs.is_empty() {
        return TextLayout::empty();
    }

    // 6. Character result builder.
    let mut is_bidi = false;
    build_character_results(&glyphs, &mut result, &mut is_bidi);
    merge_middles(&mut result, &chars, &seg.grapheme_break_after, plain_len);

    // 7. Trailing hard break: a synthetic empty last line.
    let dummy_index = insert_trailing_dummy(&mut result, &mut transforms, &mut owners, horizontal);

    // 8. Baselines and per-node decoration metrics.
    let decoration_metrics = compute_font_metrics(&flat.tree, book, &mut result, horizontal);

    // 9. Line breaking.
    let mut start_pos = transforms[0].absolute_pos();
    let mut visual_map: BTreeMap<usize, usize> = BTreeMap::new();
    for (i, cr) in result.iter().enumerate() {
        if let Some(v) = cr.visual_index {
            visual_map.insert(v, i);
        }
    }
    let visual_order: Vec<usize> = visual_map.values().copied().collect();

    let params = LineParams {
        horizontal,
        block_sign: if options.writing_mode == WritingMode::VerticalRl {
            -1.0
        } else {
            1.0
        },
        inline_size: options.inline_size,
        start_pos,
    };
    let lines = if !options.shapes_inside.is_empty() {
        flow_text_in_shapes(
            &mut result,
            &visual_order,
            &options.shapes_inside,
            &options.shapes_subtract,
            &params,
        )
    } else {
        break_lines(&mut result, &visual_order, &params)
    };

    handle_line_box_alignment(&flat.tree, &mut result, &lines, horizontal);

    // 10. SVG 1.1 adjustments, decorations, text-on-path.
    let minimum_decoration_thickness = 72.0 / options.dpi;
    let decorations;
    if options.inline_size.is_none() && options.shapes_inside.is_empty() {
        apply_dx_dy(&mut result, &transforms);
        apply_text_length(&flat.tree, &mut result, horizontal);
        apply_absolute_positions(&mut result, &transforms);
        apply_anchoring(&mut result, horizontal);

        // Decorations need the pre-path positions, so they come first.
        decorations = compute_text_decorations(
            &flat.tree,
            &result,
            &decoration_metrics,
            minimum_decoration_thickness,
            horizontal,
            false,
        );
        apply_text_path(&flat.tree, &mut result, horizontal, &mut start_pos);
    } else {
        decorations = compute_text_decorations(
            &flat.tree,
            &result,
            &decoration_metrics,
            minimum_decoration_thickness,
            horizontal,
            true,
        );
    }

    // 11. Cursor positions and per-node ink outlines.
    let cursor_positions = build_cursor_positions(&mut result, plain_len, dummy_index);
    let mut node_outlines: HashMap<usize, Vec<Rect>> = HashMap::new();
    for (i, cr) in result.iter().enumerate() {
        if cr.addressable && !cr.middle && !cr.hidden {
            let rect = transform_rect(cr.final_transform(), cr.ink_bounding_box);
            node_outlines.entry(owners[i]).or_default().push(rect);
        }
    }

    let ltr = root.style.direction == Direction::Ltr;
    let logical_to_visual = logical_to_visual_cursor(&cursor_positions, &result, &lines, ltr);

    TextLayout {
        result,
        lines,
        cursor_positions,
        logical_to_visual_cursor: logical_to_visual,
        decorations,
        node_outlines,
        plain_text: flat.plain_text,
        initial_position: start_pos,
        is_bidi,
    }
}

fn transform_rect(tf: Affine, rect: Rect) -> Rect {
    tf.transform_rect_bbox(rect)
}

/// Place glyph geometry onto the cluster leaders, in visual order.
fn build_character_results(
    glyphs: &[ShapedGlyph],
    result: &mut [CharacterResult],
    is_bidi: &mut bool,
) {
    let mut pen = Vec2::ZERO;
    for (visual, glyph) in glyphs.iter().enumerate() {
        let cluster = glyph.cluster;
        if cluster >= result.len() || !result[cluster].addressable {
            continue;
        }

        let declared_rtl = result[cluster].direction == Direction::Rtl;
        result[cluster].cursor_info.rtl = glyph.rtl;
        if glyph.rtl != declared_rtl {
            *is_bidi = true;
        }

        if result[cluster].visual_index.is_none() {
            // First glyph of the cluster claims the pen position.
            result[cluster].css_position = Point::ZERO + pen;
            result[cluster].final_position = result[cluster].css_position;
        }

        // Later glyphs of the same cluster stack behind the first.
        let local = Affine::translate(result[cluster].advance + glyph.offset);
        match glyph.face.glyph_outline(glyph.glyph_id, glyph.font_size) {
            Some((path, bbox)) => {
                let placed = local * path;
                let placed_bbox = local.transform_rect_bbox(bbox);
                match &mut result[cluster].glyph {
                    Glyph::Outline(existing) => {
                        for el in placed.elements() {
                            existing.push(*el);
                        }
                        result[cluster].ink_bounding_box =
                            result[cluster].ink_bounding_box.union(placed_bbox);
                    }
                    slot => {
                        *slot = Glyph::Outline(placed);
                        result[cluster].ink_bounding_box = placed_bbox;
                    }
                }
            }
            None => {
                if matches!(result[cluster].glyph, Glyph::None) {
                    if let Some(bitmap) =
                        glyph.face.glyph_bitmap(glyph.glyph_id, glyph.font_size)
                    {
                        result[cluster].ink_bounding_box = Rect::new(
                            bitmap.left,
                            -bitmap.top,
                            bitmap.left + bitmap.width as f64,
                            -bitmap.top + bitmap.height as f64,
                        );
                        result[cluster].glyph = Glyph::Bitmap(bitmap);
                    }
                }
            }
        }

        result[cluster].advance += glyph.advance;
        pen += glyph.advance;
        result[cluster].visual_index = Some(visual);
        result[cluster].middle = false;
    }
}

/// Mark unshaped characters as cluster middles, merging their break and
/// edge flags backward into the leader and collecting grapheme indices
/// with a one-ahead boundary lookahead.
fn merge_middles(
    result: &mut [CharacterResult],
    chars: &[char],
    grapheme_break_after: &[bool],
    plain_len: usize,
) {
    let mut first_cluster: Option<usize> = None;
    let mut grapheme_break_next = false;

    for i in 0..result.len() {
        result[i].middle = result[i].visual_index.is_none();
        if result[i].addressable && !result[i].middle {
            if let (Some(plain), Some(fc)) = (result[i].plain_text_index, first_cluster) {
                // The new leader's plain index closes the previous
                // cluster's last grapheme.
                if !result[fc].cursor_info.offsets.is_empty() {
                    let advance = result[fc].advance;
                    result[fc].cursor_info.offsets.push(advance);
                }
                result[fc].cursor_info.grapheme_indices.push(plain);
            }
            first_cluster = Some(i);
        } else {
            let fc = first_cluster.unwrap_or(0);
            if chars
                .get(fc)
                .map(|c| c.is_whitespace())
                == chars.get(i).map(|c| c.is_whitespace())
            {
                if result[fc].break_type != BreakType::HardBreak {
                    result[fc].break_type = result[i].break_type;
                }
                if result[fc].line_start == LineEdge::NoChange {
                    result[fc].line_start = result[i].line_start;
                }
                if result[fc].line_end == LineEdge::NoChange {
                    result[fc].line_end = result[i].line_end;
                }
            }
            if grapheme_break_next && result[i].addressable {
                if let Some(plain) = result[i].plain_text_index {
                    result[fc].cursor_info.grapheme_indices.push(plain);
                }
            }
            result[i].css_position = result[fc].css_position + result[fc].advance;
            result[i].hidden = true;
        }
        grapheme_break_next = grapheme_break_after.get(i).copied().unwrap_or(false);
    }

    let fc = first_cluster.unwrap_or(0);
    if result[fc].cursor_info.grapheme_indices.is_empty() || grapheme_break_next {
        result[fc].cursor_info.grapheme_indices.push(plain_len);
    }
}

/// When the last addressable character carries a hard break, append a
/// zero-advance dummy so the line breaker still emits the empty trailing
/// line.
fn insert_trailing_dummy(
    result: &mut Vec<CharacterResult>,
    transforms: &mut Vec<crate::style::CharTransform>,
    owners: &mut Vec<usize>,
    horizontal: bool,
) -> Option<usize> {
    let fc = result
        .iter()
        .rposition(|cr| cr.addressable && !cr.middle)?;
    if result[fc].break_type != BreakType::HardBreak {
        return None;
    }

    let hard = result[fc].clone();
    let dummy_visual = hard.visual_index.map(|v| v + 1);
    if let Some(dv) = dummy_visual {
        for cr in result.iter_mut() {
            if let Some(v) = cr.visual_index {
                if v >= dv {
                    cr.visual_index = Some(v + 1);
                }
            }
        }
    }

    let mut dummy = CharacterResult {
        addressable: true,
        visual_index: dummy_visual,
        metrics: hard.metrics,
        half_leading: hard.half_leading,
        css_position: hard.css_position + hard.advance,
        ink_bounding_box: hard.ink_bounding_box,
        plain_text_index: hard.cursor_info.grapheme_indices.last().copied(),
        direction: hard.direction,
        anchor: hard.anchor,
        anchored_chunk: true,
        ..CharacterResult::default()
    };
    dummy.final_position = dummy.css_position;
    dummy.cursor_info.rtl = hard.cursor_info.rtl;
    if horizontal {
        dummy.advance = Vec2::new(0.0, hard.advance.y);
        dummy.ink_bounding_box =
            Rect::new(hard.ink_bounding_box.x0, hard.ink_bounding_box.y0, hard.ink_bounding_box.x0, hard.ink_bounding_box.y1);
    } else {
        dummy.advance = Vec2::new(hard.advance.x, 0.0);
        dummy.ink_bounding_box =
            Rect::new(hard.ink_bounding_box.x0, hard.ink_bounding_box.y0, hard.ink_bounding_box.x1, hard.ink_bounding_box.y0);
    }

    let index = fc + 1;
    result.insert(index, dummy);
    transforms.insert(index, crate::style::CharTransform::default());
    owners.insert(index, owners.get(fc).copied().unwrap_or(0));
    Some(index)
}
