//! The per-character result record threaded through every stage.

use kurbo::{Affine, BezPath, Point, Rect, Vec2};

use crate::font::{BitmapGlyph, FontMetrics};
use crate::style::{Direction, Rgba, TextAnchor};

/// Line break behavior after a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakType {
    #[default]
    NoBreak,
    SoftBreak,
    HardBreak,
}

/// What a character does when it ends up at a line edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEdge {
    #[default]
    NoChange,
    Collapse,
    ConditionallyHang,
    ForceHang,
}

/// Glyph payload. Only outlines support in-place geometric transforms
/// (textLength scaling, path warping); other kinds pass through.
#[derive(Debug, Clone, Default)]
pub enum Glyph {
    #[default]
    None,
    Outline(BezPath),
    Bitmap(BitmapGlyph),
}

/// Caret information collected per cluster leader.
#[derive(Debug, Clone, Default)]
pub struct CursorInfo {
    /// Shaped direction at this cluster, from the shaping engine.
    pub rtl: bool,
    /// A word boundary follows this character.
    pub is_word_boundary: bool,
    /// Plain-text indices of the grapheme boundaries inside the cluster.
    pub grapheme_indices: Vec<usize>,
    /// Caret offsets per grapheme, relative to the cluster origin.
    pub offsets: Vec<Vec2>,
    /// Fill color hint for caret painting.
    pub color: Option<Rgba>,
}

/// Everything the pipeline knows about one flattened-text character.
///
/// Allocated once per character by the collector and mutated in place by
/// every later stage; indices into the result array are stable for the
/// whole pass (the one exception is the synthetic trailing-hard-break
/// dummy, appended before any index is handed out).
#[derive(Debug, Clone)]
pub struct CharacterResult {
    /// Participates in layout at all. Collapsed whitespace, soft hyphens
    /// and (unwrapped) bidi controls are not addressable.
    pub addressable: bool,
    /// Position in the shaped, bidi-reordered glyph order. `None` until
    /// shaping assigns one; still `None` afterwards marks a mid-cluster
    /// character.
    pub visual_index: Option<usize>,
    /// Non-leading member of a multi-character cluster; hidden, geometry
    /// inherited from the cluster leader.
    pub middle: bool,
    /// Excluded from final outline emission.
    pub hidden: bool,

    pub glyph: Glyph,
    /// Advance in points, y positive down. Can pick up extra spacing and
    /// textLength adjustment.
    pub advance: Vec2,
    /// Pre-path algorithmic position.
    pub css_position: Point,
    /// Final position with all shifts, anchoring and path bending.
    pub final_position: Point,
    pub baseline_offset: Vec2,
    /// Ink bounds in glyph-local space.
    pub ink_bounding_box: Rect,
    pub rotate: Option<f64>,

    pub break_type: BreakType,
    pub line_start: LineEdge,
    pub line_end: LineEdge,

    pub anchor: TextAnchor,
    pub direction: Direction,
    /// First character of an independently anchored run.
    pub anchored_chunk: bool,

    pub cursor_info: CursorInfo,
    /// Index into the plain (pre-control, post-collapse) text, `None`
    /// for synthetic characters such as bidi controls.
    pub plain_text_index: Option<usize>,

    /// Metrics snapshot of the face this character was shaped with.
    pub metrics: FontMetrics,
    /// Half-leading contribution to line height.
    pub half_leading: f64,

    pub justify_before: bool,
    pub justify_after: bool,
    /// `overflow-wrap` allows emergency grapheme breaks for this char.
    pub overflow_wrap: bool,
    /// A textLength distribution already covered this character.
    pub text_length_applied: bool,
}

impl Default for CharacterResult {
    fn default() -> Self {
        CharacterResult {
            addressable: true,
            visual_index: None,
            middle: false,
            hidden: false,
            glyph: Glyph::None,
            advance: Vec2::ZERO,
            css_position: Point::ZERO,
            final_position: Point::ZERO,
            baseline_offset: Vec2::ZERO,
            ink_bounding_box: Rect::ZERO,
            rotate: None,
            break_type: BreakType::NoBreak,
            line_start: LineEdge::NoChange,
            line_end: LineEdge::NoChange,
            anchor: TextAnchor::Start,
            direction: Direction::Ltr,
            anchored_chunk: false,
            cursor_info: CursorInfo::default(),
            plain_text_index: None,
            metrics: FontMetrics::empty(),
            half_leading: 0.0,
            justify_before: false,
            justify_after: false,
            overflow_wrap: false,
            text_length_applied: false,
        }
    }
}

impl CharacterResult {
    /// Transform from glyph-local space to final document space.
    pub fn final_transform(&self) -> Affine {
        let mut tf = Affine::translate(self.final_position.to_vec2());
        if let Some(angle) = self.rotate {
            tf *= Affine::rotate(angle);
        }
        tf
    }

    /// The character's layout box from its font metrics, in glyph-local
    /// space: advance along the inline axis, ascent/descent across it.
    pub fn layout_box(&self, horizontal: bool) -> Rect {
        let ascent = self.metrics.ascent;
        let descent = self.metrics.descent;
        if horizontal {
            Rect::new(0.0, -ascent, self.advance.x, descent)
        } else {
            Rect::new(-descent, 0.0, ascent, self.advance.y)
        }
    }

    /// Inline-axis scalar helpers used all over the finalizer passes.
    pub fn inline_pos(&self, horizontal: bool) -> f64 {
        if horizontal {
            self.final_position.x
        } else {
            self.final_position.y
        }
    }

    pub fn inline_advance(&self, horizontal: bool) -> f64 {
        if horizontal {
            self.advance.x
        } else {
            self.advance.y
        }
    }
}

/// One caret stop, in the order an editor steps through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPos {
    /// Index of the owning cluster in the result array.
    pub cluster: usize,
    /// Plain-text offset.
    pub index: usize,
    /// Sub-cluster grapheme offset.
    pub offset: usize,
    /// Synthesized stop (anchored chunk start, trailing empty line).
    pub synthetic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_addressable_leader() {
        let cr = CharacterResult::default();
        assert!(cr.addressable);
        assert!(!cr.middle);
        assert_eq!(cr.visual_index, None);
        assert_eq!(cr.plain_text_index, None);
    }

    #[test]
    fn final_transform_applies_rotation_after_translation() {
        let cr = CharacterResult {
            final_position: Point::new(10.0, 5.0),
            rotate: Some(std::f64::consts::FRAC_PI_2),
            ..CharacterResult::default()
        };
        let p = cr.final_transform() * Point::new(1.0, 0.0);
        // Rotation happens in glyph-local space, then the translation.
        assert!((p.x - 10.0).abs() < 1e-9);
        assert!((p.y - 6.0).abs() < 1e-9);
    }

    #[test]
    fn layout_box_axes() {
        let cr = CharacterResult {
            advance: Vec2::new(7.0, 0.0),
            metrics: FontMetrics {
                ascent: 8.0,
                descent: 2.0,
                ..FontMetrics::empty()
            },
            ..CharacterResult::default()
        };
        let b = cr.layout_box(true);
        assert_eq!(b, Rect::new(0.0, -8.0, 7.0, 2.0));
    }
}
