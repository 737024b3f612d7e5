//! CSS/SVG text property model.
//!
//! Styles arrive on the content tree already cascaded: a [`TextStyle`] is
//! the resolved snapshot for one node. [`TextStyle::inherited`] produces
//! the base a child starts from, with the non-inherited properties reset.

use kurbo::{BezPath, Point, Vec2};

/// CSS `writing-mode`, reduced to the axes the layout cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritingMode {
    #[default]
    HorizontalTb,
    VerticalRl,
    VerticalLr,
}

impl WritingMode {
    pub fn is_horizontal(self) -> bool {
        self == WritingMode::HorizontalTb
    }
}

/// CSS `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

/// SVG `text-anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

/// CSS `unicode-bidi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnicodeBidi {
    #[default]
    Normal,
    Embed,
    Isolate,
    BidiOverride,
    IsolateOverride,
    Plaintext,
}

/// Baseline identifiers shared by `dominant-baseline` and
/// `alignment-baseline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Baseline {
    #[default]
    Auto,
    UseScript,
    NoChange,
    ResetSize,
    Ideographic,
    Alphabetic,
    Hanging,
    Mathematical,
    Central,
    Middle,
    TextTop,
    TextBottom,
}

/// `baseline-shift`: either a keyword or an explicit length in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BaselineShift {
    #[default]
    None,
    Sub,
    Super,
    Length(f64),
}

/// `text-decoration-line`, one flag per line kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextDecorationLine {
    pub underline: bool,
    pub overline: bool,
    pub line_through: bool,
}

impl TextDecorationLine {
    pub fn is_none(self) -> bool {
        !(self.underline || self.overline || self.line_through)
    }

    pub fn has(self, kind: DecorationType) -> bool {
        match kind {
            DecorationType::Underline => self.underline,
            DecorationType::Overline => self.overline,
            DecorationType::LineThrough => self.line_through,
        }
    }
}

/// One decoration line kind, used as a map key for generated paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationType {
    Underline,
    Overline,
    LineThrough,
}

impl DecorationType {
    pub const ALL: [DecorationType; 3] = [
        DecorationType::Underline,
        DecorationType::Overline,
        DecorationType::LineThrough,
    ];
}

/// `text-decoration-style`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDecorationStyle {
    #[default]
    Solid,
    Double,
    Dotted,
    Dashed,
    Wavy,
}

/// Horizontal `text-underline-position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnderlinePositionH {
    #[default]
    Auto,
    Under,
}

/// Vertical `text-underline-position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnderlinePositionV {
    #[default]
    Right,
    Left,
}

/// `white-space-collapse` values the layout distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextCollapse {
    #[default]
    Collapse,
    Preserve,
    PreserveBreaks,
    BreakSpaces,
}

/// `text-wrap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextWrap {
    #[default]
    Wrap,
    NoWrap,
}

/// `hanging-punctuation` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HangingPunctuation {
    pub first: bool,
    pub last: bool,
    pub end: bool,
    /// Hang unconditionally instead of only when the line overflows.
    pub force_end: bool,
}

/// SVG `lengthAdjust`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthAdjust {
    #[default]
    Spacing,
    SpacingAndGlyphs,
}

/// CSS `word-break`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordBreak {
    #[default]
    Normal,
    BreakAll,
}

/// CSS `line-break` strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreakStrictness {
    #[default]
    Auto,
    Strict,
    Anywhere,
}

/// CSS `overflow-wrap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowWrap {
    #[default]
    Normal,
    Anywhere,
}

/// Plain sRGB color, used for caret painting hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
}

/// Font selection style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Font selection stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStretch {
    UltraCondensed,
    ExtraCondensed,
    Condensed,
    SemiCondensed,
    #[default]
    Normal,
    SemiExpanded,
    Expanded,
    ExtraExpanded,
    UltraExpanded,
}

/// The font selection part of a style, handed to the font service.
#[derive(Debug, Clone, PartialEq)]
pub struct FontQuery {
    /// Family names in preference order; generic families are understood
    /// by name ("serif", "sans-serif", "monospace", ...).
    pub families: Vec<String>,
    pub weight: u16,
    pub style: FontStyle,
    pub stretch: FontStretch,
}

impl Default for FontQuery {
    fn default() -> Self {
        FontQuery {
            families: Vec::new(),
            weight: 400,
            style: FontStyle::Normal,
            stretch: FontStretch::Normal,
        }
    }
}

/// An OpenType feature setting, e.g. `liga`, `smcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontFeature {
    pub tag: [u8; 4],
    pub value: u32,
}

/// Per-character transform resolved from the `x`/`y`/`dx`/`dy`/`rotate`
/// attribute lists of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharTransform {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub rotate: Option<f64>,
}

impl CharTransform {
    /// An absolute position on either axis starts a new anchored chunk.
    pub fn starts_new_chunk(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    pub fn has_relative_offset(&self) -> bool {
        self.dx.is_some() || self.dy.is_some()
    }

    pub fn relative_offset(&self) -> Vec2 {
        Vec2::new(self.dx.unwrap_or(0.0), self.dy.unwrap_or(0.0))
    }

    pub fn absolute_pos(&self) -> Point {
        Point::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0))
    }

    /// Fill unset fields from an outer transform resolved for the same
    /// character, so nested spans see their ancestors' positioning.
    pub fn merge_in_parent(&mut self, parent: &CharTransform) {
        if self.x.is_none() {
            self.x = parent.x;
        }
        if self.y.is_none() {
            self.y = parent.y;
        }
        if self.dx.is_none() {
            self.dx = parent.dx;
        }
        if self.dy.is_none() {
            self.dy = parent.dy;
        }
        if self.rotate.is_none() {
            self.rotate = parent.rotate;
        }
    }
}

/// Which side of the path the text runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPathSide {
    #[default]
    Left,
    Right,
}

/// How glyphs map onto the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPathMethod {
    #[default]
    Align,
    Stretch,
}

/// A path anchor for a subtree (`<textPath>`).
#[derive(Debug, Clone)]
pub struct TextPath {
    pub path: BezPath,
    pub start_offset: f64,
    /// When set, `start_offset` is a percentage of the path length.
    pub start_offset_is_percentage: bool,
    pub side: TextPathSide,
    pub method: TextPathMethod,
}

impl TextPath {
    pub fn new(path: BezPath) -> Self {
        TextPath {
            path,
            start_offset: 0.0,
            start_offset_is_percentage: false,
            side: TextPathSide::Left,
            method: TextPathMethod::Align,
        }
    }
}

/// Resolved text style snapshot for one content node.
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font: FontQuery,
    /// Font size in points.
    pub font_size: f64,
    pub font_features: Vec<FontFeature>,
    /// BCP-47 language tag.
    pub language: Option<String>,

    pub direction: Direction,
    pub unicode_bidi: UnicodeBidi,
    pub anchor: TextAnchor,

    pub dominant_baseline: Baseline,
    pub alignment_baseline: Baseline,
    pub baseline_shift: BaselineShift,

    /// `None` is `normal` (auto) spacing.
    pub letter_spacing: Option<f64>,
    pub word_spacing: Option<f64>,
    /// Line height as a multiple of the font size; `None` is `normal`.
    pub line_height: Option<f64>,

    /// Decoration lines declared on this node itself. Inherited styles
    /// never re-declare, so `Some` means "this node generates paths".
    pub decoration_line: Option<TextDecorationLine>,
    pub decoration_style: TextDecorationStyle,
    pub underline_position_h: UnderlinePositionH,
    pub underline_position_v: UnderlinePositionV,

    pub text_length: Option<f64>,
    pub length_adjust: LengthAdjust,

    pub word_break: WordBreak,
    pub line_break: LineBreakStrictness,
    pub overflow_wrap: OverflowWrap,
    pub hanging_punctuation: HangingPunctuation,

    /// Fill color, carried into cursor info for caret painting.
    pub fill: Option<Rgba>,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font: FontQuery::default(),
            font_size: 12.0,
            font_features: Vec::new(),
            language: None,
            direction: Direction::Ltr,
            unicode_bidi: UnicodeBidi::Normal,
            anchor: TextAnchor::Start,
            dominant_baseline: Baseline::Auto,
            alignment_baseline: Baseline::Auto,
            baseline_shift: BaselineShift::None,
            letter_spacing: None,
            word_spacing: None,
            line_height: None,
            decoration_line: None,
            decoration_style: TextDecorationStyle::Solid,
            underline_position_h: UnderlinePositionH::Auto,
            underline_position_v: UnderlinePositionV::Right,
            text_length: None,
            length_adjust: LengthAdjust::Spacing,
            word_break: WordBreak::Normal,
            line_break: LineBreakStrictness::Auto,
            overflow_wrap: OverflowWrap::Normal,
            hanging_punctuation: HangingPunctuation::default(),
            fill: None,
        }
    }
}

impl TextStyle {
    /// The style a child node starts from: inheritable properties copied,
    /// non-inherited ones back at their initial values.
    pub fn inherited(&self) -> TextStyle {
        TextStyle {
            unicode_bidi: UnicodeBidi::Normal,
            alignment_baseline: Baseline::Auto,
            baseline_shift: BaselineShift::None,
            decoration_line: None,
            text_length: None,
            length_adjust: LengthAdjust::Spacing,
            ..self.clone()
        }
    }

    /// Letter and word spacing merged into the single extra-spacing value
    /// the shaping adapter applies per cluster.
    pub fn extra_spacing(&self) -> f64 {
        self.letter_spacing.unwrap_or(0.0) + self.word_spacing.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_transform_chunk_detection() {
        let mut t = CharTransform::default();
        assert!(!t.starts_new_chunk());
        t.dx = Some(4.0);
        assert!(!t.starts_new_chunk());
        t.x = Some(10.0);
        assert!(t.starts_new_chunk());
    }

    #[test]
    fn char_transform_merge_keeps_own_fields() {
        let mut child = CharTransform {
            x: Some(5.0),
            ..CharTransform::default()
        };
        let parent = CharTransform {
            x: Some(1.0),
            y: Some(2.0),
            rotate: Some(0.5),
            ..CharTransform::default()
        };
        child.merge_in_parent(&parent);
        assert_eq!(child.x, Some(5.0));
        assert_eq!(child.y, Some(2.0));
        assert_eq!(child.rotate, Some(0.5));
    }

    #[test]
    fn inherited_resets_non_inherited_properties() {
        let style = TextStyle {
            text_length: Some(100.0),
            baseline_shift: BaselineShift::Super,
            decoration_line: Some(TextDecorationLine {
                underline: true,
                ..TextDecorationLine::default()
            }),
            letter_spacing: Some(1.5),
            ..TextStyle::default()
        };
        let child = style.inherited();
        assert_eq!(child.text_length, None);
        assert_eq!(child.baseline_shift, BaselineShift::None);
        assert_eq!(child.decoration_line, None);
        assert_eq!(child.letter_spacing, Some(1.5));
    }
}
