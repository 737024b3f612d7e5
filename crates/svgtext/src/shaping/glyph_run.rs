use std::sync::Arc;

use kurbo::Vec2;

use crate::font::FontFace;

/// One shaped glyph with its cluster back-reference.
///
/// `cluster` points at a character index in the flattened text; several
/// glyphs can share a cluster (decomposed marks) and several characters
/// can collapse into one cluster (ligatures). The glyph sequence as a
/// whole is in visual order.
#[derive(Debug, Clone)]
pub struct ShapedGlyph {
    /// Flattened-text char index this glyph belongs to.
    pub cluster: usize,
    pub glyph_id: u16,
    /// Face the glyph was shaped with; ligatures keep their own face.
    pub face: Arc<FontFace>,
    pub font_size: f64,
    /// Advance in points, y positive down.
    pub advance: Vec2,
    /// Offset from the pen position in points, y positive down.
    pub offset: Vec2,
    /// Direction of the run this glyph came from.
    pub rtl: bool,
}
