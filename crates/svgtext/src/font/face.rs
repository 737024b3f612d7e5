use std::sync::Arc;

use kurbo::{BezPath, Point, Shape};
use swash::scale::{ScaleContext, StrikeWith};
use swash::zeno::Verb;
use swash::{FontRef, Metrics};

use crate::error::{Result, TextError};
use crate::font::metrics::{FontMetrics, LineMetrics};

/// An alpha or color bitmap glyph, passed through layout untouched.
#[derive(Debug, Clone)]
pub struct BitmapGlyph {
    pub left: f64,
    pub top: f64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Loaded font face backed by a font file (TTF/OTF).
///
/// A thin wrapper around `swash::FontRef` that owns the underlying font
/// data and exposes the metrics and glyph geometry the layout needs.
/// Glyph outlines come out as `kurbo::BezPath` in SVG coordinates
/// (y down), already scaled to the requested size in points.
#[derive(Debug, Clone)]
pub struct FontFace {
    /// Full font data.
    data: Arc<[u8]>,
    /// Offset to the table directory for this font.
    offset: u32,
    /// Cache key used internally by swash.
    key: swash::CacheKey,
    /// Design metrics in font units.
    raw: Metrics,
}

impl FontFace {
    /// Create a font face from raw bytes and a font index within the file.
    pub fn from_bytes(data: Arc<[u8]>, index: usize) -> Result<Self> {
        let font = FontRef::from_index(&data, index).ok_or(TextError::InvalidFont)?;
        let raw = font.metrics(&[]);
        let (offset, key) = (font.offset, font.key);
        Ok(Self {
            data,
            offset,
            key,
            raw,
        })
    }

    pub fn from_vec(data: Vec<u8>, index: usize) -> Result<Self> {
        Self::from_bytes(Arc::from(data), index)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>, index: usize) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_vec(data, index)
    }

    /// Expose the raw font bytes for libraries that borrow the data
    /// (harfrust takes the byte slice directly).
    pub fn as_bytes(&self) -> Arc<[u8]> {
        self.data.clone()
    }

    /// Return a transient `FontRef` for interacting with swash APIs.
    pub(crate) fn as_swash_ref(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }

    pub fn units_per_em(&self) -> u16 {
        self.raw.units_per_em
    }

    /// Whether the face maps this character to a real glyph.
    pub fn has_char(&self, c: char) -> bool {
        self.as_swash_ref().charmap().map(c) != 0
    }

    pub fn glyph_id(&self, c: char) -> u16 {
        self.as_swash_ref().charmap().map(c)
    }

    /// Metrics at `font_size` points, with synthesized fallbacks for
    /// tables the font does not carry.
    pub fn metrics(&self, font_size: f64) -> FontMetrics {
        let upem = self.raw.units_per_em.max(1) as f64;
        let scale = font_size / upem;

        let ascent = self.raw.ascent as f64 * scale;
        let descent = self.raw.descent as f64 * scale;

        let mut x_height = self.raw.x_height as f64 * scale;
        if x_height <= 0.0 {
            // 45% of the height, which is what Firefox synthesizes.
            x_height = (ascent + descent) * 0.45;
        }
        let mut cap_height = self.raw.cap_height as f64 * scale;
        if cap_height <= 0.0 {
            cap_height = ascent;
        }

        let mut thickness = self.raw.stroke_size as f64 * scale;
        if thickness <= 0.0 {
            thickness = font_size / 12.0;
        }
        // Underline offset is below the baseline (negative, y up) in the
        // font; store it positive downward.
        let mut underline_offset = -(self.raw.underline_offset as f64) * scale;
        if underline_offset == 0.0 {
            underline_offset = font_size / 9.0;
        }
        let mut strikeout_offset = self.raw.strikeout_offset as f64 * scale;
        if strikeout_offset == 0.0 {
            strikeout_offset = x_height * 0.5;
        }

        FontMetrics {
            font_size,
            ascent,
            descent,
            line_gap: self.raw.leading as f64 * scale,
            x_height,
            cap_height,
            // Generic offsets in the absence of OS/2 data, the same
            // 0.2em/0.4em Inkscape and librsvg fall back to.
            sub_offset: kurbo::Vec2::new(0.0, font_size * 0.2),
            super_offset: kurbo::Vec2::new(0.0, -font_size * 0.4),
            underline: LineMetrics {
                offset: underline_offset,
                thickness,
            },
            strikeout: LineMetrics {
                offset: strikeout_offset,
                thickness,
            },
        }
    }

    /// Glyph outline at `font_size` points in SVG coordinates (y down),
    /// with its ink bounding box. `None` for glyphs without an outline.
    pub fn glyph_outline(&self, glyph_id: u16, font_size: f64) -> Option<(BezPath, kurbo::Rect)> {
        let mut context = ScaleContext::new();
        let font = self.as_swash_ref();
        let mut scaler = context
            .builder(font)
            .size(font_size as f32)
            .hint(false)
            .build();
        let outline = scaler.scale_outline(glyph_id)?;

        let mut path = BezPath::new();
        let points = outline.points();
        let mut i = 0;
        // Scaled outlines are y up; flip into SVG space as we convert.
        let pt = |p: &swash::zeno::Vector| Point::new(p.x as f64, -(p.y as f64));
        for verb in outline.verbs() {
            match verb {
                Verb::MoveTo => {
                    path.move_to(pt(&points[i]));
                    i += 1;
                }
                Verb::LineTo => {
                    path.line_to(pt(&points[i]));
                    i += 1;
                }
                Verb::QuadTo => {
                    path.quad_to(pt(&points[i]), pt(&points[i + 1]));
                    i += 2;
                }
                Verb::CurveTo => {
                    path.curve_to(pt(&points[i]), pt(&points[i + 1]), pt(&points[i + 2]));
                    i += 3;
                }
                Verb::Close => path.close_path(),
            }
        }

        if path.elements().is_empty() {
            return None;
        }
        let bbox = path.bounding_box();
        Some((path, bbox))
    }

    /// Alpha bitmap for bitmap-only fonts; layout passes these through.
    pub fn glyph_bitmap(&self, glyph_id: u16, font_size: f64) -> Option<BitmapGlyph> {
        let mut context = ScaleContext::new();
        let font = self.as_swash_ref();
        let mut scaler = context
            .builder(font)
            .size(font_size as f32)
            .build();
        let image = scaler.scale_bitmap(glyph_id, StrikeWith::BestFit)?;
        Some(BitmapGlyph {
            left: image.placement.left as f64,
            top: image.placement.top as f64,
            width: image.placement.width,
            height: image.placement.height,
            data: image.data,
        })
    }
}
