//! Font metrics resolved to point units at a concrete font size.

use kurbo::Vec2;

use crate::style::Baseline;

/// Offset and thickness of a decoration line, in points. The offset is
/// positive downward from the alphabetic baseline for underlines and
/// positive upward for strikeout, matching the source font tables; the
/// decoration generator normalizes signs when it places the lines.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineMetrics {
    pub offset: f64,
    pub thickness: f64,
}

/// Metrics for one face at one font size, everything in points.
///
/// Baseline table values are offsets from the alphabetic baseline,
/// positive toward the ascender. Where the font does not provide a
/// metric the constructor synthesizes the fallbacks Chrome and friends
/// use, so every field is always usable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub font_size: f64,
    /// Ascent above the alphabetic baseline, positive.
    pub ascent: f64,
    /// Descent below the alphabetic baseline, positive.
    pub descent: f64,
    pub line_gap: f64,
    pub x_height: f64,
    pub cap_height: f64,

    /// Subscript offset vector in horizontal mode, positive y down.
    pub sub_offset: Vec2,
    /// Superscript offset vector in horizontal mode, positive y up is
    /// negative y here.
    pub super_offset: Vec2,

    pub underline: LineMetrics,
    pub strikeout: LineMetrics,
}

impl FontMetrics {
    /// All-zero metrics, the placeholder before a face is resolved.
    pub fn empty() -> Self {
        FontMetrics {
            font_size: 0.0,
            ascent: 0.0,
            descent: 0.0,
            line_gap: 0.0,
            x_height: 0.0,
            cap_height: 0.0,
            sub_offset: Vec2::ZERO,
            super_offset: Vec2::ZERO,
            underline: LineMetrics::default(),
            strikeout: LineMetrics::default(),
        }
    }

    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }

    /// Baseline table lookup: offset from the alphabetic baseline,
    /// positive toward the ascender.
    pub fn baseline_value(&self, baseline: Baseline) -> f64 {
        match baseline {
            Baseline::Alphabetic | Baseline::Auto | Baseline::UseScript => 0.0,
            Baseline::Ideographic => -self.descent,
            Baseline::Hanging => self.ascent * 0.8,
            Baseline::Mathematical => self.ascent * 0.5,
            Baseline::Central => self.ascent - self.height() * 0.5,
            Baseline::Middle => self.x_height * 0.5,
            Baseline::TextTop => self.ascent,
            Baseline::TextBottom => -self.descent,
            // These resolve against the parent table before lookup.
            Baseline::NoChange | Baseline::ResetSize => 0.0,
        }
    }

    /// Rescale the whole table by a font-size ratio (`reset-size`).
    pub fn scaled(&self, factor: f64) -> FontMetrics {
        FontMetrics {
            font_size: self.font_size * factor,
            ascent: self.ascent * factor,
            descent: self.descent * factor,
            line_gap: self.line_gap * factor,
            x_height: self.x_height * factor,
            cap_height: self.cap_height * factor,
            sub_offset: self.sub_offset * factor,
            super_offset: self.super_offset * factor,
            underline: LineMetrics {
                offset: self.underline.offset * factor,
                thickness: self.underline.thickness * factor,
            },
            strikeout: LineMetrics {
                offset: self.strikeout.offset * factor,
                thickness: self.strikeout.thickness * factor,
            },
        }
    }

    /// Half the leading a character contributes to its line, from the
    /// `line-height` property or the font's own line gap.
    pub fn half_leading(&self, line_height: Option<f64>) -> f64 {
        match line_height {
            Some(factor) => (factor * self.font_size - self.height()) * 0.5,
            None => self.line_gap * 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> FontMetrics {
        FontMetrics {
            font_size: 10.0,
            ascent: 8.0,
            descent: 2.0,
            line_gap: 1.0,
            x_height: 5.0,
            cap_height: 7.0,
            sub_offset: Vec2::new(0.0, 2.0),
            super_offset: Vec2::new(0.0, -4.0),
            underline: LineMetrics {
                offset: 1.0,
                thickness: 0.5,
            },
            strikeout: LineMetrics {
                offset: 2.5,
                thickness: 0.5,
            },
        }
    }

    #[test]
    fn baseline_table_values() {
        let m = metrics();
        assert_eq!(m.baseline_value(Baseline::Alphabetic), 0.0);
        assert_eq!(m.baseline_value(Baseline::Ideographic), -2.0);
        assert_eq!(m.baseline_value(Baseline::Central), 8.0 - 5.0);
        assert_eq!(m.baseline_value(Baseline::Middle), 2.5);
    }

    #[test]
    fn reset_size_rescales_everything() {
        let m = metrics().scaled(0.5);
        assert_eq!(m.font_size, 5.0);
        assert_eq!(m.ascent, 4.0);
        assert_eq!(m.underline.thickness, 0.25);
        assert_eq!(m.sub_offset, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn half_leading_prefers_line_height() {
        let m = metrics();
        assert_eq!(m.half_leading(None), 0.5);
        // line-height 1.5 on a 10pt font is 15pt, content height is 10pt.
        assert_eq!(m.half_leading(Some(1.5)), 2.5);
    }
}
