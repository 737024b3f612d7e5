//! Shaping adapter over harfrust.
//!
//! One conceptual pass over the whole flattened text: the paragraph is
//! split into bidi visual runs, each visual run is subdivided at face
//! boundaries and forced chunk breaks, and every piece is shaped
//! independently. Pieces of an RTL run are emitted in reverse so the
//! concatenated glyph sequence stays in visual order, the order the
//! builder assigns visual indices in.

use core::ops::Range;
use std::sync::Arc;

use harfrust::{
    Direction as HbDirection, FontRef as HbFontRef, ShaperData, ShaperInstance,
    Tag as HbTag, UnicodeBuffer,
};
use kurbo::Vec2;
use unicode_bidi::{BidiInfo, Level};

use crate::font::FontFace;
use crate::shaping::glyph_run::ShapedGlyph;
use crate::style::FontFeature;

/// Overall paragraph direction for the shaping pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphDirection {
    Ltr,
    Rtl,
    /// Vertical writing modes shape top-to-bottom.
    TopToBottom,
}

/// Per-range shaping settings, one per collected sub-chunk face run.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Char range in the flattened text.
    pub range: Range<usize>,
    pub face: Arc<FontFace>,
    pub font_size: f64,
    /// Merged letter+word spacing added per cluster, in points.
    pub extra_spacing: f64,
    pub features: Vec<FontFeature>,
    pub language: Option<String>,
}

/// Shape the whole flattened text.
///
/// `forced_breaks[i]` forces a shaping run boundary before char `i`, so
/// shaping and bidi never merge across anchored chunk boundaries.
/// Returns `None` when submission to the engine fails; an empty vector
/// when shaping succeeded but produced nothing.
pub fn shape_text(
    text: &str,
    paragraph: ParagraphDirection,
    runs: &[RunSpec],
    forced_breaks: &[bool],
) -> Option<Vec<ShapedGlyph>> {
    if text.is_empty() || runs.is_empty() {
        return Some(Vec::new());
    }

    let starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    let n = starts.len();
    let char_of_byte = |b: usize| starts.partition_point(|&s| s < b);

    // Which run spec covers each char.
    let mut spec_of = vec![usize::MAX; n];
    for (spec_idx, spec) in runs.iter().enumerate() {
        for i in spec.range.clone() {
            if i < n {
                spec_of[i] = spec_idx;
            }
        }
    }
    if spec_of.iter().any(|&s| s == usize::MAX) {
        log::warn!("shaping runs do not cover the whole text");
        return None;
    }

    let base_level = match paragraph {
        ParagraphDirection::Rtl => Level::rtl(),
        _ => Level::ltr(),
    };
    let bidi = BidiInfo::new(text, Some(base_level));

    let mut glyphs = Vec::new();
    for para in &bidi.paragraphs {
        let (levels, vruns) = bidi.visual_runs(para, para.range.clone());
        for vrun in vruns {
            let level = levels[vrun.start];
            let cs = char_of_byte(vrun.start);
            let ce = char_of_byte(vrun.end);
            if cs == ce {
                continue;
            }

            // Subdivide at forced chunk breaks and face-run boundaries.
            let mut cuts = vec![cs];
            for i in (cs + 1)..ce {
                if forced_breaks.get(i).copied().unwrap_or(false) || spec_of[i] != spec_of[i - 1] {
                    cuts.push(i);
                }
            }
            cuts.push(ce);

            let mut pieces: Vec<(usize, usize)> =
                cuts.windows(2).map(|w| (w[0], w[1])).collect();
            if level.is_rtl() {
                pieces.reverse();
            }

            for (pcs, pce) in pieces {
                let spec = &runs[spec_of[pcs]];
                let piece_glyphs =
                    shape_piece(text, &starts, pcs, pce, level, paragraph, spec)?;
                glyphs.extend(piece_glyphs);
            }
        }
    }

    Some(glyphs)
}

fn shape_piece(
    text: &str,
    starts: &[usize],
    cs: usize,
    ce: usize,
    level: Level,
    paragraph: ParagraphDirection,
    spec: &RunSpec,
) -> Option<Vec<ShapedGlyph>> {
    let byte_start = starts[cs];
    let byte_end = starts.get(ce).copied().unwrap_or(text.len());
    let piece = &text[byte_start..byte_end];
    if piece.is_empty() {
        return Some(Vec::new());
    }

    let font_data = spec.face.as_bytes();
    let Some(font_ref) = HbFontRef::from_index(&font_data, 0).ok() else {
        log::warn!("could not submit face to the shaping engine");
        return None;
    };
    let data = ShaperData::new(&font_ref);
    let instance =
        ShaperInstance::from_variations(&font_ref, core::iter::empty::<harfrust::Variation>());
    let shaper = data
        .shaper(&font_ref)
        .instance(Some(&instance))
        .point_size(None)
        .build();

    let direction = match paragraph {
        ParagraphDirection::TopToBottom => HbDirection::TopToBottom,
        _ => {
            if level.is_rtl() {
                HbDirection::RightToLeft
            } else {
                HbDirection::LeftToRight
            }
        }
    };

    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(piece);
    buffer.set_direction(direction);
    if let Some(lang) = spec
        .language
        .as_ref()
        .and_then(|l| l.parse::<harfrust::Language>().ok())
    {
        buffer.set_language(lang);
    }
    buffer.guess_segment_properties();

    let features: Vec<harfrust::Feature> = spec
        .features
        .iter()
        .map(|f| harfrust::Feature::new(HbTag::new(&f.tag), f.value, ..))
        .collect();

    let glyph_buffer = shaper.shape(buffer, &features);
    let infos = glyph_buffer.glyph_infos();
    let positions = glyph_buffer.glyph_positions();

    // Shaping runs in font units; scale to points here.
    let upem = spec.face.units_per_em().max(1) as f64;
    let scale = spec.font_size / upem;
    let vertical = paragraph == ParagraphDirection::TopToBottom;

    let mut out = Vec::with_capacity(infos.len());
    for (info, pos) in infos.iter().zip(positions.iter()) {
        let cluster_byte = byte_start + info.cluster as usize;
        let cluster = starts.partition_point(|&s| s < cluster_byte + 1) - 1;
        out.push(ShapedGlyph {
            cluster,
            glyph_id: info.glyph_id as u16,
            face: spec.face.clone(),
            font_size: spec.font_size,
            // Engine coordinates are y up; layout space is y down.
            advance: Vec2::new(
                pos.x_advance as f64 * scale,
                -(pos.y_advance as f64) * scale,
            ),
            offset: Vec2::new(pos.x_offset as f64 * scale, -(pos.y_offset as f64) * scale),
            rtl: level.is_rtl(),
        });
    }

    // Merged letter+word spacing: one extra gap per cluster, attached to
    // the cluster's trailing glyph.
    if spec.extra_spacing != 0.0 {
        let mut i = 0;
        while i < out.len() {
            let cluster = out[i].cluster;
            let mut last = i;
            while last + 1 < out.len() && out[last + 1].cluster == cluster {
                last += 1;
            }
            if vertical {
                out[last].advance.y += spec.extra_spacing;
            } else {
                out[last].advance.x += spec.extra_spacing;
            }
            i = last + 1;
        }
    }

    Some(out)
}
