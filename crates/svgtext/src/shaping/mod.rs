pub mod glyph_run;
pub mod shaper;

pub use glyph_run::ShapedGlyph;
pub use shaper::{shape_text, ParagraphDirection, RunSpec};
