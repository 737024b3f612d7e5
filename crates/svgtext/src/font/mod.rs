pub mod book;
pub mod face;
pub mod metrics;

pub use book::FontBook;
pub use face::{BitmapGlyph, FontFace};
pub use metrics::{FontMetrics, LineMetrics};
