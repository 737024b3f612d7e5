pub mod collect;
pub mod cursor;
pub mod decoration;
pub mod engine;
pub mod line;
pub mod metrics;
pub mod position;
pub mod result;
pub mod text_path;
pub mod transform;

pub use engine::{layout, LayoutOptions, TextLayout};
pub use line::{LineBox, LineChunk};
pub use result::{BreakType, CharacterResult, CursorInfo, CursorPos, Glyph, LineEdge};
