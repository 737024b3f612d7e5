//! svgtext: CSS/SVG-2 text layout.
//!
//! Takes a tree of styled text content nodes and produces a fully
//! positioned, shaped, line-broken and decorated glyph sequence, plus
//! the cursor positions an editor's caret layer consumes.
//!
//! The pipeline runs leaves-first on the caller's thread:
//!
//! 1. collect the tree into flattened sub-chunks with bidi controls
//! 2. segment (line/word/grapheme breaks, justification opportunities)
//! 3. resolve per-character transforms and whitespace collapsing
//! 4. shape the whole text once through the shaping engine
//! 5. build per-character results (glyphs, clusters, cursor data)
//! 6. resolve baselines and font metrics down the tree
//! 7. break lines, or flow them into shapes
//! 8. finalize positions (dx/dy, textLength, x/y, anchoring)
//! 9. generate text decorations
//! 10. bend text onto paths
//!
//! Font selection, shaping and Unicode segmentation are consumed as
//! services: fontdb/swash behind [`font::FontBook`], harfrust behind the
//! shaping adapter, the unicode-* crates behind the segmentation
//! adapter. A pass either completes or yields an empty layout; no
//! partial output is ever published.

pub mod error;
pub mod font;
pub mod layout;
pub mod shaping;
pub mod style;
pub mod tree;
pub mod unicode;

pub use error::{Result, TextError};
pub use font::{FontBook, FontFace, FontMetrics};
pub use layout::{
    layout, BreakType, CharacterResult, CursorInfo, CursorPos, Glyph, LayoutOptions, LineBox,
    LineChunk, LineEdge, TextLayout,
};
pub use style::{
    Baseline, BaselineShift, CharTransform, Direction, FontQuery, TextAnchor, TextCollapse,
    TextDecorationLine, TextDecorationStyle, TextPath, TextPathMethod, TextPathSide, TextStyle,
    TextWrap, UnicodeBidi, WritingMode,
};
pub use tree::ContentNode;
