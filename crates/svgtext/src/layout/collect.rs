//! Text Collector: flattens the styled tree into ordered sub-chunks,
//! inserting bidi control characters at direction boundaries.
//!
//! Shaping and bidi run over the whole flattened text as one paragraph,
//! but each directional span must reorder independently; the inserted
//! controls make every chunk's reordering self-contained. The collector
//! also builds the mapping from flattened character indices back to the
//! plain text, which later stages need for grapheme boundaries against
//! the real text.

use core::ops::Range;

use crate::style::{Direction, TextStyle};
use crate::tree::{ContentNode, IndexedTree};
use crate::unicode::css::{bidi_closing, bidi_opening};

/// One flattened run of text with its style snapshot.
#[derive(Debug, Clone)]
pub struct SubChunk {
    /// Flattened text of this chunk (controls for synthetic chunks).
    pub text: String,
    /// Plain-text contribution; empty for synthetic control chunks.
    pub original_text: String,
    /// Resolved style of the originating leaf.
    pub style: TextStyle,
    /// Id of the originating leaf in the indexed tree.
    pub node: usize,
    /// First chunk inside a path-anchored subtree.
    pub first_text_in_path: bool,
    /// Bidi-control chunk with no addressable content of its own.
    pub synthetic: bool,
    /// Char range of this chunk in the flattened text.
    pub range: Range<usize>,
}

/// Collector output: the indexed tree with filled spans, the chunk list
/// and the flattened/plain text pair.
#[derive(Debug)]
pub struct Flattened<'a> {
    pub tree: IndexedTree<'a>,
    pub chunks: Vec<SubChunk>,
    /// Flattened text, bidi controls included.
    pub text: String,
    /// Plain text without controls.
    pub plain_text: String,
    /// Per flattened char: index into the plain text, `None` for
    /// synthetic characters.
    pub char_to_plain: Vec<Option<usize>>,
}

struct CollectState {
    chunks: Vec<SubChunk>,
    text: String,
    plain_text: String,
    char_to_plain: Vec<Option<usize>>,
    char_cursor: usize,
    plain_cursor: usize,
    first_text_in_path: bool,
}

impl CollectState {
    fn push_chunk(&mut self, text: &str, original: &str, style: &TextStyle, node: usize) {
        let start = self.char_cursor;
        for (i, _) in text.chars().enumerate() {
            if original.is_empty() {
                self.char_to_plain.push(None);
            } else {
                self.char_to_plain.push(Some(self.plain_cursor + i));
            }
        }
        let count = text.chars().count();
        self.char_cursor += count;
        self.text.push_str(text);
        self.plain_text.push_str(original);
        self.plain_cursor += original.chars().count();

        self.chunks.push(SubChunk {
            text: text.to_string(),
            original_text: original.to_string(),
            style: style.clone(),
            node,
            first_text_in_path: self.first_text_in_path,
            synthetic: original.is_empty() && !text.is_empty(),
            range: start..self.char_cursor,
        });
        self.first_text_in_path = false;
    }
}

/// Flatten the tree into sub-chunks in document order.
pub fn collect(root: &ContentNode) -> Flattened<'_> {
    let mut tree = IndexedTree::new(root);
    let mut state = CollectState {
        chunks: Vec::new(),
        text: String::new(),
        plain_text: String::new(),
        char_to_plain: Vec::new(),
        char_cursor: 0,
        plain_cursor: 0,
        first_text_in_path: false,
    };

    collect_node(&mut tree, 0, false, &mut state);
    tree.finish_ranges();

    Flattened {
        tree,
        chunks: state.chunks,
        text: state.text,
        plain_text: state.plain_text,
        char_to_plain: state.char_to_plain,
    }
}

fn collect_node(tree: &mut IndexedTree<'_>, id: usize, in_path: bool, state: &mut CollectState) {
    let node = tree.nodes[id].node;
    let in_path = in_path || node.text_path.is_some();
    if node.text_path.is_some() {
        state.first_text_in_path = true;
    }

    let start = state.char_cursor;
    if node.is_leaf() {
        let style = &node.style;
        let ltr = style.direction == Direction::Ltr;
        let opening = bidi_opening(ltr, style.unicode_bidi);
        let closing = bidi_closing(style.unicode_bidi);

        if !opening.is_empty() {
            state.push_chunk(opening, "", style, id);
        }
        state.push_chunk(&node.text, &node.text, style, id);
        if !closing.is_empty() {
            state.push_chunk(closing, "", style, id);
        }
    } else {
        let children: Vec<usize> = tree.nodes[id].children.clone();
        for child in children {
            collect_node(tree, child, in_path, state);
        }
    }
    tree.nodes[id].range = start..state.char_cursor;

    if node.text_path.is_some() {
        state.first_text_in_path = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::UnicodeBidi;

    #[test]
    fn plain_mapping_skips_controls() {
        let style = TextStyle::default();
        let rtl_style = TextStyle {
            direction: Direction::Rtl,
            unicode_bidi: UnicodeBidi::Isolate,
            ..TextStyle::default()
        };
        let root = ContentNode::span(
            style.clone(),
            vec![
                ContentNode::leaf("ab", style.clone()),
                ContentNode::leaf("גד", rtl_style),
            ],
        );
        let flat = collect(&root);
        assert_eq!(flat.plain_text, "abגד");
        // ab + RLI + גד + PDI
        assert_eq!(flat.text.chars().count(), 6);
        assert_eq!(flat.char_to_plain[0], Some(0));
        assert_eq!(flat.char_to_plain[2], None);
        assert_eq!(flat.char_to_plain[3], Some(2));
        assert_eq!(flat.char_to_plain[5], None);
    }

    #[test]
    fn node_ranges_cover_controls() {
        let style = TextStyle::default();
        let iso = TextStyle {
            unicode_bidi: UnicodeBidi::Isolate,
            ..TextStyle::default()
        };
        let root = ContentNode::span(
            style.clone(),
            vec![
                ContentNode::leaf("x", style.clone()),
                ContentNode::leaf("yz", iso),
            ],
        );
        let flat = collect(&root);
        // Leaf ids are 1 and 2 in pre-order.
        assert_eq!(flat.tree.nodes[1].range, 0..1);
        assert_eq!(flat.tree.nodes[2].range, 1..5);
        assert_eq!(flat.tree.nodes[0].range, 0..5);
    }

    #[test]
    fn plaintext_strictly_increasing_within_chunk() {
        let style = TextStyle::default();
        let root = ContentNode::leaf("hello", style);
        let flat = collect(&root);
        let indices: Vec<usize> = flat.char_to_plain.iter().flatten().copied().collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }
}
