//! The styled content tree the caller hands in, plus the indexed view
//! the pipeline walks.
//!
//! The input tree is read-only; every stage that needs per-node spans in
//! the flattened text goes through [`IndexedTree`], which is built once
//! during collection. This keeps the recursive stages free of threaded
//! mutable cursors: a node's span is a plain precomputed range.

use core::ops::Range;

use crate::style::{CharTransform, TextPath, TextStyle};

/// One node of the styled text content tree.
///
/// Leaves carry text; interior nodes group children under a shared style.
/// Styles are already cascaded: construct children from
/// `parent.style.inherited()` plus the node's own declarations.
#[derive(Debug, Clone)]
pub struct ContentNode {
    /// Text content; only meaningful on leaves.
    pub text: String,
    pub style: TextStyle,
    /// Per-character transforms, consumed positionally by addressable
    /// characters in this subtree.
    pub transforms: Vec<CharTransform>,
    /// When set, this subtree is laid out on the given path.
    pub text_path: Option<TextPath>,
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    pub fn leaf(text: impl Into<String>, style: TextStyle) -> Self {
        ContentNode {
            text: text.into(),
            style,
            transforms: Vec::new(),
            text_path: None,
            children: Vec::new(),
        }
    }

    pub fn span(style: TextStyle, children: Vec<ContentNode>) -> Self {
        ContentNode {
            text: String::new(),
            style,
            transforms: Vec::new(),
            text_path: None,
            children,
        }
    }

    pub fn with_transforms(mut self, transforms: Vec<CharTransform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn with_text_path(mut self, text_path: TextPath) -> Self {
        self.text_path = Some(text_path);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A node of the indexed view: pre-order id, links, and the node's span
/// in flattened-text character indices (bidi controls included).
#[derive(Debug)]
pub struct IndexedNode<'a> {
    pub node: &'a ContentNode,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub range: Range<usize>,
}

/// Pre-order indexed view over a content tree.
#[derive(Debug)]
pub struct IndexedTree<'a> {
    pub nodes: Vec<IndexedNode<'a>>,
}

impl<'a> IndexedTree<'a> {
    /// Index the tree structure. Ranges start empty; the collector fills
    /// them in as it flattens the text.
    pub fn new(root: &'a ContentNode) -> Self {
        let mut tree = IndexedTree { nodes: Vec::new() };
        tree.index(root, None);
        tree
    }

    fn index(&mut self, node: &'a ContentNode, parent: Option<usize>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(IndexedNode {
            node,
            parent,
            children: Vec::new(),
            range: 0..0,
        });
        for child in &node.children {
            let child_id = self.index(child, Some(id));
            self.nodes[id].children.push(child_id);
        }
        id
    }

    pub fn root(&self) -> &IndexedNode<'a> {
        &self.nodes[0]
    }

    pub fn get(&self, id: usize) -> &IndexedNode<'a> {
        &self.nodes[id]
    }

    /// Number of flattened characters covered by the node.
    pub fn num_chars(&self, id: usize) -> usize {
        let range = &self.nodes[id].range;
        range.end - range.start
    }

    /// Propagate leaf ranges up: an interior node spans everything its
    /// descendants span. Called once after collection filled the leaves.
    pub fn finish_ranges(&mut self) {
        for id in (0..self.nodes.len()).rev() {
            if self.nodes[id].children.is_empty() {
                continue;
            }
            let first = self.nodes[id].children[0];
            let last = *self.nodes[id]
                .children
                .last()
                .expect("non-empty children checked above");
            let start = self.nodes[first].range.start;
            let end = self.nodes[last].range.end;
            self.nodes[id].range = start..end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_preorder() {
        let style = TextStyle::default();
        let tree = ContentNode::span(
            style.clone(),
            vec![
                ContentNode::leaf("ab", style.clone()),
                ContentNode::span(
                    style.clone(),
                    vec![ContentNode::leaf("cd", style.clone())],
                ),
            ],
        );
        let indexed = IndexedTree::new(&tree);
        assert_eq!(indexed.nodes.len(), 4);
        assert_eq!(indexed.nodes[0].children, vec![1, 2]);
        assert_eq!(indexed.nodes[2].children, vec![3]);
        assert_eq!(indexed.nodes[3].parent, Some(2));
    }

    #[test]
    fn interior_ranges_cover_descendants() {
        let style = TextStyle::default();
        let tree = ContentNode::span(
            style.clone(),
            vec![
                ContentNode::leaf("ab", style.clone()),
                ContentNode::leaf("cde", style.clone()),
            ],
        );
        let mut indexed = IndexedTree::new(&tree);
        indexed.nodes[1].range = 0..2;
        indexed.nodes[2].range = 2..5;
        indexed.finish_ranges();
        assert_eq!(indexed.nodes[0].range, 0..5);
    }
}
