//! Transform Resolver: per-character x/y/dx/dy/rotate resolution and
//! whitespace-collapse application.
//!
//! A node's local transform list is consumed positionally by the
//! addressable characters of its whole span (children included);
//! children then merge their own lists over the parent's resolution.
//! Characters beyond the list carry only the rotation of the previous
//! resolved character forward, never position.

use crate::layout::result::CharacterResult;
use crate::style::CharTransform;
use crate::tree::IndexedTree;
use crate::unicode::css::is_bidi_control;

/// Resolve per-character transforms over the whole tree and mark
/// non-addressable characters (collapsed whitespace, soft hyphens and,
/// outside wrapped layout, bidi controls).
pub fn resolve_transforms(
    tree: &IndexedTree<'_>,
    text: &str,
    result: &mut [CharacterResult],
    collapsed: &[bool],
    horizontal: bool,
    wrapped: bool,
) -> Vec<CharTransform> {
    let chars: Vec<char> = text.chars().collect();
    let mut resolved = vec![CharTransform::default(); chars.len()];
    if let Some(first) = resolved.first_mut() {
        first.x = Some(0.0);
        first.y = Some(0.0);
    }
    resolve_node(
        tree, 0, &chars, result, &mut resolved, collapsed, horizontal, wrapped, false,
    );
    resolved
}

#[allow(clippy::too_many_arguments)]
fn resolve_node(
    tree: &IndexedTree<'_>,
    id: usize,
    chars: &[char],
    result: &mut [CharacterResult],
    resolved: &mut [CharTransform],
    collapsed: &[bool],
    horizontal: bool,
    wrapped: bool,
    text_in_path: bool,
) {
    let indexed = &tree.nodes[id];
    let node = indexed.node;
    let range = indexed.range.clone();
    let text_in_path = text_in_path || node.text_path.is_some();

    if node.text_path.is_none() {
        let mut local = node.transforms.iter();
        for k in range.clone() {
            if k >= chars.len() {
                continue;
            }
            let c = chars[k];
            let soft_hyphen = c == '\u{00AD}';
            // Bidi controls participate in line wrapping, so they stay
            // addressable when the text wraps.
            if collapsed.get(k).copied().unwrap_or(false)
                || (is_bidi_control(c) && !wrapped)
                || soft_hyphen
            {
                result[k].addressable = false;
                continue;
            }

            if let Some(&local_transform) = local.next() {
                let mut new_transform = local_transform;
                new_transform.merge_in_parent(&resolved[k]);
                resolved[k] = new_transform;
            } else if k > 0 {
                if resolved[k - 1].rotate.is_some() {
                    resolved[k].rotate = resolved[k - 1].rotate;
                }
            }
        }
    }

    for child in indexed.children.clone() {
        resolve_node(
            tree, child, chars, result, resolved, collapsed, horizontal, wrapped, text_in_path,
        );
    }

    if node.text_path.is_some() {
        // The first character's inline position is forced to zero so the
        // path start offset is not applied twice, and the cross-axis
        // position is dropped entirely; keeping it breaks RTL on paths.
        let mut first = true;
        for k in range {
            if k >= result.len() || !result[k].addressable {
                continue;
            }
            if first {
                if horizontal {
                    resolved[k].x = Some(0.0);
                } else {
                    resolved[k].y = Some(0.0);
                }
                first = false;
            }
            if horizontal {
                resolved[k].y = None;
            } else {
                resolved[k].x = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::collect::collect;
    use crate::style::{TextPath, TextStyle};
    use crate::tree::ContentNode;
    use kurbo::BezPath;

    fn results(n: usize) -> Vec<CharacterResult> {
        vec![CharacterResult::default(); n]
    }

    #[test]
    fn positional_consumption_and_rotate_carry() {
        let style = TextStyle::default();
        let root = ContentNode::leaf("abcd", style).with_transforms(vec![
            CharTransform {
                x: Some(10.0),
                rotate: Some(1.0),
                ..CharTransform::default()
            },
            CharTransform {
                dx: Some(2.0),
                ..CharTransform::default()
            },
        ]);
        let flat = collect(&root);
        let mut result = results(4);
        let collapsed = vec![false; 4];
        let resolved =
            resolve_transforms(&flat.tree, &flat.text, &mut result, &collapsed, true, false);

        assert_eq!(resolved[0].x, Some(10.0));
        assert_eq!(resolved[1].dx, Some(2.0));
        // Excess characters inherit rotation only.
        assert_eq!(resolved[2].x, None);
        assert_eq!(resolved[2].rotate, None);
        // The second transform had no rotate, so nothing carries to 2/3.
        assert_eq!(resolved[3].rotate, None);
    }

    #[test]
    fn rotate_carries_past_transform_list() {
        let style = TextStyle::default();
        let root = ContentNode::leaf("abc", style).with_transforms(vec![CharTransform {
            rotate: Some(0.7),
            ..CharTransform::default()
        }]);
        let flat = collect(&root);
        let mut result = results(3);
        let collapsed = vec![false; 3];
        let resolved =
            resolve_transforms(&flat.tree, &flat.text, &mut result, &collapsed, true, false);
        assert_eq!(resolved[1].rotate, Some(0.7));
        assert_eq!(resolved[2].rotate, Some(0.7));
    }

    #[test]
    fn collapsed_characters_lose_addressability_and_skip_transforms() {
        let style = TextStyle::default();
        let root = ContentNode::leaf("a b", style).with_transforms(vec![
            CharTransform {
                x: Some(0.0),
                ..CharTransform::default()
            },
            CharTransform {
                x: Some(20.0),
                ..CharTransform::default()
            },
        ]);
        let flat = collect(&root);
        let mut result = results(3);
        let collapsed = vec![false, true, false];
        let resolved =
            resolve_transforms(&flat.tree, &flat.text, &mut result, &collapsed, true, false);
        assert!(!result[1].addressable);
        // The space consumed no transform; 'b' takes the second one.
        assert_eq!(resolved[2].x, Some(20.0));
    }

    #[test]
    fn path_subtree_clears_cross_axis() {
        let style = TextStyle::default();
        let leaf = ContentNode::leaf("ab", style.clone()).with_transforms(vec![CharTransform {
            x: Some(5.0),
            y: Some(7.0),
            ..CharTransform::default()
        }]);
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((100.0, 0.0));
        let root = ContentNode::span(
            style.clone(),
            vec![ContentNode::span(style, vec![leaf]).with_text_path(TextPath::new(path))],
        );
        let flat = collect(&root);
        let mut result = results(2);
        let collapsed = vec![false; 2];
        let resolved =
            resolve_transforms(&flat.tree, &flat.text, &mut result, &collapsed, true, false);
        assert_eq!(resolved[0].x, Some(0.0));
        assert_eq!(resolved[0].y, None);
        assert_eq!(resolved[1].y, None);
    }
}
