// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The reconciler's contract (C11, `spec.md` §4.10): a minimal diff between
//! two top-level block orders, keyed by `BlockId`, plus the NodeView hook
//! shape that lets a plugin override rendering for its own node type.
//!
//! There is no browser in this crate (`spec.md` §1 Non-goals exclude the
//! hosting custom element); `Patch` describes *what* the host's DOM layer
//! must do, not how — the host walks the patch list and performs the
//! actual `data-block-id`-keyed DOM surgery.

use std::panic::{self, AssertUnwindSafe};

use crate::ids::BlockId;
use crate::model::block::BlockNode;
use crate::schema::node_spec::DomElementSpec;

/// One instruction in the diff output, applied in list order.
#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
    /// Insert `node`'s subtree at `index` in the parent's child list.
    Insert { index: usize, node: BlockNode },
    /// Remove the subtree for `id`.
    Remove { id: BlockId },
    /// Move the existing subtree for `id` to `index` without rebuilding it.
    Move { id: BlockId, index: usize },
    /// Rebuild `id`'s subtree in place: its `NodeSpec` signalled a
    /// structural change (e.g. `setBlockType` changed the element type).
    Replace { id: BlockId, node: BlockNode },
    /// Inline content changed but the block's own element is unchanged.
    UpdateContent { id: BlockId, node: BlockNode },
}

/// Diff two top-level (or, recursively, compound-block) child lists by id.
/// Blocks present in both with the same `node_type` move rather than
/// rebuild; blocks whose `node_type` changed are replaced; anything else is
/// inserted or removed.
pub fn diff_children(old: &[BlockNode], new: &[BlockNode]) -> Vec<Patch> {
    let mut patches = Vec::new();
    let mut old_by_id: std::collections::HashMap<&BlockId, (usize, &BlockNode)> =
        old.iter().enumerate().map(|(i, b)| (&b.id, (i, b))).collect();

    for (new_index, new_node) in new.iter().enumerate() {
        match old_by_id.remove(&new_node.id) {
            None => patches.push(Patch::Insert {
                index: new_index,
                node: new_node.clone(),
            }),
            Some((old_index, old_node)) => {
                if old_node.node_type != new_node.node_type {
                    patches.push(Patch::Replace {
                        id: new_node.id.clone(),
                        node: new_node.clone(),
                    });
                } else {
                    if old_index != new_index {
                        patches.push(Patch::Move {
                            id: new_node.id.clone(),
                            index: new_index,
                        });
                    }
                    if old_node.children != new_node.children || old_node.attrs != new_node.attrs {
                        patches.push(Patch::UpdateContent {
                            id: new_node.id.clone(),
                            node: new_node.clone(),
                        });
                    }
                }
            }
        }
    }
    for (_, (_, old_node)) in old_by_id {
        patches.push(Patch::Remove { id: old_node.id.clone() });
    }
    patches
}

/// `spec.md` §4.10's NodeView hooks: a plugin-supplied factory producing
/// the DOM surface for a node type, taking over rendering entirely.
/// `update` returning `true` means the reconciler may reuse the existing
/// DOM rather than rebuilding.
pub struct NodeView {
    pub dom: DomElementSpec,
    pub has_content_dom: bool,
    pub update: Option<std::sync::Arc<dyn Fn(&BlockNode) -> bool + Send + Sync>>,
}

pub type NodeViewFactory = std::sync::Arc<dyn Fn(&BlockNode) -> NodeView + Send + Sync>;

/// Invoke a plugin's NodeView factory, catching panics. `spec.md` §7: "Log;
/// render a placeholder element carrying the block id" on failure.
pub fn render_node_view(factory: &NodeViewFactory, node: &BlockNode) -> NodeView {
    let result = panic::catch_unwind(AssertUnwindSafe(|| factory(node)));
    result.unwrap_or_else(|_| {
        log::error!("NodeView factory for block {} panicked; rendering placeholder", node.id);
        placeholder_node_view(&node.id)
    })
}

fn placeholder_node_view(id: &BlockId) -> NodeView {
    NodeView {
        dom: DomElementSpec {
            tag: "div".to_owned(),
            attrs: vec![("data-block-id".to_owned(), id.to_string()), ("data-notectl-placeholder".to_owned(), "true".to_owned())],
        },
        has_content_dom: false,
        update: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{BlockNode, InlineContent, TextNode};

    fn para(id: &str, text: &str) -> BlockNode {
        BlockNode::new_leaf(
            BlockId::from_raw(id),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain(text))],
        )
    }

    #[test]
    fn unchanged_block_produces_no_patch() {
        let old = vec![para("b1", "x")];
        let new = vec![para("b1", "x")];
        assert!(diff_children(&old, &new).is_empty());
    }

    #[test]
    fn reordered_block_moves_without_rebuilding() {
        let old = vec![para("b1", "x"), para("b2", "y")];
        let new = vec![para("b2", "y"), para("b1", "x")];
        let patches = diff_children(&old, &new);
        assert!(patches.iter().any(|p| matches!(p, Patch::Move { id, index: 0 } if id == &BlockId::from_raw("b2"))));
        assert!(patches.iter().any(|p| matches!(p, Patch::Move { id, index: 1 } if id == &BlockId::from_raw("b1"))));
    }

    #[test]
    fn changed_node_type_replaces() {
        let old = vec![para("b1", "x")];
        let new_node = BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "heading",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain("x"))],
        );
        let patches = diff_children(&old, &[new_node]);
        assert!(matches!(&patches[0], Patch::Replace { .. }));
    }

    #[test]
    fn insert_and_remove_are_detected() {
        let old = vec![para("b1", "x")];
        let new = vec![para("b2", "y")];
        let patches = diff_children(&old, &new);
        assert!(patches.iter().any(|p| matches!(p, Patch::Insert { .. })));
        assert!(patches.iter().any(|p| matches!(p, Patch::Remove { .. })));
    }

    #[test]
    fn panicking_node_view_factory_falls_back_to_placeholder() {
        let factory: NodeViewFactory = std::sync::Arc::new(|_n| panic!("boom"));
        let node = para("b1", "x");
        let view = render_node_view(&factory, &node);
        assert!(view
            .dom
            .attrs
            .iter()
            .any(|(k, v)| k == "data-block-id" && v == "b1"));
    }
}
