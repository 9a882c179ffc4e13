// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Structural mutation of the document tree.
//!
//! The document is conceptually immutable — every transaction step produces
//! a new root (`spec.md` §3, "Lifecycle"). In practice this crate gets that
//! property from ownership rather than from a persistent/structural-sharing
//! tree: [`crate::transaction::apply::apply_step`] takes the working
//! `Document` by value, mutates it in place through the helpers below, and
//! hands back the same value as the new root. Any other owner of a
//! (cloned) `Document` — the committed `EditorState`, a history entry —
//! never observes the mutation, so the externally-visible contract is the
//! same as if a fresh tree had been built from scratch.

use crate::ids::BlockId;
use crate::model::block::{BlockChildren, BlockNode};
use crate::model::doc::Document;

#[derive(Clone, Debug, PartialEq)]
pub enum PathError {
    NotFound(BlockId),
    NotCompound(BlockId),
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::NotFound(id) => write!(f, "no block with id {id}"),
            PathError::NotCompound(id) => write!(f, "block {id} does not have block children"),
        }
    }
}

impl std::error::Error for PathError {}

/// Descend `path` (a chain of compound-block ids) and return the `Vec` of
/// children living directly under the last one. An empty path returns the
/// top-level block list.
pub fn children_mut_at_path<'a>(
    blocks: &'a mut Vec<BlockNode>,
    path: &[BlockId],
) -> Result<&'a mut Vec<BlockNode>, PathError> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(blocks);
    };
    let node = blocks
        .iter_mut()
        .find(|b| &b.id == head)
        .ok_or_else(|| PathError::NotFound(head.clone()))?;
    let children = node
        .children
        .as_blocks_mut()
        .ok_or_else(|| PathError::NotCompound(head.clone()))?;
    children_mut_at_path(children, rest)
}

pub fn find_node_mut<'a>(blocks: &'a mut [BlockNode], id: &BlockId) -> Option<&'a mut BlockNode> {
    for b in blocks {
        if &b.id == id {
            return Some(b);
        }
        if let BlockChildren::Blocks(children) = &mut b.children {
            if let Some(found) = find_node_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Resolve the block named by `block_id`, using `path` when given (a chain
/// of ids from the top level down to and including `block_id`) or falling
/// back to a document-wide DFS otherwise.
///
/// `spec.md` §9's open question on `path` being sometimes absent is settled
/// here: it is always accepted as `Option<&[BlockId]>`, mandatory in
/// practice for anything nested inside a compound block since the DFS
/// fallback, while correct, is O(n) and gives no parent-chain context.
pub fn resolve_mut<'a>(
    doc: &'a mut Document,
    block_id: &BlockId,
    path: Option<&[BlockId]>,
) -> Result<&'a mut BlockNode, PathError> {
    if let Some(path) = path {
        let ancestors = if path.last() == Some(block_id) {
            &path[..path.len().saturating_sub(1)]
        } else {
            path
        };
        let children = children_mut_at_path(&mut doc.blocks, ancestors)?;
        children
            .iter_mut()
            .find(|b| &b.id == block_id)
            .ok_or_else(|| PathError::NotFound(block_id.clone()))
    } else {
        find_node_mut(&mut doc.blocks, block_id).ok_or_else(|| PathError::NotFound(block_id.clone()))
    }
}

pub fn insert_node(
    doc: &mut Document,
    parent_path: &[BlockId],
    index: usize,
    node: BlockNode,
) -> Result<(), PathError> {
    let children = children_mut_at_path(&mut doc.blocks, parent_path)?;
    let index = index.min(children.len());
    children.insert(index, node);
    Ok(())
}

pub fn remove_node(
    doc: &mut Document,
    parent_path: &[BlockId],
    index: usize,
) -> Result<BlockNode, PathError> {
    let children = children_mut_at_path(&mut doc.blocks, parent_path)?;
    if index >= children.len() {
        return Err(PathError::NotFound(BlockId::from_raw(format!(
            "<index {index} out of range>"
        ))));
    }
    Ok(children.remove(index))
}

/// Find the `Vec` of siblings containing `id`, and `id`'s index within it,
/// searching the whole tree rather than via an explicit path. Used by step
/// application when a step's `path` is absent (`spec.md` §9 open question 3
/// — top-level steps may omit it).
pub fn parent_list_and_index_by_id<'a>(
    blocks: &'a mut Vec<BlockNode>,
    id: &BlockId,
) -> Option<(&'a mut Vec<BlockNode>, usize)> {
    if let Some(pos) = blocks.iter().position(|b| &b.id == id) {
        return Some((blocks, pos));
    }
    for b in blocks.iter_mut() {
        if let BlockChildren::Blocks(children) = &mut b.children {
            if let Some(found) = parent_list_and_index_by_id(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Remove the block named `id` from wherever it lives in the tree, searching
/// by id rather than by a known parent path. Used by `mergeBlocks`
/// application (`spec.md` §4.5), whose step shape carries no path for the
/// source block.
pub fn remove_block_by_id(blocks: &mut Vec<BlockNode>, id: &BlockId) -> Option<BlockNode> {
    if let Some(pos) = blocks.iter().position(|b| &b.id == id) {
        return Some(blocks.remove(pos));
    }
    for b in blocks.iter_mut() {
        if let BlockChildren::Blocks(children) = &mut b.children {
            if let Some(found) = remove_block_by_id(children, id) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::inline::InlineContent;
    use crate::model::mark::MarkSet;
    use crate::model::TextNode;

    fn para(id: &str) -> BlockNode {
        BlockNode::new_leaf(
            BlockId::from_raw(id),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::new("x", MarkSet::new()))],
        )
    }

    #[test]
    fn resolve_mut_finds_top_level_block_without_path() {
        let mut doc = Document::new(vec![para("b1"), para("b2")]);
        let found = resolve_mut(&mut doc, &BlockId::from_raw("b2"), None).unwrap();
        assert_eq!(found.id, BlockId::from_raw("b2"));
    }

    #[test]
    fn resolve_mut_descends_via_path_into_compound_block() {
        let cell = para("cell1");
        let row = BlockNode::new_compound(
            BlockId::from_raw("row1"),
            "table_row",
            Default::default(),
            vec![cell],
        );
        let table = BlockNode::new_compound(
            BlockId::from_raw("table1"),
            "table",
            Default::default(),
            vec![row],
        );
        let mut doc = Document::new(vec![table]);
        let path = vec![
            BlockId::from_raw("table1"),
            BlockId::from_raw("row1"),
            BlockId::from_raw("cell1"),
        ];
        let found = resolve_mut(&mut doc, &BlockId::from_raw("cell1"), Some(&path)).unwrap();
        assert_eq!(found.id, BlockId::from_raw("cell1"));
    }

    #[test]
    fn insert_and_remove_node_round_trip() {
        let mut doc = Document::new(vec![para("b1")]);
        insert_node(&mut doc, &[], 1, para("b2")).unwrap();
        assert_eq!(doc.blocks.len(), 2);
        let removed = remove_node(&mut doc, &[], 1).unwrap();
        assert_eq!(removed.id, BlockId::from_raw("b2"));
        assert_eq!(doc.blocks.len(), 1);
    }
}
