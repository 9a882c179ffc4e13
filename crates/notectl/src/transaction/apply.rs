// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `applyStep(doc, step) → doc` (`spec.md` §4.5): a pure function that walks
//! to the target block via `path` when present, otherwise by id, mutates a
//! working copy in place, and restores invariants (mark-equal adjacent text
//! nodes merged; empty text nodes pruned except as the sole child of an
//! empty block) before returning.
//!
//! Failures here are fatal to the caller: the builder is expected to have
//! validated preconditions before appending a step (`spec.md` §7).

use crate::ids::BlockId;
use crate::model::block::{BlockChildren, BlockNode};
use crate::model::doc::Document;
use crate::model::inline::{InlineContent, TextNode};
use crate::model::mutate::{self, PathError};
use crate::model::ops::Segment;
use crate::schema::registry::SchemaRegistry;
use crate::transaction::step::Step;

#[derive(Clone, Debug, PartialEq)]
pub enum ApplyStepError {
    Path(PathError),
    NotInlineBlock(BlockId),
    OffsetOutOfRange { block_id: BlockId, offset: usize },
    UnknownNodeType(String),
    NotAdjacentForMerge(BlockId, BlockId),
}

impl std::fmt::Display for ApplyStepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyStepError::Path(e) => write!(f, "{e}"),
            ApplyStepError::NotInlineBlock(id) => write!(f, "block {id} has no inline content"),
            ApplyStepError::OffsetOutOfRange { block_id, offset } => {
                write!(f, "offset {offset} out of range for block {block_id}")
            }
            ApplyStepError::UnknownNodeType(t) => write!(f, "unknown node type `{t}`"),
            ApplyStepError::NotAdjacentForMerge(a, b) => {
                write!(f, "blocks {a} and {b} are not adjacent siblings")
            }
        }
    }
}

impl std::error::Error for ApplyStepError {}

impl From<PathError> for ApplyStepError {
    fn from(e: PathError) -> Self {
        ApplyStepError::Path(e)
    }
}

/// Apply a single step to `doc` in place.
pub fn apply_step(doc: &mut Document, schema: &SchemaRegistry, step: &Step) -> Result<(), ApplyStepError> {
    match step {
        Step::InsertText {
            block_id,
            offset,
            text,
            marks,
            segments,
            path,
        } => {
            let block = mutate::resolve_mut(doc, block_id, path.as_deref())?;
            let content = block
                .children
                .as_inline_mut()
                .ok_or_else(|| ApplyStepError::NotInlineBlock(block_id.clone()))?;
            match segments {
                Some(segs) => insert_segments(content, *offset, segs),
                None => insert_text_run(content, *offset, text, marks.clone()),
            }
            normalize_inline_content(content);
            Ok(())
        }
        Step::DeleteText {
            block_id, from, to, path, ..
        } => {
            let block = mutate::resolve_mut(doc, block_id, path.as_deref())?;
            let content = block
                .children
                .as_inline_mut()
                .ok_or_else(|| ApplyStepError::NotInlineBlock(block_id.clone()))?;
            delete_range(content, *from, *to);
            normalize_inline_content(content);
            Ok(())
        }
        Step::SplitBlock {
            block_id,
            offset,
            new_block_id,
            path,
        } => split_block(doc, block_id, *offset, new_block_id.clone(), path.as_deref()),
        Step::MergeBlocks {
            target_block_id,
            source_block_id,
            ..
        } => merge_blocks(doc, target_block_id, source_block_id),
        Step::SetBlockType {
            block_id,
            node_type,
            attrs,
            path,
            ..
        } => {
            if schema.node_spec(node_type).is_none() {
                return Err(ApplyStepError::UnknownNodeType(node_type.as_str().to_owned()));
            }
            let block = mutate::resolve_mut(doc, block_id, path.as_deref())?;
            block.node_type = node_type.clone();
            if let Some(attrs) = attrs {
                block.attrs = attrs.clone();
            }
            Ok(())
        }
        Step::AddMark {
            block_id,
            from,
            to,
            mark,
            path,
        } => {
            let block = mutate::resolve_mut(doc, block_id, path.as_deref())?;
            let content = block
                .children
                .as_inline_mut()
                .ok_or_else(|| ApplyStepError::NotInlineBlock(block_id.clone()))?;
            apply_mark_change(content, *from, *to, |marks| {
                marks.with_added(mark.clone(), |t| schema.mark_rank(t))
            });
            normalize_inline_content(content);
            Ok(())
        }
        Step::RemoveMark {
            block_id,
            from,
            to,
            mark,
            path,
        } => {
            let block = mutate::resolve_mut(doc, block_id, path.as_deref())?;
            let content = block
                .children
                .as_inline_mut()
                .ok_or_else(|| ApplyStepError::NotInlineBlock(block_id.clone()))?;
            apply_mark_change(content, *from, *to, |marks| marks.with_removed(&mark.mark_type));
            normalize_inline_content(content);
            Ok(())
        }
        // storedMarks live on EditorState, not the document; applying this
        // step against the working document is a no-op (the builder/state
        // engine track storedMarks separately).
        Step::SetStoredMarks { .. } => Ok(()),
        Step::InsertNode {
            parent_path,
            index,
            node,
        } => mutate::insert_node(doc, parent_path, *index, node.clone()).map_err(Into::into),
        Step::RemoveNode { parent_path, index, .. } => {
            mutate::remove_node(doc, parent_path, *index).map(|_| ()).map_err(Into::into)
        }
        Step::SetNodeAttr { path, attrs, .. } => {
            let block_id = path.last().expect("path is never empty");
            let block = mutate::resolve_mut(doc, block_id, Some(path.as_slice()))?;
            block.attrs = attrs.clone();
            Ok(())
        }
        Step::InsertInlineNode {
            block_id,
            offset,
            node,
            path,
        } => {
            let block = mutate::resolve_mut(doc, block_id, path.as_deref())?;
            let content = block
                .children
                .as_inline_mut()
                .ok_or_else(|| ApplyStepError::NotInlineBlock(block_id.clone()))?;
            insert_inline_node_at(content, *offset, node.clone());
            normalize_inline_content(content);
            Ok(())
        }
        Step::RemoveInlineNode {
            block_id, offset, path, ..
        } => {
            let block = mutate::resolve_mut(doc, block_id, path.as_deref())?;
            let content = block
                .children
                .as_inline_mut()
                .ok_or_else(|| ApplyStepError::NotInlineBlock(block_id.clone()))?;
            remove_inline_node_at(content, *offset);
            normalize_inline_content(content);
            Ok(())
        }
        Step::SetInlineNodeAttr {
            block_id, offset, attrs, path, ..
        } => {
            let block = mutate::resolve_mut(doc, block_id, path.as_deref())?;
            let content = block
                .children
                .as_inline_mut()
                .ok_or_else(|| ApplyStepError::NotInlineBlock(block_id.clone()))?;
            set_inline_node_attr_at(content, *offset, attrs.clone());
            Ok(())
        }
    }
}

fn insert_text_run(content: &mut Vec<InlineContent>, offset: usize, text: &str, marks: crate::model::mark::MarkSet) {
    if text.is_empty() {
        return;
    }
    let idx = split_point(content, offset);
    content.insert(idx, InlineContent::Text(TextNode::new(text, marks)));
}

fn insert_segments(content: &mut Vec<InlineContent>, offset: usize, segments: &[Segment]) {
    let idx = split_point(content, offset);
    let pieces: Vec<InlineContent> = segments
        .iter()
        .filter_map(|s| match s {
            Segment::Text { text, marks } if !text.is_empty() => {
                Some(InlineContent::Text(TextNode::new(text.clone(), marks.clone())))
            }
            Segment::Text { .. } => None,
            Segment::Inline(n) => Some(InlineContent::Inline(n.clone())),
        })
        .collect();
    for (i, piece) in pieces.into_iter().enumerate() {
        content.insert(idx + i, piece);
    }
}

/// Split the content so that a content-piece boundary exists exactly at
/// `offset`, returning the index into `content` at that boundary.
fn split_point(content: &mut Vec<InlineContent>, offset: usize) -> usize {
    let mut pos = 0usize;
    for (i, c) in content.iter_mut().enumerate() {
        let len = c.len();
        if offset == pos {
            return i;
        }
        if offset < pos + len {
            // Splits a text node in two; inline nodes are never split
            // because their length is always 1 (offset can't fall inside).
            if let InlineContent::Text(t) = c {
                let local = offset - pos;
                let chars: Vec<char> = t.text.chars().collect();
                let left: String = chars[..local].iter().collect();
                let right: String = chars[local..].iter().collect();
                let marks = t.marks.clone();
                *c = InlineContent::Text(TextNode::new(left, marks.clone()));
                content.insert(i + 1, InlineContent::Text(TextNode::new(right, marks)));
                return i + 1;
            }
        }
        pos += len;
    }
    content.len()
}

fn delete_range(content: &mut Vec<InlineContent>, from: usize, to: usize) {
    if from >= to {
        return;
    }
    let start = split_point(content, from);
    let end = split_point(content, to);
    content.drain(start..end);
}

fn apply_mark_change(
    content: &mut Vec<InlineContent>,
    from: usize,
    to: usize,
    f: impl Fn(&crate::model::mark::MarkSet) -> crate::model::mark::MarkSet,
) {
    if from >= to {
        return;
    }
    let start = split_point(content, from);
    let end = split_point(content, to);
    for c in &mut content[start..end] {
        if let InlineContent::Text(t) = c {
            t.marks = f(&t.marks);
        }
    }
}

fn insert_inline_node_at(content: &mut Vec<InlineContent>, offset: usize, node: crate::model::inline::InlineNode) {
    let idx = split_point(content, offset);
    content.insert(idx, InlineContent::Inline(node));
}

fn remove_inline_node_at(content: &mut Vec<InlineContent>, offset: usize) {
    if let Some(i) = index_of_piece_at(content, offset) {
        content.remove(i);
    }
}

fn set_inline_node_attr_at(content: &mut [InlineContent], offset: usize, attrs: crate::model::attrs::AttrMap) {
    if let Some(i) = index_of_piece_at(content, offset) {
        if let InlineContent::Inline(n) = &mut content[i] {
            n.attrs = attrs;
        }
    }
}

fn index_of_piece_at(content: &[InlineContent], offset: usize) -> Option<usize> {
    let mut pos = 0usize;
    for (i, c) in content.iter().enumerate() {
        if pos == offset {
            return Some(i);
        }
        pos += c.len();
    }
    None
}

/// Restores invariants 3/4 (`spec.md` §3): coalesce adjacent text nodes
/// whose mark sets are equal, and drop empty text nodes unless it is the
/// sole remaining child.
fn normalize_inline_content(content: &mut Vec<InlineContent>) {
    let mut merged: Vec<InlineContent> = Vec::with_capacity(content.len());
    for c in content.drain(..) {
        match (&c, merged.last_mut()) {
            (InlineContent::Text(t), Some(InlineContent::Text(prev))) if prev.marks.set_eq(&t.marks) => {
                prev.text.push_str(&t.text);
            }
            _ => merged.push(c),
        }
    }
    if merged.len() > 1 {
        merged.retain(|c| !matches!(c, InlineContent::Text(t) if t.is_empty()));
    }
    if merged.is_empty() {
        merged.push(InlineContent::Text(TextNode::plain("")));
    }
    *content = merged;
}

fn split_block(
    doc: &mut Document,
    block_id: &BlockId,
    offset: usize,
    new_block_id: BlockId,
    path: Option<&[BlockId]>,
) -> Result<(), ApplyStepError> {
    let block = mutate::resolve_mut(doc, block_id, path)?;
    let content = block
        .children
        .as_inline_mut()
        .ok_or_else(|| ApplyStepError::NotInlineBlock(block_id.clone()))?;
    if offset > get_content_len(content) {
        return Err(ApplyStepError::OffsetOutOfRange {
            block_id: block_id.clone(),
            offset,
        });
    }
    let split_at = split_point(content, offset);
    let tail: Vec<InlineContent> = content.split_off(split_at);
    normalize_inline_content(content);
    let mut tail = tail;
    normalize_inline_content(&mut tail);
    let node_type = block.node_type.clone();
    let attrs = block.attrs.clone();
    let new_block = BlockNode::new_leaf(new_block_id, node_type, attrs, tail);

    let (parent_children, idx) = parent_children_and_index(doc, block_id, path)?;
    parent_children.insert(idx + 1, new_block);
    Ok(())
}

fn get_content_len(content: &[InlineContent]) -> usize {
    content.iter().map(InlineContent::len).sum()
}

fn parent_children_and_index<'a>(
    doc: &'a mut Document,
    block_id: &BlockId,
    path: Option<&[BlockId]>,
) -> Result<(&'a mut Vec<BlockNode>, usize), ApplyStepError> {
    match path {
        Some(p) => {
            let ancestors = if p.last() == Some(block_id) { &p[..p.len() - 1] } else { p };
            let children = mutate::children_mut_at_path(&mut doc.blocks, ancestors)?;
            let idx = children
                .iter()
                .position(|b| &b.id == block_id)
                .ok_or_else(|| PathError::NotFound(block_id.clone()))?;
            Ok((children, idx))
        }
        None => mutate::parent_list_and_index_by_id(&mut doc.blocks, block_id)
            .ok_or_else(|| ApplyStepError::Path(PathError::NotFound(block_id.clone()))),
    }
}

fn merge_blocks(doc: &mut Document, target_block_id: &BlockId, source_block_id: &BlockId) -> Result<(), ApplyStepError> {
    if !crate::model::ops::are_adjacent_siblings(doc, target_block_id, source_block_id) {
        return Err(ApplyStepError::NotAdjacentForMerge(target_block_id.clone(), source_block_id.clone()));
    }
    let source = mutate::remove_block_by_id(&mut doc.blocks, source_block_id)
        .ok_or_else(|| ApplyStepError::Path(PathError::NotFound(source_block_id.clone())))?;
    let BlockChildren::Inline(source_content) = source.children else {
        return Err(ApplyStepError::NotInlineBlock(source_block_id.clone()));
    };
    let target = mutate::find_node_mut(&mut doc.blocks, target_block_id)
        .ok_or_else(|| ApplyStepError::Path(PathError::NotFound(target_block_id.clone())))?;
    let target_content = target
        .children
        .as_inline_mut()
        .ok_or_else(|| ApplyStepError::NotInlineBlock(target_block_id.clone()))?;
    target_content.extend(source_content);
    normalize_inline_content(target_content);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::mark::{Mark, MarkSet};
    use crate::model::{BlockNode, Document, InlineContent, TextNode};

    fn para(id: &str, text: &str) -> BlockNode {
        BlockNode::new_leaf(
            BlockId::from_raw(id),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain(text))],
        )
    }

    #[test]
    fn insert_text_into_empty_block() {
        let mut doc = Document::new(vec![para("b1", "")]);
        let schema = SchemaRegistry::new();
        let step = Step::InsertText {
            block_id: BlockId::from_raw("b1"),
            offset: 0,
            text: "a".to_owned(),
            marks: MarkSet::new(),
            segments: None,
            path: None,
        };
        apply_step(&mut doc, &schema, &step).unwrap();
        assert_eq!(crate::model::ops::get_block_text(&doc.blocks[0]), "a");
    }

    #[test]
    fn delete_text_range() {
        let mut doc = Document::new(vec![para("b1", "hello")]);
        let schema = SchemaRegistry::new();
        let step = Step::DeleteText {
            block_id: BlockId::from_raw("b1"),
            from: 1,
            to: 3,
            deleted_text: "el".to_owned(),
            deleted_marks: MarkSet::new(),
            deleted_segments: Vec::new(),
            path: None,
        };
        apply_step(&mut doc, &schema, &step).unwrap();
        assert_eq!(crate::model::ops::get_block_text(&doc.blocks[0]), "hlo");
    }

    #[test]
    fn add_mark_over_range_then_normalizes() {
        let mut doc = Document::new(vec![para("b1", "hello")]);
        let schema = SchemaRegistry::new();
        let step = Step::AddMark {
            block_id: BlockId::from_raw("b1"),
            from: 1,
            to: 3,
            mark: Mark::simple("bold"),
            path: None,
        };
        apply_step(&mut doc, &schema, &step).unwrap();
        let content = doc.blocks[0].children.as_inline().unwrap();
        assert_eq!(content.len(), 3);
        assert!(content[1].as_text().unwrap().marks.contains_type(&"bold".into()));
    }

    #[test]
    fn split_block_creates_sibling() {
        let mut doc = Document::new(vec![para("b1", "hello")]);
        let schema = SchemaRegistry::new();
        let step = Step::SplitBlock {
            block_id: BlockId::from_raw("b1"),
            offset: 2,
            new_block_id: BlockId::from_raw("b2"),
            path: None,
        };
        apply_step(&mut doc, &schema, &step).unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(crate::model::ops::get_block_text(&doc.blocks[0]), "he");
        assert_eq!(crate::model::ops::get_block_text(&doc.blocks[1]), "llo");
    }

    #[test]
    fn merge_blocks_concatenates_and_removes_source() {
        let mut doc = Document::new(vec![para("b1", "foo"), para("b2", "bar")]);
        let schema = SchemaRegistry::new();
        let step = Step::MergeBlocks {
            target_block_id: BlockId::from_raw("b1"),
            source_block_id: BlockId::from_raw("b2"),
            target_length_before: 3,
        };
        apply_step(&mut doc, &schema, &step).unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(crate::model::ops::get_block_text(&doc.blocks[0]), "foobar");
    }

    #[test]
    fn merge_blocks_rejects_non_adjacent_blocks() {
        let mut doc = Document::new(vec![para("b1", "foo"), para("mid", "---"), para("b2", "bar")]);
        let schema = SchemaRegistry::new();
        let step = Step::MergeBlocks {
            target_block_id: BlockId::from_raw("b1"),
            source_block_id: BlockId::from_raw("b2"),
            target_length_before: 3,
        };
        let err = apply_step(&mut doc, &schema, &step).unwrap_err();
        assert_eq!(
            err,
            ApplyStepError::NotAdjacentForMerge(BlockId::from_raw("b1"), BlockId::from_raw("b2"))
        );
        assert_eq!(doc.blocks.len(), 3, "no mutation should happen before the adjacency check");
    }
}
