// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `TransactionBuilder` (`spec.md` §4.5, "Builder contract"): holds a
//! mutable working-document copy so that convenience methods
//! (`deleteTextAt`, `mergeBlocksAt`, …) can derive their "deleted…/previous…"
//! payload by inspecting the document instead of asking the caller to
//! supply it.
//!
//! Each step-producing method appends the step *and* advances the working
//! document via [`crate::transaction::apply::apply_step`], so subsequent
//! builder calls observe the post-step state — this is what makes the
//! derivation in e.g. `merge_blocks_at` correct when called twice in a row.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ids::{BlockId, MarkTypeName, NodeTypeName};
use crate::model::attrs::AttrMap;
use crate::model::block::BlockNode;
use crate::model::inline::InlineNode;
use crate::model::mark::{Mark, MarkSet};
use crate::model::ops::{get_block_length, get_block_segments_in_range, resolve_node_by_path};
use crate::model::{Document, Path};
use crate::schema::registry::SchemaRegistry;
use crate::selection::Selection;
use crate::transaction::apply::apply_step;
use crate::transaction::step::{Origin, Step, Transaction, TransactionMetadata};

#[derive(Clone, Debug, PartialEq)]
pub enum BuilderError {
    NoWorkingDocument,
    BlockNotFound(BlockId),
    OffsetOutOfRange { block_id: BlockId, offset: usize },
    NotInlineBlock(BlockId),
    NotAdjacentForMerge(BlockId, BlockId),
    Apply(String),
}

impl std::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuilderError::NoWorkingDocument => write!(f, "builder was constructed without a working document"),
            BuilderError::BlockNotFound(id) => write!(f, "no block with id {id}"),
            BuilderError::OffsetOutOfRange { block_id, offset } => {
                write!(f, "offset {offset} out of range for block {block_id}")
            }
            BuilderError::NotInlineBlock(id) => write!(f, "block {id} has no inline content"),
            BuilderError::NotAdjacentForMerge(a, b) => write!(f, "blocks {a} and {b} are not adjacent siblings"),
            BuilderError::Apply(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for BuilderError {}

pub struct TransactionBuilder {
    schema: Arc<SchemaRegistry>,
    origin: Origin,
    selection_before: Selection,
    selection_after: Selection,
    stored_marks_before: Option<MarkSet>,
    stored_marks_after: Option<MarkSet>,
    steps: Vec<Step>,
    working_doc: Option<Document>,
}

impl TransactionBuilder {
    /// The constructor `EditorState::transaction` uses: primed with the
    /// current selection, storedMarks, origin, and a working-document copy
    /// (`spec.md` §4.4).
    pub fn new(
        schema: Arc<SchemaRegistry>,
        origin: Origin,
        selection: Selection,
        stored_marks: Option<MarkSet>,
        working_doc: Document,
    ) -> Self {
        Self {
            schema,
            origin,
            selection_before: selection.clone(),
            selection_after: selection,
            stored_marks_before: stored_marks.clone(),
            stored_marks_after: stored_marks,
            steps: Vec::new(),
            working_doc: Some(working_doc),
        }
    }

    /// A builder with no working document: the convenience (derive-from-doc)
    /// methods are unavailable and return `BuilderError::NoWorkingDocument`;
    /// only the raw step-appending methods and selection/storedMarks setters
    /// work. Used for contexts (e.g. the HTML parser replacing the whole
    /// document) that build steps against content not yet resolvable as a
    /// "working document" in the usual sense.
    pub fn bare(schema: Arc<SchemaRegistry>, origin: Origin, selection: Selection) -> Self {
        Self {
            schema,
            origin,
            selection_before: selection.clone(),
            selection_after: selection,
            stored_marks_before: None,
            stored_marks_after: None,
            steps: Vec::new(),
            working_doc: None,
        }
    }

    pub fn working_doc(&self) -> Option<&Document> {
        self.working_doc.as_ref()
    }

    fn doc_mut(&mut self) -> Result<&mut Document, BuilderError> {
        self.working_doc.as_mut().ok_or(BuilderError::NoWorkingDocument)
    }

    fn push(&mut self, step: Step) -> Result<(), BuilderError> {
        if let Some(doc) = self.working_doc.as_mut() {
            apply_step(doc, &self.schema, &step).map_err(|e| BuilderError::Apply(e.to_string()))?;
        }
        // storedMarks survive only across a pure selection update or a
        // SetStoredMarks step itself; any other step clears them (`spec.md`
        // §4.4).
        if !matches!(step, Step::SetStoredMarks { .. }) {
            self.stored_marks_after = None;
        }
        self.steps.push(step);
        Ok(())
    }

    // ---- selection / storedMarks (no step emitted except storedMarks) ----

    pub fn set_selection(&mut self, selection: Selection) {
        if selection.anchor_block_id() != self.selection_after.anchor_block_id() {
            self.stored_marks_after = None;
        }
        self.selection_after = selection;
    }

    pub fn set_node_selection(&mut self, node_id: BlockId, path: Option<Path>) {
        if &node_id != self.selection_after.anchor_block_id() {
            self.stored_marks_after = None;
        }
        self.selection_after = Selection::Node(crate::selection::NodeSelection { node_id, path });
    }

    /// The only selection/storedMarks setter that emits a step
    /// (`spec.md` §4.5, "Builder contract").
    pub fn set_stored_marks(&mut self, marks: Option<MarkSet>) -> Result<(), BuilderError> {
        let previous = self.stored_marks_after.clone();
        self.push(Step::SetStoredMarks {
            marks: marks.clone(),
            previous_marks: previous,
        })?;
        self.stored_marks_after = marks;
        Ok(())
    }

    // ---- inline text ----

    pub fn insert_text(
        &mut self,
        block_id: BlockId,
        offset: usize,
        text: impl Into<String>,
        marks: MarkSet,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        self.push(Step::InsertText {
            block_id,
            offset,
            text: text.into(),
            marks,
            segments: None,
            path,
        })
    }

    /// Derives `deletedText`/`deletedMarks`/`deletedSegments` from the
    /// working document.
    pub fn delete_text_at(
        &mut self,
        block_id: BlockId,
        from: usize,
        to: usize,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        let doc = self.doc_mut()?;
        let block = resolve_block(doc, &block_id, path.as_deref())?;
        let segments = get_block_segments_in_range(block, from, to);
        let deleted_text: String = segments
            .iter()
            .map(|s| match s {
                crate::model::ops::Segment::Text { text, .. } => text.clone(),
                crate::model::ops::Segment::Inline(_) => String::new(),
            })
            .collect();
        let deleted_marks = segments
            .iter()
            .find_map(|s| match s {
                crate::model::ops::Segment::Text { marks, .. } => Some(marks.clone()),
                _ => None,
            })
            .unwrap_or_default();
        self.push(Step::DeleteText {
            block_id,
            from,
            to,
            deleted_text,
            deleted_marks,
            deleted_segments: segments,
            path,
        })
    }

    pub fn split_block(
        &mut self,
        block_id: BlockId,
        offset: usize,
        new_block_id: BlockId,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        self.push(Step::SplitBlock {
            block_id,
            offset,
            new_block_id,
            path,
        })
    }

    /// Derives `targetLengthBefore` from the working document. Rejects a
    /// non-adjacent pair before touching anything (`spec.md` §7, "merge
    /// between non-adjacent blocks").
    pub fn merge_blocks_at(&mut self, target_block_id: BlockId, source_block_id: BlockId) -> Result<(), BuilderError> {
        let doc = self.doc_mut()?;
        if !crate::model::ops::are_adjacent_siblings(doc, &target_block_id, &source_block_id) {
            return Err(BuilderError::NotAdjacentForMerge(target_block_id, source_block_id));
        }
        let target = resolve_block(doc, &target_block_id, None)?;
        let target_length_before = get_block_length(target);
        self.push(Step::MergeBlocks {
            target_block_id,
            source_block_id,
            target_length_before,
        })
    }

    /// Derives `previousNodeType`/`previousAttrs` from the working document.
    pub fn set_block_type(
        &mut self,
        block_id: BlockId,
        node_type: NodeTypeName,
        attrs: Option<AttrMap>,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        let doc = self.doc_mut()?;
        let block = resolve_block(doc, &block_id, path.as_deref())?;
        let previous_node_type = block.node_type.clone();
        let previous_attrs = Some(block.attrs.clone());
        self.push(Step::SetBlockType {
            block_id,
            node_type,
            attrs,
            previous_node_type,
            previous_attrs,
            path,
        })
    }

    pub fn add_mark(
        &mut self,
        block_id: BlockId,
        from: usize,
        to: usize,
        mark: Mark,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        self.push(Step::AddMark {
            block_id,
            from,
            to,
            mark,
            path,
        })
    }

    /// Looks up the concrete mark value present at `from` to populate the
    /// step's `mark` field (mark sets hold at most one value per type).
    pub fn remove_mark(
        &mut self,
        block_id: BlockId,
        from: usize,
        to: usize,
        mark_type: MarkTypeName,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        let doc = self.doc_mut()?;
        let block = resolve_block(doc, &block_id, path.as_deref())?;
        let marks = crate::model::ops::get_block_marks_at_offset(block, from);
        let mark = marks.get(&mark_type).cloned().unwrap_or_else(|| Mark::simple(mark_type));
        self.push(Step::RemoveMark {
            block_id,
            from,
            to,
            mark,
            path,
        })
    }

    // ---- tree structure ----

    pub fn insert_node(&mut self, parent_path: Path, index: usize, node: BlockNode) -> Result<(), BuilderError> {
        self.push(Step::InsertNode {
            parent_path,
            index,
            node,
        })
    }

    /// Derives `removedNode` from the working document.
    pub fn remove_node(&mut self, parent_path: Path, index: usize) -> Result<(), BuilderError> {
        let doc = self.doc_mut()?;
        let children = crate::model::mutate::children_mut_at_path(&mut doc.blocks, &parent_path)
            .map_err(|e| BuilderError::Apply(e.to_string()))?;
        let removed_node = children
            .get(index)
            .cloned()
            .ok_or_else(|| BuilderError::BlockNotFound(BlockId::from_raw(format!("<index {index}>"))))?;
        self.push(Step::RemoveNode {
            parent_path,
            index,
            removed_node,
        })
    }

    /// Derives `previousAttrs` from the working document.
    pub fn set_node_attr(&mut self, path: Path, attrs: AttrMap) -> Result<(), BuilderError> {
        let doc = self.doc_mut()?;
        let block_id = path.last().cloned().ok_or(BuilderError::NoWorkingDocument)?;
        let block = resolve_block(doc, &block_id, Some(&path))?;
        let previous_attrs = Some(block.attrs.clone());
        self.push(Step::SetNodeAttr {
            path,
            attrs,
            previous_attrs,
        })
    }

    // ---- inline nodes ----

    pub fn insert_inline_node(
        &mut self,
        block_id: BlockId,
        offset: usize,
        node: InlineNode,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        self.push(Step::InsertInlineNode {
            block_id,
            offset,
            node,
            path,
        })
    }

    /// Derives `removedNode` from the working document.
    pub fn remove_inline_node(
        &mut self,
        block_id: BlockId,
        offset: usize,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        let doc = self.doc_mut()?;
        let block = resolve_block(doc, &block_id, path.as_deref())?;
        let content = block
            .children
            .as_inline()
            .ok_or_else(|| BuilderError::NotInlineBlock(block_id.clone()))?;
        let removed_node = content_piece_inline_node_at(content, offset)
            .ok_or(BuilderError::OffsetOutOfRange { block_id: block_id.clone(), offset })?;
        self.push(Step::RemoveInlineNode {
            block_id,
            offset,
            removed_node,
            path,
        })
    }

    /// Derives `previousAttrs` from the working document.
    pub fn set_inline_node_attr(
        &mut self,
        block_id: BlockId,
        offset: usize,
        attrs: AttrMap,
        path: Option<Path>,
    ) -> Result<(), BuilderError> {
        let doc = self.doc_mut()?;
        let block = resolve_block(doc, &block_id, path.as_deref())?;
        let content = block
            .children
            .as_inline()
            .ok_or_else(|| BuilderError::NotInlineBlock(block_id.clone()))?;
        let previous_attrs = content_piece_inline_node_at(content, offset)
            .map(|n| n.attrs)
            .ok_or(BuilderError::OffsetOutOfRange { block_id: block_id.clone(), offset })?;
        self.push(Step::SetInlineNodeAttr {
            block_id,
            offset,
            attrs,
            previous_attrs,
            path,
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn build(self) -> Transaction {
        let timestamp_ms = now_ms();
        self.build_at(timestamp_ms)
    }

    /// Explicit-clock variant used by tests and by any host that wants to
    /// supply its own notion of "now" rather than the system clock (`spec.md`
    /// §4.6's grouping window is evaluated against this value).
    pub fn build_at(self, timestamp_ms: u64) -> Transaction {
        Transaction {
            steps: self.steps,
            selection_before: self.selection_before,
            selection_after: self.selection_after,
            stored_marks_after: self.stored_marks_after,
            metadata: TransactionMetadata {
                origin: self.origin,
                timestamp_ms,
            },
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn resolve_block<'a>(
    doc: &'a Document,
    block_id: &BlockId,
    path: Option<&[BlockId]>,
) -> Result<&'a BlockNode, BuilderError> {
    if let Some(path) = path {
        resolve_node_by_path(doc, path).ok_or_else(|| BuilderError::BlockNotFound(block_id.clone()))
    } else {
        crate::model::ops::find_node(doc, block_id).ok_or_else(|| BuilderError::BlockNotFound(block_id.clone()))
    }
}

fn content_piece_inline_node_at(content: &[crate::model::InlineContent], offset: usize) -> Option<InlineNode> {
    let mut pos = 0usize;
    for c in content {
        if pos == offset {
            return c.as_inline_node().cloned();
        }
        pos += c.len();
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::{BlockNode, Document, InlineContent, TextNode};
    use crate::selection::create_collapsed_selection;

    fn doc_with_para(text: &str) -> Document {
        Document::new(vec![BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain(text))],
        )])
    }

    #[test]
    fn insert_then_delete_round_trip_via_working_doc() {
        let doc = doc_with_para("");
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 0).unwrap();
        let schema = Arc::new(SchemaRegistry::new());
        let mut b = TransactionBuilder::new(schema, Origin::Command, sel, None, doc);
        b.insert_text(BlockId::from_raw("b1"), 0, "hi", MarkSet::new(), None).unwrap();
        assert_eq!(
            crate::model::ops::get_block_text(&b.working_doc().unwrap().blocks[0]),
            "hi"
        );
        b.delete_text_at(BlockId::from_raw("b1"), 0, 1, None).unwrap();
        let tr = b.build_at(1000);
        assert_eq!(tr.steps.len(), 2);
    }

    #[test]
    fn merge_blocks_at_derives_target_length() {
        let doc = Document::new(vec![
            BlockNode::new_leaf(
                BlockId::from_raw("b1"),
                "paragraph",
                Default::default(),
                vec![InlineContent::Text(TextNode::plain("foo"))],
            ),
            BlockNode::new_leaf(
                BlockId::from_raw("b2"),
                "paragraph",
                Default::default(),
                vec![InlineContent::Text(TextNode::plain("bar"))],
            ),
        ]);
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b2"), 0).unwrap();
        let schema = Arc::new(SchemaRegistry::new());
        let mut b = TransactionBuilder::new(schema, Origin::Command, sel, None, doc);
        b.merge_blocks_at(BlockId::from_raw("b1"), BlockId::from_raw("b2")).unwrap();
        match &b.steps()[0] {
            Step::MergeBlocks { target_length_before, .. } => assert_eq!(*target_length_before, 3),
            _ => panic!("expected MergeBlocks"),
        }
    }

    #[test]
    fn merge_blocks_at_rejects_non_adjacent_blocks() {
        let doc = Document::new(vec![
            BlockNode::new_leaf(BlockId::from_raw("b1"), "paragraph", Default::default(), vec![InlineContent::Text(TextNode::plain("foo"))]),
            BlockNode::new_leaf(BlockId::from_raw("mid"), "paragraph", Default::default(), vec![InlineContent::Text(TextNode::plain("---"))]),
            BlockNode::new_leaf(BlockId::from_raw("b2"), "paragraph", Default::default(), vec![InlineContent::Text(TextNode::plain("bar"))]),
        ]);
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b2"), 0).unwrap();
        let schema = Arc::new(SchemaRegistry::new());
        let mut b = TransactionBuilder::new(schema, Origin::Command, sel, None, doc);
        let err = b.merge_blocks_at(BlockId::from_raw("b1"), BlockId::from_raw("b2")).unwrap_err();
        assert_eq!(err, BuilderError::NotAdjacentForMerge(BlockId::from_raw("b1"), BlockId::from_raw("b2")));
        assert!(b.steps().is_empty());
    }

    #[test]
    fn stored_marks_clear_on_unrelated_step() {
        let doc = doc_with_para("hi");
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 0).unwrap();
        let schema = Arc::new(SchemaRegistry::new());
        let marks = MarkSet::from_sorted(vec![Mark::simple("bold")]);
        let mut b = TransactionBuilder::new(schema, Origin::Command, sel, Some(marks), doc);
        b.insert_text(BlockId::from_raw("b1"), 0, "x", MarkSet::new(), None).unwrap();
        let tr = b.build_at(1000);
        assert_eq!(tr.stored_marks_after, None);
    }

    #[test]
    fn stored_marks_clear_on_cross_block_selection_change() {
        let doc = Document::new(vec![
            BlockNode::new_leaf(BlockId::from_raw("b1"), "paragraph", Default::default(), vec![InlineContent::Text(TextNode::plain("a"))]),
            BlockNode::new_leaf(BlockId::from_raw("b2"), "paragraph", Default::default(), vec![InlineContent::Text(TextNode::plain("b"))]),
        ]);
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 0).unwrap();
        let schema = Arc::new(SchemaRegistry::new());
        let marks = MarkSet::from_sorted(vec![Mark::simple("bold")]);
        let mut b = TransactionBuilder::new(schema, Origin::Command, sel, Some(marks.clone()), doc.clone());
        let other = create_collapsed_selection(&doc, BlockId::from_raw("b2"), 0).unwrap();
        b.set_selection(other);
        let tr = b.build_at(1000);
        assert_eq!(tr.stored_marks_after, None);

        // Same-block selection moves leave storedMarks untouched.
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 0).unwrap();
        let mut b2 = TransactionBuilder::new(schema_clone(), Origin::Command, sel, Some(marks), doc.clone());
        let same_block = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 1).unwrap();
        b2.set_selection(same_block);
        let tr2 = b2.build_at(1000);
        assert!(tr2.stored_marks_after.is_some());
    }

    fn schema_clone() -> Arc<SchemaRegistry> {
        Arc::new(SchemaRegistry::new())
    }
}
