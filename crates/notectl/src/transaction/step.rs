// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The step vocabulary (`spec.md` §4.5): fourteen locally-invertible
//! mutation primitives, plus the `Transaction` envelope that carries them.
//!
//! Every step carries enough information to compute its inverse without
//! consulting a document — that's the load-bearing design constraint behind
//! fields like `deletedText`/`previousNodeType` that look redundant at first
//! glance. See [`crate::transaction::invert::invert_step`].

use crate::ids::{BlockId, NodeTypeName};
use crate::model::attrs::AttrMap;
use crate::model::block::BlockNode;
use crate::model::inline::InlineNode;
use crate::model::mark::{Mark, MarkSet};
use crate::model::ops::Segment;
use crate::model::Path;

/// Where a transaction originated (`spec.md` §4.5). History admission and
/// grouping (§4.6) both key off this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Origin {
    Input,
    Paste,
    Command,
    History,
    Api,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    InsertText {
        block_id: BlockId,
        offset: usize,
        text: String,
        marks: MarkSet,
        /// Multi-run reconstruction, used when undoing a deletion that
        /// spanned more than one mark-run; when present this takes
        /// precedence over `text`/`marks` during application.
        segments: Option<Vec<Segment>>,
        path: Option<Path>,
    },
    DeleteText {
        block_id: BlockId,
        from: usize,
        to: usize,
        deleted_text: String,
        deleted_marks: MarkSet,
        deleted_segments: Vec<Segment>,
        path: Option<Path>,
    },
    SplitBlock {
        block_id: BlockId,
        offset: usize,
        new_block_id: BlockId,
        path: Option<Path>,
    },
    MergeBlocks {
        target_block_id: BlockId,
        source_block_id: BlockId,
        target_length_before: usize,
    },
    SetBlockType {
        block_id: BlockId,
        node_type: NodeTypeName,
        attrs: Option<AttrMap>,
        previous_node_type: NodeTypeName,
        previous_attrs: Option<AttrMap>,
        path: Option<Path>,
    },
    AddMark {
        block_id: BlockId,
        from: usize,
        to: usize,
        mark: Mark,
        path: Option<Path>,
    },
    RemoveMark {
        block_id: BlockId,
        from: usize,
        to: usize,
        mark: Mark,
        path: Option<Path>,
    },
    SetStoredMarks {
        marks: Option<MarkSet>,
        previous_marks: Option<MarkSet>,
    },
    InsertNode {
        parent_path: Path,
        index: usize,
        node: BlockNode,
    },
    RemoveNode {
        parent_path: Path,
        index: usize,
        removed_node: BlockNode,
    },
    SetNodeAttr {
        path: Path,
        attrs: AttrMap,
        previous_attrs: Option<AttrMap>,
    },
    InsertInlineNode {
        block_id: BlockId,
        offset: usize,
        node: InlineNode,
        path: Option<Path>,
    },
    RemoveInlineNode {
        block_id: BlockId,
        offset: usize,
        removed_node: InlineNode,
        path: Option<Path>,
    },
    SetInlineNodeAttr {
        block_id: BlockId,
        offset: usize,
        attrs: AttrMap,
        previous_attrs: AttrMap,
        path: Option<Path>,
    },
}

impl Step {
    /// Whether this step counts as document-modifying for history admission
    /// (`spec.md` §4.6 rule 1) — everything except `SetStoredMarks`.
    pub fn is_document_modifying(&self) -> bool {
        !matches!(self, Step::SetStoredMarks { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionMetadata {
    pub origin: Origin,
    pub timestamp_ms: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub steps: Vec<Step>,
    pub selection_before: crate::selection::Selection,
    pub selection_after: crate::selection::Selection,
    pub stored_marks_after: Option<MarkSet>,
    pub metadata: TransactionMetadata,
}

impl Transaction {
    /// Admission test for the history manager (`spec.md` §4.6 rule 1).
    pub fn is_admissible(&self) -> bool {
        self.steps.iter().any(Step::is_document_modifying)
    }
}
