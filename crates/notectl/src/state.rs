// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `EditorState` (C6, `spec.md` §4.4): the immutable snapshot of
//! document + selection + storedMarks a host actually reads. Applying a
//! transaction folds its steps over a clone of the current document and
//! returns a brand new `EditorState`; the old one is untouched.

use std::sync::Arc;

use crate::ids::BlockId;
use crate::model::block::BlockNode;
use crate::model::doc::Document;
use crate::model::mark::MarkSet;
use crate::model::ops::find_node;
use crate::schema::registry::SchemaRegistry;
use crate::selection::Selection;
use crate::transaction::apply::{apply_step, ApplyStepError};
use crate::transaction::builder::TransactionBuilder;
use crate::transaction::step::{Origin, Transaction};

#[derive(Clone, Debug, PartialEq)]
pub enum ApplyTransactionError {
    Step(ApplyStepError),
}

impl std::fmt::Display for ApplyTransactionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyTransactionError::Step(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApplyTransactionError {}

impl From<ApplyStepError> for ApplyTransactionError {
    fn from(e: ApplyStepError) -> Self {
        ApplyTransactionError::Step(e)
    }
}

#[derive(Clone)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Selection,
    pub stored_marks: Option<MarkSet>,
    pub schema: Arc<SchemaRegistry>,
}

impl EditorState {
    pub fn new(doc: Document, selection: Selection, schema: Arc<SchemaRegistry>) -> Self {
        Self {
            doc,
            selection,
            stored_marks: None,
            schema,
        }
    }

    /// A builder primed with a clone of this state's document, selection
    /// and storedMarks (`spec.md` §4.4).
    pub fn transaction(&self, origin: Origin) -> TransactionBuilder {
        TransactionBuilder::new(
            self.schema.clone(),
            origin,
            self.selection.clone(),
            self.stored_marks.clone(),
            self.doc.clone(),
        )
    }

    /// Fold `tr`'s steps over a fresh copy of the document and return the
    /// resulting state. `tr.selectionAfter`/`tr.storedMarksAfter` become the
    /// new state's selection/storedMarks verbatim — the builder is
    /// responsible for having kept them consistent with the steps it
    /// appended.
    pub fn apply(&self, tr: &Transaction) -> Result<EditorState, ApplyTransactionError> {
        let mut doc = self.doc.clone();
        for step in &tr.steps {
            apply_step(&mut doc, &self.schema, step)?;
        }
        #[cfg(any(test, feature = "assert-invariants"))]
        crate::model::invariants::assert_invariants(&doc);
        Ok(EditorState {
            doc,
            selection: tr.selection_after.clone(),
            stored_marks: tr.stored_marks_after.clone(),
            schema: self.schema.clone(),
        })
    }

    pub fn get_block(&self, id: &BlockId) -> Option<&BlockNode> {
        find_node(&self.doc, id)
    }

    pub fn get_block_order(&self) -> Vec<BlockId> {
        self.doc.top_level_order()
    }
}
