// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `HistoryManager` (C7, `spec.md` §4.6): two stacks of summary
//! transactions, grouped by origin and arrival time, with a depth cap and
//! redo invalidation on new admissions.

use std::collections::VecDeque;

use crate::selection::Selection;
use crate::transaction::invert::invert_transaction;
use crate::transaction::step::{Origin, Step, Transaction, TransactionMetadata};

#[derive(Clone, Debug)]
pub struct HistoryConfig {
    pub max_depth: usize,
    pub group_timeout_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: 100,
            group_timeout_ms: 500,
        }
    }
}

/// The union of steps from one undo group, plus the group's selection
/// bookends and the timestamp of its most recent member (used to decide
/// whether the *next* transaction extends it).
#[derive(Clone, Debug)]
struct Group {
    steps: Vec<Step>,
    selection_before: Selection,
    selection_after: Selection,
    origin: Origin,
    last_timestamp_ms: u64,
}

impl Group {
    fn from_transaction(tr: &Transaction) -> Self {
        Self {
            steps: tr.steps.clone(),
            selection_before: tr.selection_before.clone(),
            selection_after: tr.selection_after.clone(),
            origin: tr.metadata.origin,
            last_timestamp_ms: tr.metadata.timestamp_ms,
        }
    }

    fn extend(&mut self, tr: &Transaction) {
        self.steps.extend(tr.steps.iter().cloned());
        self.selection_after = tr.selection_after.clone();
        self.last_timestamp_ms = tr.metadata.timestamp_ms;
    }

    fn as_transaction(&self) -> Transaction {
        Transaction {
            steps: self.steps.clone(),
            selection_before: self.selection_before.clone(),
            selection_after: self.selection_after.clone(),
            stored_marks_after: None,
            metadata: TransactionMetadata {
                origin: self.origin,
                timestamp_ms: self.last_timestamp_ms,
            },
        }
    }
}

#[derive(Default)]
pub struct HistoryManager {
    config: HistoryConfig,
    undo_stack: VecDeque<Group>,
    redo_stack: Vec<Group>,
}

impl HistoryManager {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Record an already-applied transaction. Rules 1-4 of `spec.md` §4.6:
    /// admission, grouping, redo invalidation, depth cap.
    pub fn record(&mut self, tr: &Transaction) {
        if !tr.is_admissible() {
            return;
        }
        self.redo_stack.clear();

        let extends_tail = tr.metadata.origin == Origin::Input
            && self
                .undo_stack
                .back()
                .map(|g| {
                    g.origin == Origin::Input
                        && tr.metadata.timestamp_ms >= g.last_timestamp_ms
                        && tr.metadata.timestamp_ms - g.last_timestamp_ms <= self.config.group_timeout_ms
                })
                .unwrap_or(false);

        if extends_tail {
            self.undo_stack.back_mut().unwrap().extend(tr);
        } else {
            self.undo_stack.push_back(Group::from_transaction(tr));
        }

        while self.undo_stack.len() > self.config.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Rule 5: pop the top undo group, invert it, bookend its selection with
    /// `current_selection` as `selectionBefore` (what the view actually
    /// shows right now, not what was recorded), and push the original group
    /// onto the redo stack. Returns the transaction to apply, or `None` if
    /// there is nothing to undo.
    pub fn undo(&mut self, current_selection: Selection, timestamp_ms: u64) -> Option<Transaction> {
        let group = self.undo_stack.pop_back()?;
        let summary = group.as_transaction();
        let mut inverted = invert_transaction(&summary, timestamp_ms);
        inverted.selection_before = current_selection;
        inverted.selection_after = group.selection_before.clone();
        self.redo_stack.push(group);
        Some(inverted)
    }

    /// Rule 6: symmetric to `undo`.
    pub fn redo(&mut self, current_selection: Selection, timestamp_ms: u64) -> Option<Transaction> {
        let group = self.redo_stack.pop()?;
        let mut tr = group.as_transaction();
        tr.selection_before = current_selection;
        tr.selection_after = group.selection_after.clone();
        tr.metadata.timestamp_ms = timestamp_ms;
        self.undo_stack.push_back(group);
        Some(tr)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::mark::MarkSet;
    use crate::selection::{create_collapsed_selection, Point, TextSelection};

    fn insert_tr(block_id: &str, offset: usize, ch: &str, timestamp_ms: u64) -> Transaction {
        let point_before = Point::new(BlockId::from_raw(block_id), offset);
        let point_after = Point::new(BlockId::from_raw(block_id), offset + 1);
        Transaction {
            steps: vec![Step::InsertText {
                block_id: BlockId::from_raw(block_id),
                offset,
                text: ch.to_owned(),
                marks: MarkSet::new(),
                segments: None,
                path: None,
            }],
            selection_before: Selection::Text(TextSelection {
                anchor: point_before.clone(),
                head: point_before,
            }),
            selection_after: Selection::Text(TextSelection {
                anchor: point_after.clone(),
                head: point_after,
            }),
            stored_marks_after: None,
            metadata: TransactionMetadata {
                origin: Origin::Input,
                timestamp_ms,
            },
        }
    }

    #[test]
    fn consecutive_input_transactions_within_window_group_together() {
        let mut history = HistoryManager::new(HistoryConfig {
            max_depth: 100,
            group_timeout_ms: 500,
        });
        for (i, ch) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            history.record(&insert_tr("b1", i, ch, (i as u64) * 100));
        }
        assert_eq!(history.undo_stack.len(), 1);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let cur_sel = create_collapsed_selection(
            &crate::model::Document::new(vec![crate::model::BlockNode::new_leaf(
                BlockId::from_raw("b1"),
                "paragraph",
                Default::default(),
                vec![crate::model::InlineContent::Text(crate::model::TextNode::plain("abcde"))],
            )]),
            BlockId::from_raw("b1"),
            5,
        )
        .unwrap();
        let undo_tr = history.undo(cur_sel, 1000).unwrap();
        assert_eq!(undo_tr.steps.len(), 5);
        assert!(history.can_redo());
    }

    #[test]
    fn non_input_origin_never_coalesces() {
        let mut history = HistoryManager::new(HistoryConfig::default());
        let mut tr = insert_tr("b1", 0, "a", 0);
        tr.metadata.origin = Origin::Command;
        history.record(&tr);
        let mut tr2 = insert_tr("b1", 1, "b", 50);
        tr2.metadata.origin = Origin::Command;
        history.record(&tr2);
        assert_eq!(history.undo_stack.len(), 2);
    }

    #[test]
    fn depth_cap_evicts_oldest_group() {
        let mut history = HistoryManager::new(HistoryConfig {
            max_depth: 2,
            group_timeout_ms: 0,
        });
        let mut tr_a = insert_tr("b1", 0, "a", 0);
        tr_a.metadata.origin = Origin::Command;
        history.record(&tr_a);
        let mut tr_b = insert_tr("b1", 1, "b", 1000);
        tr_b.metadata.origin = Origin::Command;
        history.record(&tr_b);
        let mut tr_c = insert_tr("b1", 2, "c", 2000);
        tr_c.metadata.origin = Origin::Command;
        history.record(&tr_c);
        assert_eq!(history.undo_stack.len(), 2);
    }
}
