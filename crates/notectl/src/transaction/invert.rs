// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `invertStep`/`invertTransaction` (`spec.md` §4.5): total functions on
//! steps and transactions. Every case here reads only from the step's own
//! captured fields — never the document — which is the whole point of
//! carrying `deletedText`/`previousNodeType`/etc. in the first place.

use crate::model::ops::Segment;
use crate::transaction::step::{Origin, Step, Transaction, TransactionMetadata};

pub fn invert_step(step: &Step) -> Step {
    match step {
        Step::InsertText {
            block_id,
            offset,
            text,
            marks,
            path,
            ..
        } => Step::DeleteText {
            block_id: block_id.clone(),
            from: *offset,
            to: *offset + text.chars().count(),
            deleted_text: text.clone(),
            deleted_marks: marks.clone(),
            deleted_segments: vec![Segment::Text {
                text: text.clone(),
                marks: marks.clone(),
            }],
            path: path.clone(),
        },
        Step::DeleteText {
            block_id,
            from,
            deleted_text,
            deleted_marks,
            deleted_segments,
            path,
            ..
        } => Step::InsertText {
            block_id: block_id.clone(),
            offset: *from,
            text: deleted_text.clone(),
            marks: deleted_marks.clone(),
            segments: if deleted_segments.len() > 1 {
                Some(deleted_segments.clone())
            } else {
                None
            },
            path: path.clone(),
        },
        Step::SplitBlock {
            block_id,
            offset,
            new_block_id,
            ..
        } => Step::MergeBlocks {
            target_block_id: block_id.clone(),
            source_block_id: new_block_id.clone(),
            target_length_before: *offset,
        },
        Step::MergeBlocks {
            target_block_id,
            source_block_id,
            target_length_before,
        } => Step::SplitBlock {
            block_id: target_block_id.clone(),
            offset: *target_length_before,
            new_block_id: source_block_id.clone(),
            path: None,
        },
        Step::SetBlockType {
            block_id,
            previous_node_type,
            previous_attrs,
            node_type,
            attrs,
            path,
            ..
        } => Step::SetBlockType {
            block_id: block_id.clone(),
            node_type: previous_node_type.clone(),
            attrs: previous_attrs.clone(),
            previous_node_type: node_type.clone(),
            previous_attrs: attrs.clone(),
            path: path.clone(),
        },
        Step::AddMark {
            block_id,
            from,
            to,
            mark,
            path,
        } => Step::RemoveMark {
            block_id: block_id.clone(),
            from: *from,
            to: *to,
            mark: mark.clone(),
            path: path.clone(),
        },
        Step::RemoveMark {
            block_id,
            from,
            to,
            mark,
            path,
        } => Step::AddMark {
            block_id: block_id.clone(),
            from: *from,
            to: *to,
            mark: mark.clone(),
            path: path.clone(),
        },
        Step::SetStoredMarks { previous_marks, marks } => Step::SetStoredMarks {
            marks: previous_marks.clone(),
            previous_marks: marks.clone(),
        },
        Step::InsertNode {
            parent_path,
            index,
            node,
        } => Step::RemoveNode {
            parent_path: parent_path.clone(),
            index: *index,
            removed_node: node.clone(),
        },
        Step::RemoveNode {
            parent_path,
            index,
            removed_node,
        } => Step::InsertNode {
            parent_path: parent_path.clone(),
            index: *index,
            node: removed_node.clone(),
        },
        Step::SetNodeAttr {
            path,
            attrs,
            previous_attrs,
        } => Step::SetNodeAttr {
            path: path.clone(),
            attrs: previous_attrs.clone().unwrap_or_default(),
            previous_attrs: Some(attrs.clone()),
        },
        Step::InsertInlineNode {
            block_id,
            offset,
            node,
            path,
        } => Step::RemoveInlineNode {
            block_id: block_id.clone(),
            offset: *offset,
            removed_node: node.clone(),
            path: path.clone(),
        },
        Step::RemoveInlineNode {
            block_id,
            offset,
            removed_node,
            path,
        } => Step::InsertInlineNode {
            block_id: block_id.clone(),
            offset: *offset,
            node: removed_node.clone(),
            path: path.clone(),
        },
        Step::SetInlineNodeAttr {
            block_id,
            offset,
            attrs,
            previous_attrs,
            path,
        } => Step::SetInlineNodeAttr {
            block_id: block_id.clone(),
            offset: *offset,
            attrs: previous_attrs.clone(),
            previous_attrs: attrs.clone(),
            path: path.clone(),
        },
    }
}

/// `invertTransaction` (`spec.md` §4.5): reverse step order, swap before/
/// after selection, clear `storedMarksAfter`, re-stamp origin to `history`.
pub fn invert_transaction(tr: &Transaction, timestamp_ms: u64) -> Transaction {
    Transaction {
        steps: tr.steps.iter().rev().map(invert_step).collect(),
        selection_before: tr.selection_after.clone(),
        selection_after: tr.selection_before.clone(),
        stored_marks_after: None,
        metadata: TransactionMetadata {
            origin: Origin::History,
            timestamp_ms,
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::mark::MarkSet;

    #[test]
    fn insert_text_inverts_to_delete_text() {
        let step = Step::InsertText {
            block_id: BlockId::from_raw("b1"),
            offset: 2,
            text: "ab".to_owned(),
            marks: MarkSet::new(),
            segments: None,
            path: None,
        };
        let inv = invert_step(&step);
        match inv {
            Step::DeleteText { from, to, deleted_text, .. } => {
                assert_eq!((from, to), (2, 4));
                assert_eq!(deleted_text, "ab");
            }
            _ => panic!("expected DeleteText"),
        }
    }

    #[test]
    fn double_invert_is_identity_for_add_mark() {
        let step = Step::AddMark {
            block_id: BlockId::from_raw("b1"),
            from: 0,
            to: 2,
            mark: crate::model::mark::Mark::simple("bold"),
            path: None,
        };
        let back = invert_step(&invert_step(&step));
        assert_eq!(back, step);
    }
}
