// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Assertions that a document satisfies `spec.md` §3's invariants.
//!
//! Mirrors the teacher's `Dom::assert_invariants` — by default these are
//! only compiled under `#[cfg(test)]` or the `assert-invariants` feature, so
//! a release host never pays for a full-tree walk on every transaction.

use std::collections::HashSet;

use crate::model::block::{BlockChildren, BlockNode};
use crate::model::doc::Document;
use crate::model::inline::InlineContent;

#[cfg(any(test, feature = "assert-invariants"))]
pub fn assert_invariants(doc: &Document) {
    let mut seen = HashSet::new();
    for b in &doc.blocks {
        assert_block(b, &mut seen);
    }
}

#[cfg(any(test, feature = "assert-invariants"))]
fn assert_block<'a>(b: &'a BlockNode, seen: &mut HashSet<&'a crate::ids::BlockId>) {
    if !seen.insert(&b.id) {
        panic!("duplicate block id {}", b.id);
    }
    match &b.children {
        BlockChildren::Blocks(children) => {
            for c in children {
                assert_block(c, seen);
            }
        }
        BlockChildren::Inline(content) => assert_inline_content(content),
    }
}

#[cfg(any(test, feature = "assert-invariants"))]
fn assert_inline_content(content: &[InlineContent]) {
    let mut prev_marks: Option<&crate::model::mark::MarkSet> = None;
    for (i, c) in content.iter().enumerate() {
        if let InlineContent::Text(t) = c {
            if t.is_empty() && !(content.len() == 1) {
                panic!("empty text node found outside of an otherwise-empty block");
            }
            if let Some(prev) = prev_marks {
                if prev.set_eq(&t.marks) {
                    panic!("adjacent text nodes with identical mark sets found at index {i}");
                }
            }
            prev_marks = Some(&t.marks);
        } else {
            prev_marks = None;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::mark::MarkSet;
    use crate::model::TextNode;

    #[test]
    #[should_panic(expected = "duplicate block id")]
    fn duplicate_ids_panic() {
        let b1 = BlockNode::new_leaf(
            BlockId::from_raw("x"),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain("a"))],
        );
        let b2 = BlockNode::new_leaf(
            BlockId::from_raw("x"),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain("b"))],
        );
        let doc = Document::new(vec![b1, b2]);
        assert_invariants(&doc);
    }

    #[test]
    #[should_panic(expected = "adjacent text nodes")]
    fn adjacent_mark_equal_text_nodes_panic() {
        let b = BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "paragraph",
            Default::default(),
            vec![
                InlineContent::Text(TextNode::new("a", MarkSet::new())),
                InlineContent::Text(TextNode::new("b", MarkSet::new())),
            ],
        );
        let doc = Document::new(vec![b]);
        assert_invariants(&doc);
    }
}
