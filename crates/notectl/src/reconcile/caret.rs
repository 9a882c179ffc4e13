// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Caret navigation (C11, `spec.md` §4.10-4.11): the model-level fallback
//! used once the keymap dispatch found nothing bound, plus the
//! NodeSelection/GapCursor arrow interception that happens upstream of it
//! in the keyboard pipeline (`spec.md` §4.7 steps 2-3).
//!
//! `Selection.modify` is the browser's oracle for visual word/line
//! movement; this crate has no browser; everything here is the "logical"
//! fallback the spec calls out as always-available.

use unicode_segmentation::UnicodeSegmentation;

use crate::ids::BlockId;
use crate::keyboard::descriptor::KeyEvent;
use crate::model::ops::get_block_length;
use crate::model::Document;
use crate::schema::registry::SchemaRegistry;
use crate::selection::{GapCursor, GapSide, NodeSelection, Point, Selection, TextSelection};
use crate::state::EditorState;
use crate::transaction::step::Origin;

/// What a guarded or fallback-navigated keydown resolves to: either a
/// transaction to apply, or a block with no transaction — the browser's
/// own default must not run either way (`spec.md` §4.11, "Blocked").
#[derive(Debug)]
pub enum DispatchOutcome {
    Apply(crate::transaction::step::Transaction),
    Blocked,
}

fn is_void(schema: &SchemaRegistry, doc: &Document, id: &BlockId) -> bool {
    crate::model::ops::find_node(doc, id)
        .and_then(|b| schema.node_spec(&b.node_type))
        .map(|s| s.is_void)
        .unwrap_or(false)
}

fn is_isolating(schema: &SchemaRegistry, doc: &Document, id: &BlockId) -> bool {
    crate::model::ops::find_node(doc, id)
        .and_then(|b| schema.node_spec(&b.node_type))
        .map(|s| s.isolating)
        .unwrap_or(false)
}

fn sibling(doc: &Document, id: &BlockId, forward: bool) -> Option<BlockId> {
    let order = doc.top_level_order();
    let pos = order.iter().position(|b| b == id)?;
    if forward {
        order.get(pos + 1).cloned()
    } else {
        pos.checked_sub(1).and_then(|i| order.get(i).cloned())
    }
}

/// `spec.md` §4.7 step 2: a plain arrow against a NodeSelection converts to
/// an adjacent cursor, a GapCursor, or stays blocked at an isolating
/// boundary.
pub fn resolve_node_selection_arrow(state: &EditorState, node_sel: &NodeSelection, event: &KeyEvent) -> DispatchOutcome {
    let forward = matches!(event.key.as_str(), "ArrowRight" | "ArrowDown");
    let Some(neighbor) = sibling(&state.doc, &node_sel.node_id, forward) else {
        return DispatchOutcome::Blocked;
    };
    let outcome = selection_entering(state, &neighbor, !forward);
    let mut builder = state.transaction(Origin::Input);
    builder.set_selection(outcome);
    DispatchOutcome::Apply(builder.build())
}

/// `spec.md` §4.7 step 3 + §4.11: printable/Enter/Backspace/Delete against
/// a GapCursor. Arrows are not handled here; the caller falls through to
/// keymap dispatch and then [`navigate_arrow`].
pub fn resolve_gap_cursor_key(state: &EditorState, gap: &GapCursor, event: &KeyEvent) -> Option<DispatchOutcome> {
    let order = state.doc.top_level_order();
    let pos = order.iter().position(|b| b == &gap.node_id)?;
    let insert_at = match gap.side {
        GapSide::Before => pos,
        GapSide::After => pos + 1,
    };

    if event.is_printable() {
        let new_id = BlockId::new();
        let text = crate::model::TextNode::plain(event.key.clone());
        let para = crate::model::BlockNode::new_leaf(
            new_id.clone(),
            "paragraph",
            Default::default(),
            vec![crate::model::InlineContent::Text(text)],
        );
        let mut builder = state.transaction(Origin::Input);
        if builder.insert_node(Vec::new(), insert_at, para).is_err() {
            return None;
        }
        builder.set_selection(Selection::Text(TextSelection {
            anchor: Point::new(new_id.clone(), 1),
            head: Point::new(new_id, 1),
        }));
        return Some(DispatchOutcome::Apply(builder.build()));
    }

    match event.key.as_str() {
        "Enter" => {
            let new_id = BlockId::new();
            let para = crate::model::BlockNode::new_leaf(
                new_id.clone(),
                "paragraph",
                Default::default(),
                vec![crate::model::InlineContent::Text(crate::model::TextNode::plain(""))],
            );
            let mut builder = state.transaction(Origin::Input);
            if builder.insert_node(Vec::new(), insert_at, para).is_err() {
                return None;
            }
            builder.set_selection(Selection::Text(TextSelection {
                anchor: Point::new(new_id.clone(), 0),
                head: Point::new(new_id, 0),
            }));
            Some(DispatchOutcome::Apply(builder.build()))
        }
        "Backspace" if gap.side == GapSide::After => remove_gap_neighbor(state, pos),
        "Delete" if gap.side == GapSide::Before => remove_gap_neighbor(state, pos),
        _ => None,
    }
}

fn remove_gap_neighbor(state: &EditorState, pos: usize) -> Option<DispatchOutcome> {
    let order = state.doc.top_level_order();
    let after_removal = order.get(pos + 1).cloned().or_else(|| {
        if pos > 0 {
            order.get(pos - 1).cloned()
        } else {
            None
        }
    });
    let mut builder = state.transaction(Origin::Input);
    if builder.remove_node(Vec::new(), pos).is_err() {
        return None;
    }
    if let Some(next_id) = after_removal {
        builder.set_selection(Selection::Text(TextSelection {
            anchor: Point::new(next_id.clone(), 0),
            head: Point::new(next_id, 0),
        }));
    }
    Some(DispatchOutcome::Apply(builder.build()))
}

/// `spec.md` §4.7 step 6: the navigator entered once nothing else claimed
/// a plain arrow key. Moves a collapsed TextSelection by one grapheme
/// within a block, or across a block boundary.
pub fn navigate_arrow(state: &EditorState, event: &KeyEvent) -> Option<DispatchOutcome> {
    let Selection::Text(sel) = &state.selection else {
        return None;
    };
    if !sel.is_collapsed() {
        return None;
    }
    let forward = matches!(event.key.as_str(), "ArrowRight" | "ArrowDown");
    let block = crate::model::ops::find_node(&state.doc, &sel.head.block_id)?;
    let text = crate::model::ops::get_block_text(block);
    let len = get_block_length(block);

    let new_point = if forward && sel.head.offset < len {
        Point::new(sel.head.block_id.clone(), next_grapheme_offset(&text, sel.head.offset))
    } else if !forward && sel.head.offset > 0 {
        Point::new(sel.head.block_id.clone(), prev_grapheme_offset(&text, sel.head.offset))
    } else {
        let Some(neighbor) = sibling(&state.doc, &sel.head.block_id, forward) else {
            return None;
        };
        let selection = selection_entering(state, &neighbor, !forward);
        let mut builder = state.transaction(Origin::Input);
        builder.set_selection(selection);
        return Some(DispatchOutcome::Apply(builder.build()));
    };

    let mut builder = state.transaction(Origin::Input);
    builder.set_selection(Selection::Text(TextSelection {
        anchor: new_point.clone(),
        head: new_point,
    }));
    Some(DispatchOutcome::Apply(builder.build()))
}

/// The selection created when caret movement lands on `block_id`, arriving
/// `from_end` (true: enter at the end of the block; false: at the start).
/// Void blocks become a NodeSelection; isolating blocks are never entered
/// and instead produce a GapCursor on the side facing the direction of
/// travel (`spec.md` §4.10, "Navigation guarantees").
fn selection_entering(state: &EditorState, block_id: &BlockId, from_end: bool) -> Selection {
    if is_isolating(&state.schema, &state.doc, block_id) {
        let side = if from_end { GapSide::After } else { GapSide::Before };
        return Selection::Gap(GapCursor {
            node_id: block_id.clone(),
            side,
        });
    }
    if is_void(&state.schema, &state.doc, block_id) {
        return Selection::Node(NodeSelection {
            node_id: block_id.clone(),
            path: None,
        });
    }
    let block = crate::model::ops::find_node(&state.doc, block_id);
    let offset = if from_end {
        block.map(get_block_length).unwrap_or(0)
    } else {
        0
    };
    let point = Point::new(block_id.clone(), offset);
    Selection::Text(TextSelection {
        anchor: point.clone(),
        head: point,
    })
}

fn grapheme_char_bounds(text: &str) -> Vec<usize> {
    let mut bounds = vec![0usize];
    let mut count = 0usize;
    for g in text.graphemes(true) {
        count += g.chars().count();
        bounds.push(count);
    }
    bounds
}

/// The next grapheme-cluster boundary after `offset`, in chars. Shared with
/// the default Backspace/Delete keymap, which deletes one grapheme cluster
/// rather than one char (`spec.md` §4.7).
pub(crate) fn next_grapheme_offset(text: &str, offset: usize) -> usize {
    let bounds = grapheme_char_bounds(text);
    bounds.into_iter().find(|&b| b > offset).unwrap_or_else(|| text.chars().count())
}

pub(crate) fn prev_grapheme_offset(text: &str, offset: usize) -> usize {
    let bounds = grapheme_char_bounds(text);
    bounds.into_iter().rev().find(|&b| b < offset).unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::{BlockNode, InlineContent, TextNode};
    use crate::schema::registry::SchemaRegistry;
    use crate::selection::create_collapsed_selection;
    use std::sync::Arc;

    fn doc_two_paragraphs() -> Document {
        Document::new(vec![
            BlockNode::new_leaf(
                BlockId::from_raw("b1"),
                "paragraph",
                Default::default(),
                vec![InlineContent::Text(TextNode::plain("ab"))],
            ),
            BlockNode::new_leaf(
                BlockId::from_raw("b2"),
                "paragraph",
                Default::default(),
                vec![InlineContent::Text(TextNode::plain("cd"))],
            ),
        ])
    }

    #[test]
    fn arrow_right_within_block_advances_one_char() {
        let doc = doc_two_paragraphs();
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 0).unwrap();
        let state = EditorState::new(doc, sel, Arc::new(SchemaRegistry::new()));
        let outcome = navigate_arrow(&state, &KeyEvent::new("ArrowRight")).unwrap();
        match outcome {
            DispatchOutcome::Apply(tr) => {
                assert_eq!(tr.selection_after.as_text().unwrap().head.offset, 1);
            }
            DispatchOutcome::Blocked => panic!("expected Apply"),
        }
    }

    #[test]
    fn arrow_right_crosses_block_boundary_at_end() {
        let doc = doc_two_paragraphs();
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 2).unwrap();
        let state = EditorState::new(doc, sel, Arc::new(SchemaRegistry::new()));
        let outcome = navigate_arrow(&state, &KeyEvent::new("ArrowRight")).unwrap();
        match outcome {
            DispatchOutcome::Apply(tr) => {
                let point = &tr.selection_after.as_text().unwrap().head;
                assert_eq!(point.block_id, BlockId::from_raw("b2"));
                assert_eq!(point.offset, 0);
            }
            DispatchOutcome::Blocked => panic!("expected Apply"),
        }
    }

    #[test]
    fn arrow_left_at_document_start_is_not_handled() {
        let doc = doc_two_paragraphs();
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 0).unwrap();
        let state = EditorState::new(doc, sel, Arc::new(SchemaRegistry::new()));
        assert!(navigate_arrow(&state, &KeyEvent::new("ArrowLeft")).is_none());
    }
}
