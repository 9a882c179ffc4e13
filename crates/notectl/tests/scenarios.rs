// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Concrete scenarios S1-S6.

use std::sync::Arc;

use notectl::history::{HistoryConfig, HistoryManager};
use notectl::ids::BlockId;
use notectl::keyboard::{dispatch_keydown, CompositionTracker, KeyEvent};
use notectl::model::ops::get_block_text;
use notectl::model::{attrs, BlockNode, Document, InlineContent, Mark, MarkSet, TextNode};
use notectl::reconcile::caret::DispatchOutcome;
use notectl::schema::builtin;
use notectl::schema::keymap::{Keymap, KeymapTier};
use notectl::schema::registry::SchemaRegistry;
use notectl::selection::{create_collapsed_selection, create_gap_cursor, GapSide, Point, Selection, TextSelection};
use notectl::state::EditorState;
use notectl::transaction::step::Origin;

fn default_schema() -> Arc<SchemaRegistry> {
    let mut reg = SchemaRegistry::new();
    builtin::register_builtins(&mut reg);
    reg.finish_init();
    Arc::new(reg)
}

/// S1 — Typed grouping.
#[test]
fn s1_typed_grouping() {
    let schema = default_schema();
    let b1 = BlockId::from_raw("b1");
    let doc = Document::new(vec![BlockNode::new_leaf(b1.clone(), "paragraph", attrs([]), vec![])]);
    let selection = create_collapsed_selection(&doc, b1.clone(), 0).unwrap();
    let mut state = EditorState::new(doc, selection, schema);
    let mut history = HistoryManager::new(HistoryConfig::default());

    for (i, ch) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        let mut builder = state.transaction(Origin::Input);
        builder.insert_text(b1.clone(), i, *ch, MarkSet::new(), None).unwrap();
        let next_point = Point::new(b1.clone(), i + 1);
        builder.set_selection(Selection::Text(TextSelection {
            anchor: next_point.clone(),
            head: next_point,
        }));
        let tr = builder.build_at((i as u64) * 100);
        state = state.apply(&tr).unwrap();
        history.record(&tr);
    }

    assert_eq!(get_block_text(state.get_block(&b1).unwrap()), "abcde");
    assert!(history.can_undo());

    let undo_tr = history.undo(state.selection.clone(), 1000).unwrap();
    state = state.apply(&undo_tr).unwrap();
    assert_eq!(get_block_text(state.get_block(&b1).unwrap()), "");
    assert_eq!(state.selection, create_collapsed_selection(&state.doc, b1.clone(), 0).unwrap());

    let redo_tr = history.redo(state.selection.clone(), 1100).unwrap();
    state = state.apply(&redo_tr).unwrap();
    assert_eq!(get_block_text(state.get_block(&b1).unwrap()), "abcde");
    assert_eq!(state.selection, create_collapsed_selection(&state.doc, b1, 5).unwrap());
}

/// S2 — Mark consolidation in serialization.
#[test]
fn s2_mark_consolidation_in_serialization() {
    let schema = default_schema();
    let marks = MarkSet::from_sorted(vec![
        Mark::new("textColor", attrs([("color", "red".into())])),
        Mark::new("highlight", attrs([("color", "yellow".into())])),
    ]);
    let block = BlockNode::new_leaf(
        BlockId::from_raw("b1"),
        "paragraph",
        attrs([]),
        vec![
            InlineContent::Text(TextNode::new("hello ", marks.clone())),
            InlineContent::Text(TextNode::new("world", marks)),
        ],
    );
    let doc = Document::new(vec![block]);
    let html = notectl::html::serialize_document(&doc, &schema);
    assert_eq!(html, r#"<p><span style="background-color: yellow; color: red">hello world</span></p>"#);
}

/// S3 — List re-nesting.
#[test]
fn s3_list_renesting() {
    let schema = default_schema();
    let item = |id: &str, indent: f64, text: &str| {
        BlockNode::new_leaf(
            BlockId::from_raw(id),
            "list_item",
            attrs([("listType", "bullet".into()), ("indent", indent.into())]),
            vec![InlineContent::Text(TextNode::plain(text))],
        )
    };
    let doc = Document::new(vec![
        item("a", 0.0, "A"),
        item("b", 1.0, "B"),
        item("c", 2.0, "C"),
        item("d", 1.0, "D"),
    ]);
    let html = notectl::html::serialize_document(&doc, &schema);
    assert_eq!(
        html,
        "<ul><li>A<ul><li>B<ul><li>C</li></ul></li><li>D</li></ul></li></ul>"
    );
}

/// S4 — Word parser import.
#[cfg(feature = "sys")]
#[test]
fn s4_word_parser_import() {
    let schema = default_schema();
    let html = format!(
        "<p class=\"MsoListParagraphCxSpFirst\" style=\"mso-list: l0\"><span style=\"mso-list:Ignore\">{}</span>item</p>",
        '\u{b7}'
    );
    let source = notectl::html::HtmlSource::Word;
    assert_eq!(notectl::html::parser::detect_source(&html), source);
    let normalized = notectl::html::parser::normalize_source(&html, source);
    let slice = notectl::html::parse_html(&normalized, &schema);

    assert_eq!(slice.blocks.len(), 1);
    let block = &slice.blocks[0];
    assert_eq!(block.node_type.as_str(), "list_item");
    assert_eq!(block.attrs.get("listType").and_then(|v| v.as_str()), Some("bullet"));
    assert_eq!(block.attrs.get("indent").and_then(|v| v.as_num()), Some(0.0));
    assert_eq!(get_block_text(block), "item");
}

/// S5 — GapCursor delete.
#[test]
fn s5_gap_cursor_delete() {
    let schema = default_schema();
    let p1 = BlockId::from_raw("p1");
    let hr = BlockId::from_raw("hr");
    let p2 = BlockId::from_raw("p2");
    let doc = Document::new(vec![
        BlockNode::new_leaf(p1.clone(), "paragraph", attrs([]), vec![InlineContent::Text(TextNode::plain("one"))]),
        BlockNode::new_leaf(hr.clone(), "hr", attrs([]), vec![]),
        BlockNode::new_leaf(p2.clone(), "paragraph", attrs([]), vec![InlineContent::Text(TextNode::plain("two"))]),
    ]);
    let selection = create_gap_cursor(&doc, hr, GapSide::After).unwrap();
    let state = EditorState::new(doc, selection, schema);
    let composition = CompositionTracker::default();

    let outcome = dispatch_keydown(&KeyEvent::new("Backspace"), &state, &composition, false);
    let Some(DispatchOutcome::Apply(tr)) = outcome else {
        panic!("expected an applied transaction");
    };
    let next = state.apply(&tr).unwrap();

    assert_eq!(next.doc.top_level_order(), vec![p1, p2.clone()]);
    assert_eq!(next.selection, create_collapsed_selection(&next.doc, p2, 0).unwrap());
}

/// S6 — Keymap priority fallthrough.
#[test]
fn s6_keymap_priority_fallthrough() {
    use std::sync::Mutex;

    let mut schema = SchemaRegistry::new();
    builtin::register_builtins(&mut schema);

    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut context_keymap = Keymap::new();
    let log_ctx = log.clone();
    context_keymap.bind(
        "Enter",
        Arc::new(move |_state, _builder| {
            log_ctx.lock().unwrap().push("context");
            false
        }),
    );

    let mut navigation_keymap = Keymap::new();
    let log_nav = log.clone();
    navigation_keymap.bind(
        "Enter",
        Arc::new(move |_state, _builder| {
            log_nav.lock().unwrap().push("navigation");
            false
        }),
    );

    let mut default_keymap = Keymap::new();
    let log_def = log.clone();
    default_keymap.bind(
        "Enter",
        Arc::new(move |_state, _builder| {
            log_def.lock().unwrap().push("default");
            log::info!("d");
            true
        }),
    );

    schema.keymaps.register(KeymapTier::Context, context_keymap);
    schema.keymaps.register(KeymapTier::Navigation, navigation_keymap);
    schema.keymaps.register(KeymapTier::Default, default_keymap);
    schema.finish_init();

    let b1 = BlockId::from_raw("b1");
    let doc = Document::new(vec![BlockNode::new_leaf(b1.clone(), "paragraph", attrs([]), vec![])]);
    let selection = create_collapsed_selection(&doc, b1, 0).unwrap();
    let state = EditorState::new(doc, selection, Arc::new(schema));
    let mut builder = state.transaction(Origin::Input);

    let handled = state
        .schema
        .keymaps
        .dispatch(&[KeymapTier::Context, KeymapTier::Navigation, KeymapTier::Default], "Enter", &state, &mut builder);

    assert!(handled);
    assert_eq!(*log.lock().unwrap(), vec!["context", "navigation", "default"]);
}
