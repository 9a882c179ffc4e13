// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The standard node/mark/inline-node specs that ship with the engine:
//! paragraph, heading, blockquote, list item, horizontal rule, hard break,
//! and the inline marks bold/italic/underline/strike/code/link/textColor/
//! highlight.
//!
//! Concrete plugin bodies beyond this (image upload, table drag-resize,
//! …) are explicitly out of scope (`spec.md` §1); this module exists so the
//! registry has something real to register, parse and serialize in tests
//! and in §8's scenarios, not as a stand-in for a plugin ecosystem.

use std::sync::Arc;

use crate::ids::BlockId;
use crate::model::attrs::{attrs, AttrValue};
use crate::model::block::BlockNode;
use crate::model::mark::Mark;
use crate::model::ops::{find_node, get_block_length, get_block_text};
use crate::reconcile::caret::{next_grapheme_offset, prev_grapheme_offset};
use crate::schema::keymap::{Keymap, KeymapTier};
use crate::schema::mark_spec::{MarkParseRule, MarkSpec};
use crate::schema::node_spec::{
    AttrSpec, DomElementSpec, NodeParseRule, NodeSpec, SanitizeContribution,
};
use crate::schema::registry::SchemaRegistry;
use crate::selection::{Point, Selection, TextSelection};
use crate::state::EditorState;
use crate::transaction::builder::TransactionBuilder;

fn attr_str(block: &BlockNode, key: &str, default: &str) -> String {
    block
        .attrs
        .get(key)
        .and_then(AttrValue::as_str)
        .map(|s| s.to_owned())
        .unwrap_or_else(|| default.to_owned())
}

fn paragraph_spec() -> NodeSpec {
    NodeSpec {
        node_type: "paragraph".into(),
        group: Some("block".to_owned()),
        content_allow: Vec::new(),
        attrs: [("align".to_owned(), AttrSpec { default: "left".into() })]
            .into_iter()
            .collect(),
        exclude_marks: Vec::new(),
        is_void: false,
        isolating: false,
        selectable: false,
        to_dom: Arc::new(|_node| DomElementSpec {
            tag: "p".to_owned(),
            attrs: Vec::new(),
        }),
        to_html: Arc::new(|_node, inner| {
            if inner.is_empty() {
                "<p><br></p>".to_owned()
            } else {
                format!("<p>{inner}</p>")
            }
        }),
        parse_html: vec![NodeParseRule {
            priority: 0,
            matches: Arc::new(|el| el.tag.eq_ignore_ascii_case("p")),
            to_attrs: Arc::new(|_el| attrs([])),
        }],
        wrapper: None,
        sanitize: SanitizeContribution {
            tags: vec!["p".to_owned()],
            attrs: vec!["style".to_owned(), "class".to_owned()],
        },
    }
}

fn heading_spec() -> NodeSpec {
    NodeSpec {
        node_type: "heading".into(),
        group: Some("block".to_owned()),
        content_allow: Vec::new(),
        attrs: [
            ("level".to_owned(), AttrSpec { default: 1.0.into() }),
            ("align".to_owned(), AttrSpec { default: "left".into() }),
        ]
        .into_iter()
        .collect(),
        exclude_marks: Vec::new(),
        is_void: false,
        isolating: false,
        selectable: false,
        to_dom: Arc::new(|node| DomElementSpec {
            tag: heading_tag(node),
            attrs: Vec::new(),
        }),
        to_html: Arc::new(|node, inner| {
            let tag = heading_tag(node);
            format!("<{tag}>{inner}</{tag}>")
        }),
        parse_html: (1..=6)
            .map(|level| NodeParseRule {
                priority: 0,
                matches: Arc::new(move |el| el.tag.eq_ignore_ascii_case(&format!("h{level}"))),
                to_attrs: Arc::new(move |_el| attrs([("level", (level as f64).into())])),
            })
            .collect(),
        wrapper: None,
        sanitize: SanitizeContribution {
            tags: (1..=6).map(|l| format!("h{l}")).collect(),
            attrs: vec!["style".to_owned()],
        },
    }
}

fn heading_tag(node: &BlockNode) -> String {
    let level = node
        .attrs
        .get("level")
        .and_then(AttrValue::as_num)
        .unwrap_or(1.0) as i64;
    format!("h{}", level.clamp(1, 6))
}

fn blockquote_spec() -> NodeSpec {
    NodeSpec {
        node_type: "blockquote".into(),
        group: Some("block".to_owned()),
        content_allow: vec!["paragraph".into(), "heading".into()],
        attrs: Default::default(),
        exclude_marks: Vec::new(),
        is_void: false,
        isolating: false,
        selectable: false,
        to_dom: Arc::new(|_| DomElementSpec {
            tag: "blockquote".to_owned(),
            attrs: Vec::new(),
        }),
        to_html: Arc::new(|_node, inner| format!("<blockquote>{inner}</blockquote>")),
        parse_html: vec![NodeParseRule {
            priority: 0,
            matches: Arc::new(|el| el.tag.eq_ignore_ascii_case("blockquote")),
            to_attrs: Arc::new(|_el| attrs([])),
        }],
        wrapper: None,
        sanitize: SanitizeContribution {
            tags: vec!["blockquote".to_owned()],
            attrs: vec![],
        },
    }
}

fn list_item_spec() -> NodeSpec {
    NodeSpec {
        node_type: "list_item".into(),
        group: Some("block".to_owned()),
        content_allow: Vec::new(),
        attrs: [
            ("listType".to_owned(), AttrSpec { default: "bullet".into() }),
            ("indent".to_owned(), AttrSpec { default: 0.0.into() }),
            ("checked".to_owned(), AttrSpec { default: false.into() }),
        ]
        .into_iter()
        .collect(),
        exclude_marks: Vec::new(),
        is_void: false,
        isolating: false,
        selectable: false,
        to_dom: Arc::new(|_| DomElementSpec {
            tag: "li".to_owned(),
            attrs: Vec::new(),
        }),
        // Actual list re-nesting into <ul>/<ol> happens in the serializer
        // (`spec.md` §4.8, "Lists"); a single item's own `toHTML` only ever
        // needs to produce its `<li>` content.
        to_html: Arc::new(|node, inner| {
            let is_checklist = node
                .attrs
                .get("listType")
                .and_then(AttrValue::as_str)
                .map(|t| t == "todo")
                .unwrap_or(false);
            if is_checklist {
                let checked = node
                    .attrs
                    .get("checked")
                    .and_then(AttrValue::as_bool)
                    .unwrap_or(false);
                let checked_attr = if checked { " checked" } else { "" };
                format!(
                    "<li role=\"checkbox\" aria-checked=\"{checked}\"><input type=\"checkbox\" disabled{checked_attr}>{inner}</li>"
                )
            } else {
                format!("<li>{inner}</li>")
            }
        }),
        parse_html: vec![NodeParseRule {
            priority: 0,
            matches: Arc::new(|el| el.tag.eq_ignore_ascii_case("li")),
            to_attrs: Arc::new(|_el| attrs([])),
        }],
        wrapper: None,
        sanitize: SanitizeContribution {
            tags: vec!["li".to_owned(), "ul".to_owned(), "ol".to_owned(), "input".to_owned()],
            attrs: vec![
                "role".to_owned(),
                "aria-checked".to_owned(),
                "type".to_owned(),
                "checked".to_owned(),
                "disabled".to_owned(),
            ],
        },
    }
}

fn hr_spec() -> NodeSpec {
    NodeSpec {
        node_type: "hr".into(),
        group: Some("block".to_owned()),
        content_allow: Vec::new(),
        attrs: Default::default(),
        exclude_marks: Vec::new(),
        is_void: true,
        isolating: false,
        selectable: true,
        to_dom: Arc::new(|_| DomElementSpec {
            tag: "hr".to_owned(),
            attrs: Vec::new(),
        }),
        to_html: Arc::new(|_node, _inner| "<hr>".to_owned()),
        parse_html: vec![NodeParseRule {
            priority: 0,
            matches: Arc::new(|el| el.tag.eq_ignore_ascii_case("hr")),
            to_attrs: Arc::new(|_el| attrs([])),
        }],
        wrapper: None,
        sanitize: SanitizeContribution {
            tags: vec!["hr".to_owned()],
            attrs: vec![],
        },
    }
}

fn hard_break_spec() -> crate::schema::node_spec::InlineNodeSpec {
    crate::schema::node_spec::InlineNodeSpec {
        node_type: "hard_break".into(),
        attrs: Default::default(),
        to_dom: Arc::new(|_| DomElementSpec {
            tag: "br".to_owned(),
            attrs: Vec::new(),
        }),
        to_html: Arc::new(|_| "<br>".to_owned()),
        parse_html: vec![NodeParseRule {
            priority: 0,
            matches: Arc::new(|el| el.tag.eq_ignore_ascii_case("br")),
            to_attrs: Arc::new(|_el| attrs([])),
        }],
        sanitize: SanitizeContribution {
            tags: vec!["br".to_owned()],
            attrs: vec![],
        },
    }
}

fn simple_tag_mark(mark_type: &'static str, rank: i32, tag: &'static str) -> MarkSpec {
    MarkSpec {
        mark_type: mark_type.into(),
        rank,
        to_html_string: Some(Arc::new(move |_mark, inner| format!("<{tag}>{inner}</{tag}>"))),
        to_html_style: None,
        parse_html: vec![MarkParseRule {
            priority: 0,
            matches: Arc::new(|el| el.tag.eq_ignore_ascii_case(tag)),
            to_mark: Arc::new(move |_el| Mark::simple(mark_type)),
        }],
    }
}

fn link_spec() -> MarkSpec {
    MarkSpec {
        mark_type: "link".into(),
        rank: 50,
        to_html_string: Some(Arc::new(|mark, inner| {
            let href = mark
                .attrs
                .get("href")
                .and_then(AttrValue::as_str)
                .unwrap_or("");
            let escaped = html_escape::encode_double_quoted_attribute(href);
            format!("<a href=\"{escaped}\">{inner}</a>")
        })),
        to_html_style: None,
        parse_html: vec![MarkParseRule {
            priority: 0,
            matches: Arc::new(|el| el.tag.eq_ignore_ascii_case("a")),
            to_mark: Arc::new(|el| {
                let href = el.attr("href").unwrap_or("").to_owned();
                Mark::new("link", attrs([("href", href.into())]))
            }),
        }],
    }
}

fn text_color_spec() -> MarkSpec {
    MarkSpec {
        mark_type: "textColor".into(),
        rank: 80,
        to_html_string: None,
        to_html_style: Some(Arc::new(|mark| {
            let color = mark.attrs.get("color").and_then(AttrValue::as_str)?;
            if crate::html::sanitize::is_valid_css_color(color) {
                Some(format!("color: {color}"))
            } else {
                None
            }
        })),
        parse_html: vec![MarkParseRule {
            priority: 0,
            matches: Arc::new(|el| el.style_prop("color").is_some()),
            to_mark: Arc::new(|el| {
                let color = el.style_prop("color").unwrap_or_default();
                Mark::new("textColor", attrs([("color", color.into())]))
            }),
        }],
    }
}

fn highlight_spec() -> MarkSpec {
    MarkSpec {
        mark_type: "highlight".into(),
        rank: 81,
        to_html_string: None,
        to_html_style: Some(Arc::new(|mark| {
            let color = mark.attrs.get("color").and_then(AttrValue::as_str)?;
            if crate::html::sanitize::is_valid_css_color(color) {
                Some(format!("background-color: {color}"))
            } else {
                None
            }
        })),
        parse_html: vec![MarkParseRule {
            priority: 0,
            matches: Arc::new(|el| el.style_prop("background-color").is_some()),
            to_mark: Arc::new(|el| {
                let color = el.style_prop("background-color").unwrap_or_default();
                Mark::new("highlight", attrs([("color", color.into())]))
            }),
        }],
    }
}

/// Register the standard library of node/inline/mark specs described above
/// into `registry`. Intended to run once during plugin init, before
/// `finish_init()`.
pub fn register_builtins(registry: &mut SchemaRegistry) {
    registry.register_node_spec(paragraph_spec());
    registry.register_node_spec(heading_spec());
    registry.register_node_spec(blockquote_spec());
    registry.register_node_spec(list_item_spec());
    registry.register_node_spec(hr_spec());
    registry.register_inline_spec(hard_break_spec());

    registry.register_mark_spec(simple_tag_mark("bold", 0, "strong"));
    registry.register_mark_spec(simple_tag_mark("italic", 1, "em"));
    registry.register_mark_spec(simple_tag_mark("underline", 2, "u"));
    registry.register_mark_spec(simple_tag_mark("strike", 3, "s"));
    registry.register_mark_spec(simple_tag_mark("code", 4, "code"));
    registry.register_mark_spec(link_spec());
    registry.register_mark_spec(text_color_spec());
    registry.register_mark_spec(highlight_spec());

    register_default_keymap(registry);
}

fn collapsed_point(state: &EditorState) -> Option<(BlockId, usize)> {
    let sel = state.selection.as_text()?;
    if !sel.is_collapsed() {
        return None;
    }
    Some((sel.head.block_id.clone(), sel.head.offset))
}

fn set_caret(builder: &mut TransactionBuilder, block_id: BlockId, offset: usize) {
    let point = Point::new(block_id, offset);
    builder.set_selection(Selection::Text(TextSelection {
        anchor: point.clone(),
        head: point,
    }));
}

/// Splits the current block at the caret, landing the caret at the start of
/// the new block.
fn handle_enter(state: &EditorState, builder: &mut TransactionBuilder) -> bool {
    let Some((block_id, offset)) = collapsed_point(state) else {
        return false;
    };
    let new_id = BlockId::new();
    if builder.split_block(block_id, offset, new_id.clone(), None).is_err() {
        return false;
    }
    set_caret(builder, new_id, 0);
    true
}

/// Mid-block: removes the grapheme cluster before the caret. At block
/// start: merges the block into its previous sibling, if any.
fn handle_backspace(state: &EditorState, builder: &mut TransactionBuilder) -> bool {
    let Some((block_id, offset)) = collapsed_point(state) else {
        return false;
    };
    if offset > 0 {
        let Some(block) = find_node(&state.doc, &block_id) else {
            return false;
        };
        let from = prev_grapheme_offset(&get_block_text(block), offset);
        if builder.delete_text_at(block_id.clone(), from, offset, None).is_err() {
            return false;
        }
        set_caret(builder, block_id, from);
        true
    } else {
        let order = state.doc.top_level_order();
        let pos = match order.iter().position(|b| b == &block_id) {
            Some(p) => p,
            None => return false,
        };
        let Some(prev_id) = pos.checked_sub(1).and_then(|i| order.get(i).cloned()) else {
            return false;
        };
        let Some(prev_block) = find_node(&state.doc, &prev_id) else {
            return false;
        };
        let prev_len = get_block_length(prev_block);
        if builder.merge_blocks_at(prev_id.clone(), block_id).is_err() {
            return false;
        }
        set_caret(builder, prev_id, prev_len);
        true
    }
}

/// Mid-block: removes the grapheme cluster after the caret. At block end:
/// merges the next sibling into the current block, if any.
fn handle_delete(state: &EditorState, builder: &mut TransactionBuilder) -> bool {
    let Some((block_id, offset)) = collapsed_point(state) else {
        return false;
    };
    let Some(block) = find_node(&state.doc, &block_id) else {
        return false;
    };
    let len = get_block_length(block);
    if offset < len {
        let to = next_grapheme_offset(&get_block_text(block), offset);
        if builder.delete_text_at(block_id.clone(), offset, to, None).is_err() {
            return false;
        }
        set_caret(builder, block_id, offset);
        true
    } else {
        let order = state.doc.top_level_order();
        let pos = match order.iter().position(|b| b == &block_id) {
            Some(p) => p,
            None => return false,
        };
        let Some(next_id) = order.get(pos + 1).cloned() else {
            return false;
        };
        if builder.merge_blocks_at(block_id.clone(), next_id).is_err() {
            return false;
        }
        set_caret(builder, block_id, offset);
        true
    }
}

/// Binds Enter/Backspace/Delete to the builder calls above and registers
/// them at `KeymapTier::Default`, so they sit below any host context/
/// navigation keymaps but still fire once nothing more specific claims the
/// key (`spec.md` §4.7).
pub fn register_default_keymap(registry: &mut SchemaRegistry) {
    let mut keymap = Keymap::new();
    keymap.bind("Enter", Arc::new(handle_enter));
    keymap.bind("Backspace", Arc::new(handle_backspace));
    keymap.bind("Delete", Arc::new(handle_delete));
    registry.keymaps.register(KeymapTier::Default, keymap);
}

// `attr_str` is used by node types (table cells, etc.) that a future plugin
// would add on top of this standard library; kept here so that crate isn't
// dead code before such a plugin exists.
#[allow(dead_code)]
fn _use_attr_str(b: &BlockNode) -> String {
    attr_str(b, "align", "left")
}
