// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The HTML parser (C10, `spec.md` §4.9): `String × SchemaRegistry →
//! ContentSlice`. Builds on `html5ever`'s fragment parser and
//! `markup5ever_rcdom`'s ready-made tree rather than a bespoke `TreeSink` —
//! the normalization pass in [`super::normalize`] already does the
//! vendor-specific surgery a hand-rolled sink would otherwise need to do
//! itself, so the tree this module walks is always plain, well-formed
//! markup.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_fragment, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::htmlview::ElementView;
use crate::ids::BlockId;
use crate::model::attrs::{attrs, AttrMap};
use crate::model::block::BlockNode;
use crate::model::inline::{InlineContent, InlineNode, TextNode};
use crate::model::mark::MarkSet;
use crate::schema::registry::SchemaRegistry;

use super::normalize;

/// The result of parsing one HTML string: a flat run of top-level blocks
/// ready to splice into a document (`spec.md` §4.9, "Output").
pub struct ContentSlice {
    pub blocks: Vec<BlockNode>,
}

/// Detect the source, normalize it accordingly, parse it, and walk the
/// result into a [`ContentSlice`] using `schema`'s registered parse rules.
pub fn parse_html(html: &str, schema: &SchemaRegistry) -> ContentSlice {
    let source = normalize::detect_source(html);
    let normalized = normalize::normalize_source(html, source);
    let dom = parse_fragment_dom(&normalized);

    let mut blocks = Vec::new();
    for child in dom.document.children.borrow().iter() {
        walk_top_level(child, schema, &mut blocks);
    }
    ContentSlice { blocks }
}

fn parse_fragment_dom(html: &str) -> RcDom {
    let context = QualName::new(None, "http://www.w3.org/1999/xhtml".into(), "body".into());
    parse_fragment(RcDom::default(), Default::default(), context, vec![])
        .from_utf8()
        .one(html.as_bytes())
}

fn element_view(node: &Handle) -> Option<ElementView> {
    match &node.data {
        NodeData::Element { name, attrs, .. } => Some(ElementView {
            tag: name.local.to_string(),
            attrs: attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect(),
            text_content: text_content(node),
        }),
        _ => None,
    }
}

fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}

/// Find the highest-priority registered node rule that matches `view`
/// (`spec.md` §4.9, "Parse-rule priority"), across every registered node
/// type — a plugin's rule can outrank a builtin's for the same tag.
fn find_best_node_rule<'a>(schema: &'a SchemaRegistry, view: &ElementView) -> Option<(&'a crate::schema::node_spec::NodeSpec, AttrMap)> {
    let mut best: Option<(i32, &crate::schema::node_spec::NodeSpec, AttrMap)> = None;
    for spec in schema.node_specs() {
        for rule in &spec.parse_html {
            if (rule.matches)(view) && best.as_ref().map(|(p, ..)| rule.priority > *p).unwrap_or(true) {
                best = Some((rule.priority, spec, (rule.to_attrs)(view)));
            }
        }
    }
    best.map(|(_, spec, attrs)| (spec, attrs))
}

fn walk_top_level(node: &Handle, schema: &SchemaRegistry, out: &mut Vec<BlockNode>) {
    let Some(view) = element_view(node) else {
        if let NodeData::Text { contents } = &node.data {
            let text = contents.borrow().to_string();
            if !text.trim().is_empty() {
                out.push(BlockNode::new_leaf(BlockId::new(), "paragraph", attrs([]), vec![InlineContent::Text(TextNode::plain(text))]));
            }
        }
        return;
    };

    if view.tag.eq_ignore_ascii_case("ul") || view.tag.eq_ignore_ascii_case("ol") {
        flatten_list(node, 0, schema, out);
        return;
    }

    if let Some((spec, parsed_attrs)) = find_best_node_rule(schema, &view) {
        let normalized = spec.normalize_attrs(&parsed_attrs);
        if spec.content_allow.is_empty() {
            let mut inline = Vec::new();
            for child in node.children.borrow().iter() {
                collect_inline_node(child, &MarkSet::new(), schema, &mut inline);
            }
            out.push(BlockNode::new_leaf(BlockId::new(), spec.node_type.clone(), normalized, coalesce_inline(inline)));
        } else {
            let mut children = Vec::new();
            for child in node.children.borrow().iter() {
                walk_top_level(child, schema, &mut children);
            }
            out.push(BlockNode::new_compound(BlockId::new(), spec.node_type.clone(), normalized, children));
        }
        return;
    }

    // No registered rule recognizes this element. Non-Matrix sources are
    // expected to carry plenty of markup no plugin declared an opinion
    // about (`<div>` wrappers, stray `<font>` tags); recurse into its
    // children rather than dropping them on the floor.
    for child in node.children.borrow().iter() {
        walk_top_level(child, schema, out);
    }
}

/// Flatten a (possibly nested) `<ul>`/`<ol>` into flat `list_item` blocks
/// carrying `listType`/`indent` attrs, the representation the serializer's
/// own list re-nesting (`spec.md` §4.8) expects back. Google Docs emits a
/// nested list as a `<ul>` sibling of the preceding `<li>` rather than as
/// that `<li>`'s child; either shape continues the indent level by one.
fn flatten_list(list_el: &Handle, indent: i64, schema: &SchemaRegistry, out: &mut Vec<BlockNode>) {
    let list_type = element_view(list_el)
        .map(|v| if v.tag.eq_ignore_ascii_case("ol") { "ordered" } else { "bullet" })
        .unwrap_or("bullet");

    for child in list_el.children.borrow().iter() {
        let Some(view) = element_view(child) else { continue };

        if view.tag.eq_ignore_ascii_case("li") {
            let mut inline = Vec::new();
            let mut nested = Vec::new();
            let mut is_todo = false;
            let mut checked = false;

            for grandchild in child.children.borrow().iter() {
                if let Some(gv) = element_view(grandchild) {
                    if gv.tag.eq_ignore_ascii_case("ul") || gv.tag.eq_ignore_ascii_case("ol") {
                        nested.push(grandchild.clone());
                        continue;
                    }
                    if gv.tag.eq_ignore_ascii_case("input") && gv.attr("type").map(|t| t.eq_ignore_ascii_case("checkbox")).unwrap_or(false) {
                        is_todo = true;
                        checked = gv.attr("checked").is_some();
                        continue;
                    }
                }
                collect_inline_node(grandchild, &MarkSet::new(), schema, &mut inline);
            }

            let mut item_attrs = attrs([
                ("listType", (if is_todo { "todo" } else { list_type }).into()),
                ("indent", (indent as f64).into()),
            ]);
            if is_todo {
                item_attrs.insert("checked".to_owned(), checked.into());
            }
            if let Some(spec) = schema.node_spec(&"list_item".into()) {
                item_attrs = spec.normalize_attrs(&item_attrs);
            }

            out.push(BlockNode::new_leaf(BlockId::new(), "list_item", item_attrs, coalesce_inline(inline)));
            for nested_list in nested {
                flatten_list(&nested_list, indent + 1, schema, out);
            }
        } else if view.tag.eq_ignore_ascii_case("ul") || view.tag.eq_ignore_ascii_case("ol") {
            flatten_list(child, indent + 1, schema, out);
        }
    }
}

fn collect_inline_node(node: &Handle, marks: &MarkSet, schema: &SchemaRegistry, out: &mut Vec<InlineContent>) {
    match &node.data {
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            if !text.is_empty() {
                out.push(InlineContent::Text(TextNode::new(text, marks.clone())));
            }
        }
        NodeData::Element { .. } => {
            let view = element_view(node).unwrap();

            if view.tag.eq_ignore_ascii_case("br") {
                out.push(InlineContent::Inline(InlineNode::new("hard_break", attrs([]))));
                return;
            }

            let mut next_marks = marks.clone();
            for spec in schema.mark_specs() {
                if let Some(rule) = spec.parse_html.iter().filter(|r| (r.matches)(&view)).max_by_key(|r| r.priority) {
                    let mark = (rule.to_mark)(&view);
                    next_marks = next_marks.with_added(mark, |t| schema.mark_rank(t));
                }
            }

            for child in node.children.borrow().iter() {
                collect_inline_node(child, &next_marks, schema, out);
            }
        }
        _ => {}
    }
}

/// Merge adjacent text runs that ended up with identical mark sets, the
/// inverse of the serializer's own coalescing (`spec.md` §4.8).
fn coalesce_inline(items: Vec<InlineContent>) -> Vec<InlineContent> {
    let mut out: Vec<InlineContent> = Vec::new();
    for item in items {
        if let InlineContent::Text(cur) = &item {
            if let Some(InlineContent::Text(prev)) = out.last_mut() {
                if prev.marks.set_eq(&cur.marks) {
                    prev.text.push_str(&cur.text);
                    continue;
                }
            }
        }
        out.push(item);
    }
    out
}
