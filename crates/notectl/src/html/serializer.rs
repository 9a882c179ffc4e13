// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The HTML serializer (C9, `spec.md` §4.8): `Document × SchemaRegistry →
//! html`. Deterministic — two calls against the same document and registry
//! always produce the same string.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::html::sanitize::is_valid_css_color;
use crate::ids::MarkTypeName;
use crate::model::attrs::AttrValue;
use crate::model::block::{BlockChildren, BlockNode};
use crate::model::inline::InlineContent;
use crate::model::mark::Mark;
use crate::schema::registry::SchemaRegistry;

static OPEN_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<([a-zA-Z][a-zA-Z0-9-]*)((?:\s[^<>]*)?)>").unwrap());
static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bstyle\s*=\s*"([^"]*)""#).unwrap());

/// Render a whole document to HTML. Top-level blocks are serialized in
/// document order and concatenated with no separator (`spec.md` §4.8, "Top
/// level"); consecutive `list_item` blocks are re-nested into `<ul>/<ol>`
/// first (`spec.md` §4.8, "Lists").
pub fn serialize_document(doc: &crate::model::doc::Document, schema: &SchemaRegistry) -> String {
    let mut out = String::new();
    let mut run: Vec<&BlockNode> = Vec::new();
    for block in &doc.blocks {
        if block.node_type.as_str() == "list_item" {
            run.push(block);
            continue;
        }
        if !run.is_empty() {
            out.push_str(&serialize_list_run(&run, schema));
            run.clear();
        }
        out.push_str(&serialize_block(block, schema));
    }
    if !run.is_empty() {
        out.push_str(&serialize_list_run(&run, schema));
    }
    out
}

struct ListFrame {
    tag: &'static str,
    indent: i64,
    items: Vec<String>,
}

fn close_frame(frame: ListFrame) -> String {
    format!("<{tag}>{}</{tag}>", frame.items.concat(), tag = frame.tag)
}

/// Splice `nested` into the last accumulated `<li>…</li>` so it lands
/// inside the preceding item, per `spec.md` §4.8's wrapper-stack rule.
fn attach_nested(parent_items: &mut [String], nested: String) {
    if let Some(last) = parent_items.last_mut() {
        if let Some(pos) = last.rfind("</li>") {
            last.insert_str(pos, &nested);
            return;
        }
    }
}

fn list_tag(block: &BlockNode) -> &'static str {
    match block.attrs.get("listType").and_then(AttrValue::as_str) {
        Some("ordered") => "ol",
        _ => "ul",
    }
}

fn serialize_list_run(items: &[&BlockNode], schema: &SchemaRegistry) -> String {
    let mut stack: Vec<ListFrame> = Vec::new();
    let mut roots: Vec<String> = Vec::new();

    for block in items {
        let indent = block.attrs.get("indent").and_then(AttrValue::as_num).unwrap_or(0.0) as i64;
        let tag = list_tag(block);

        while let Some(top) = stack.last() {
            if top.indent > indent || (top.indent == indent && top.tag != tag) {
                let frame = stack.pop().unwrap();
                let html = close_frame(frame);
                match stack.last_mut() {
                    Some(parent) => attach_nested(&mut parent.items, html),
                    None => roots.push(html),
                }
            } else {
                break;
            }
        }

        let needs_new_frame = stack.last().map(|f| f.indent != indent).unwrap_or(true);
        if needs_new_frame {
            stack.push(ListFrame { tag, indent, items: Vec::new() });
        }

        let li_html = serialize_block(block, schema);
        stack.last_mut().unwrap().items.push(li_html);
    }

    while let Some(frame) = stack.pop() {
        let html = close_frame(frame);
        match stack.last_mut() {
            Some(parent) => attach_nested(&mut parent.items, html),
            None => roots.push(html),
        }
    }
    roots.concat()
}

/// Serialize one block, recursing into children first so `toHTML` always
/// receives already-built inner HTML.
pub fn serialize_block(block: &BlockNode, schema: &SchemaRegistry) -> String {
    let inner = match &block.children {
        BlockChildren::Blocks(children) => children.iter().map(|c| serialize_block(c, schema)).collect(),
        BlockChildren::Inline(content) => {
            if content.is_empty() {
                "<br>".to_owned()
            } else {
                serialize_inline_content(content, schema)
            }
        }
    };

    let Some(spec) = schema.node_spec(&block.node_type) else {
        log::warn!("no NodeSpec registered for `{}`; emitting inner HTML unwrapped", block.node_type);
        return inner;
    };

    let html = (spec.to_html)(block, &inner);

    match block.attrs.get("align").and_then(|v| v.as_str()) {
        Some(align) if matches!(align, "left" | "center" | "right" | "justify") => {
            inject_text_align(html, align)
        }
        _ => html,
    }
}

/// Inject `text-align: VALUE` into the block's own outer element's `style`
/// attribute, unless `toHTML` already emitted one (`spec.md` §4.8,
/// "Alignment": "if the block's own toHTML already emits a text-align, no
/// second injection occurs").
fn inject_text_align(html: String, align: &str) -> String {
    let Some(caps) = OPEN_TAG.captures(&html) else {
        return html;
    };
    let attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    if let Some(style_caps) = STYLE_ATTR.captures(attrs) {
        if style_caps[1].to_ascii_lowercase().contains("text-align") {
            return html;
        }
        let whole = style_caps.get(0).unwrap();
        let new_style = format!(r#"style="{}; text-align: {align}""#, style_caps[1].trim_end_matches(';'));
        let tag_end = caps.get(0).unwrap().end();
        let mut out = String::with_capacity(html.len() + new_style.len());
        out.push_str(&html[..caps.get(1).unwrap().end()]);
        out.push_str(&attrs[..whole.start()]);
        out.push_str(&new_style);
        out.push_str(&attrs[whole.end()..]);
        out.push('>');
        out.push_str(&html[tag_end..]);
        return out;
    }
    let tag_name_end = caps.get(1).unwrap().end();
    let mut out = String::with_capacity(html.len() + 32);
    out.push_str(&html[..tag_name_end]);
    out.push_str(&format!(r#" style="text-align: {align}""#));
    out.push_str(&html[tag_name_end..]);
    out
}

/// Walk a leaf block's inline content, coalescing adjacent text nodes with
/// identical mark sets and wrapping each run in its marks (`spec.md` §4.8,
/// "Inline content and marks").
pub fn serialize_inline_content(content: &[InlineContent], schema: &SchemaRegistry) -> String {
    let mut out = String::new();
    let mut run_text = String::new();
    let mut run_marks: Option<&crate::model::mark::MarkSet> = None;

    let flush = |out: &mut String, text: &mut String, marks: &mut Option<&crate::model::mark::MarkSet>| {
        if !text.is_empty() {
            out.push_str(&render_run(text, marks.take(), schema));
            text.clear();
        }
        *marks = None;
    };

    for piece in content {
        match piece {
            InlineContent::Text(t) => {
                let same_run = match run_marks {
                    Some(m) => m.set_eq(&t.marks) && !run_text.is_empty(),
                    None => run_text.is_empty(),
                };
                if !same_run {
                    flush(&mut out, &mut run_text, &mut run_marks);
                }
                run_marks = Some(&t.marks);
                run_text.push_str(&t.text);
            }
            InlineContent::Inline(node) => {
                flush(&mut out, &mut run_text, &mut run_marks);
                if let Some(spec) = schema.inline_spec(&node.node_type) {
                    out.push_str(&(spec.to_html)(node));
                } else {
                    log::warn!("no InlineNodeSpec registered for `{}`", node.node_type);
                }
            }
        }
    }
    flush(&mut out, &mut run_text, &mut run_marks);
    out
}

fn render_run(text: &str, marks: Option<&crate::model::mark::MarkSet>, schema: &SchemaRegistry) -> String {
    let escaped = escape_text(text);
    let Some(marks) = marks else {
        return escaped;
    };

    let mut tag_marks: Vec<(&Mark, &MarkTypeName)> = Vec::new();
    let mut style_fragments: Vec<String> = Vec::new();

    for mark in marks.as_slice() {
        let Some(spec) = schema.mark_spec(&mark.mark_type) else {
            continue;
        };
        if let Some(to_html_style) = &spec.to_html_style {
            if let Some(frag) = to_html_style(mark) {
                if is_style_fragment_safe(&frag) {
                    style_fragments.push(frag);
                }
            }
        }
        if spec.to_html_string.is_some() {
            tag_marks.push((mark, &mark.mark_type));
        }
    }

    // marks.as_slice() is already rank-ordered (lowest rank first); nest
    // lowest rank outermost by folding innermost-out.
    let mut inner = escaped;
    if !style_fragments.is_empty() {
        style_fragments.sort();
        inner = format!(r#"<span style="{}">{inner}</span>"#, style_fragments.join("; "));
    }
    for (mark, _) in tag_marks.into_iter().rev() {
        let spec = schema.mark_spec(&mark.mark_type).unwrap();
        let to_html_string = spec.to_html_string.as_ref().unwrap();
        inner = to_html_string(mark, &inner);
    }
    inner
}

/// A style mark's `toHTMLStyle` is trusted to have validated its own value
/// (e.g. via [`is_valid_css_color`]); this is a defense-in-depth check
/// against a fragment that slipped through without validation.
fn is_style_fragment_safe(frag: &str) -> bool {
    if let Some((prop, value)) = frag.split_once(':') {
        if prop.trim().eq_ignore_ascii_case("color") || prop.trim().eq_ignore_ascii_case("background-color") {
            return is_valid_css_color(value.trim());
        }
    }
    !frag.contains('<') && !frag.contains('>') && !frag.contains('"')
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::mark::MarkSet;
    use crate::model::{Document, TextNode};
    use crate::schema::builtin;

    fn schema() -> SchemaRegistry {
        let mut s = SchemaRegistry::new();
        builtin::register_builtins(&mut s);
        s.finish_init();
        s
    }

    #[test]
    fn empty_leaf_block_renders_br_placeholder() {
        let schema = schema();
        let block = BlockNode::new_leaf(BlockId::from_raw("b1"), "paragraph", Default::default(), vec![]);
        let html = serialize_block(&block, &schema);
        assert_eq!(html, "<p><br></p>");
    }

    #[test]
    fn escapes_reserved_characters() {
        let schema = schema();
        let block = BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain("<a> & \"b\""))],
        );
        let html = serialize_block(&block, &schema);
        assert_eq!(html, "<p>&lt;a&gt; &amp; &quot;b&quot;</p>");
    }

    #[test]
    fn adjacent_runs_with_same_marks_coalesce_under_one_wrapper() {
        let schema = schema();
        let bold = MarkSet::from_sorted(vec![Mark::simple("bold")]);
        let content = vec![
            InlineContent::Text(TextNode::new("ab", bold.clone())),
            InlineContent::Text(TextNode::new("cd", bold)),
        ];
        let html = serialize_inline_content(&content, &schema);
        assert_eq!(html, "<strong>abcd</strong>");
    }

    #[test]
    fn alignment_is_injected_once() {
        let schema = schema();
        let mut attrs = crate::model::attrs::attrs([]);
        attrs.insert("align".to_owned(), "center".into());
        let block = BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "paragraph",
            attrs,
            vec![InlineContent::Text(TextNode::plain("hi"))],
        );
        let html = serialize_block(&block, &schema);
        assert_eq!(html, r#"<p style="text-align: center">hi</p>"#);
    }

    fn list_item(id: &str, list_type: &str, indent: f64, text: &str) -> BlockNode {
        let attrs = crate::model::attrs::attrs([("listType", list_type.into()), ("indent", indent.into())]);
        BlockNode::new_leaf(BlockId::from_raw(id), "list_item", attrs, vec![InlineContent::Text(TextNode::plain(text))])
    }

    #[test]
    fn flat_list_items_nest_by_indent() {
        let schema = schema();
        let doc = Document::new(vec![
            list_item("a", "bullet", 0.0, "one"),
            list_item("b", "bullet", 1.0, "nested"),
            list_item("c", "bullet", 0.0, "two"),
        ]);
        let html = serialize_document(&doc, &schema);
        assert_eq!(html, "<ul><li>one<ul><li>nested</li></ul></li><li>two</li></ul>");
    }

    #[test]
    fn checklist_item_renders_checkbox_input() {
        let schema = schema();
        let attrs = crate::model::attrs::attrs([("listType", "todo".into()), ("indent", 0.0.into()), ("checked", true.into())]);
        let doc = Document::new(vec![BlockNode::new_leaf(
            BlockId::from_raw("a"),
            "list_item",
            attrs,
            vec![InlineContent::Text(TextNode::plain("done"))],
        )]);
        let html = serialize_document(&doc, &schema);
        assert_eq!(
            html,
            r#"<ul><li role="checkbox" aria-checked="true"><input type="checkbox" disabled checked>done</li></ul>"#
        );
    }
}
