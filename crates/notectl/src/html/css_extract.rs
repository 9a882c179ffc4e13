// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `serializeDocumentToCSS` (`spec.md` §4.8, "CSS class extraction mode"):
//! the same serializer pipeline, but every unique inline `style="…"` is
//! replaced by a generated `notectl-sN` class and alignment becomes
//! `notectl-align-LEFT|CENTER|RIGHT|JUSTIFY`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::html::serializer::serialize_document;
use crate::model::doc::Document;
use crate::schema::registry::SchemaRegistry;

static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"style="([^"]*)""#).unwrap());

pub struct CssExtraction {
    pub html: String,
    pub css: String,
}

/// Run the normal serializer, then rewrite every inline `style` attribute it
/// produced into one or more classes, returning the deduplicated rule set
/// alongside the rewritten markup.
pub fn serialize_document_to_css(doc: &Document, schema: &SchemaRegistry) -> CssExtraction {
    let html = serialize_document(doc, schema);
    extract_classes(&html)
}

fn extract_classes(html: &str) -> CssExtraction {
    let mut seen: Vec<(String, String)> = Vec::new();
    let mut next = 1usize;
    let mut rules: Vec<String> = Vec::new();

    let rewritten = STYLE_ATTR.replace_all(html, |caps: &regex::Captures| {
        let mut align_class = None;
        let mut rest: Vec<String> = Vec::new();

        for decl in caps[1].split(';') {
            let decl = decl.trim();
            if decl.is_empty() {
                continue;
            }
            match decl.split_once(':') {
                Some((prop, value)) if prop.trim().eq_ignore_ascii_case("text-align") => {
                    align_class = Some(format!("notectl-align-{}", value.trim().to_uppercase()));
                }
                _ => rest.push(decl.to_owned()),
            }
        }

        let mut classes = Vec::new();
        if let Some(ac) = align_class {
            classes.push(ac);
        }
        if !rest.is_empty() {
            let body = rest.join("; ");
            let class = match seen.iter().find(|(b, _)| *b == body) {
                Some((_, c)) => c.clone(),
                None => {
                    let c = format!("notectl-s{next}");
                    next += 1;
                    rules.push(format!(".{c} {{ {body}; }}"));
                    seen.push((body, c.clone()));
                    c
                }
            };
            classes.push(class);
        }

        if classes.is_empty() {
            String::new()
        } else {
            format!(r#"class="{}""#, classes.join(" "))
        }
    });

    CssExtraction {
        html: rewritten.into_owned(),
        css: rules.join("\n"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::block::BlockNode;
    use crate::model::inline::InlineContent;
    use crate::model::mark::{Mark, MarkSet};
    use crate::model::TextNode;
    use crate::schema::builtin;

    fn schema() -> SchemaRegistry {
        let mut s = SchemaRegistry::new();
        builtin::register_builtins(&mut s);
        s.finish_init();
        s
    }

    #[test]
    fn alignment_becomes_generated_class() {
        let schema = schema();
        let mut attrs = crate::model::attrs::attrs([]);
        attrs.insert("align".to_owned(), "right".into());
        let doc = Document::new(vec![BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "paragraph",
            attrs,
            vec![InlineContent::Text(TextNode::plain("hi"))],
        )]);
        let out = serialize_document_to_css(&doc, &schema);
        assert_eq!(out.html, r#"<p class="notectl-align-RIGHT">hi</p>"#);
        assert!(out.css.is_empty());
    }

    #[test]
    fn identical_style_spans_share_one_generated_class() {
        let schema = schema();
        let color = MarkSet::from_sorted(vec![Mark::new(
            "textColor",
            crate::model::attrs::attrs([("color", "red".into())]),
        )]);
        let doc = Document::new(vec![
            BlockNode::new_leaf(
                BlockId::from_raw("b1"),
                "paragraph",
                Default::default(),
                vec![InlineContent::Text(TextNode::new("a", color.clone()))],
            ),
            BlockNode::new_leaf(
                BlockId::from_raw("b2"),
                "paragraph",
                Default::default(),
                vec![InlineContent::Text(TextNode::new("b", color))],
            ),
        ]);
        let out = serialize_document_to_css(&doc, &schema);
        assert_eq!(out.html, r#"<p><span class="notectl-s1">a</span></p><p><span class="notectl-s1">b</span></p>"#);
        assert_eq!(out.css, ".notectl-s1 { color: red; }");
    }
}
