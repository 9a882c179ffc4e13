// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Source detection and normalization (`spec.md` §4.9, "Source
//! normalization"). Vendor fingerprints are plain substring/regex checks on
//! the raw markup; the cleanup passes themselves also operate on the raw
//! string rather than a parsed DOM tree — markup5ever's tree requires
//! well-formed input to build in the first place, and vendor pasteboard
//! HTML (especially Word's) routinely isn't, so these passes run first and
//! hand the *parser* well-formed-enough markup instead of the reverse.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HtmlSource {
    Browser,
    Word,
    GoogleDocs,
    Pages,
}

pub fn detect_source(html: &str) -> HtmlSource {
    if html.contains("xmlns:w=") || html.contains("<!--[if gte mso") || MSO_CLASS.is_match(html) {
        HtmlSource::Word
    } else if html.contains(r#"id="docs-internal-guid""#) || html.contains("data-sheets-") {
        HtmlSource::GoogleDocs
    } else if html.contains("-webkit-text-") || html.contains("Pages") {
        HtmlSource::Pages
    } else {
        HtmlSource::Browser
    }
}

pub fn normalize_source(html: &str, source: HtmlSource) -> String {
    let cleaned = match source {
        HtmlSource::Word => normalize_word(html),
        HtmlSource::GoogleDocs => normalize_google_docs(html),
        HtmlSource::Pages => normalize_google_docs(html),
        HtmlSource::Browser => html.to_owned(),
    };
    strip_style_and_class(&cleaned)
}

static MSO_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"class="Mso[A-Za-z]*""#).unwrap());
static CONDITIONAL_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--\[if[^\]]*mso[^\]]*\]>.*?<!\[endif\]-->").unwrap());
static PLAIN_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static NAMESPACED_ELEMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<(o|v|w):([a-zA-Z]+)[^>]*>.*?</\1:\2>|<(o|v|w):([a-zA-Z]+)[^>]*/?>").unwrap());
static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\sstyle="([^"]*)""#).unwrap());
static CLASS_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\sclass="[^"]*""#).unwrap());
static SPAN_STYLE_OR_CLASS_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<span(?:\s+(?:style|class)="[^"]*")*\s*>(.*?)</span>"#).unwrap());
static MSO_LIST_IGNORE_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<span[^>]*style="[^"]*mso-list:\s*Ignore[^"]*"[^>]*>.*?</span>"#).unwrap());
static MSO_LIST_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<p[^>]*class="[^"]*MsoListParagraph[^"]*"[^>]*>(.*?)</p>"#).unwrap());
static EMPTY_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p[^>]*>(\s|&nbsp;)*</p>").unwrap());
static DOCS_WRAPPER_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<(?:div|b)[^>]*id="docs-internal-guid"[^>]*>"#).unwrap());

fn normalize_word(html: &str) -> String {
    let mut out = CONDITIONAL_COMMENT.replace_all(html, "").into_owned();
    out = PLAIN_COMMENT.replace_all(&out, "").into_owned();
    out = NAMESPACED_ELEMENT.replace_all(&out, "").into_owned();
    // Word emits a `mso-list:Ignore` span carrying the literal bullet/number
    // glyph Word itself rendered; the real list semantics come from the
    // paragraph's `mso-list` style, so the marker glyph is dropped with the
    // span rather than merely unwrapped.
    out = MSO_LIST_IGNORE_SPAN.replace_all(&out, "").into_owned();
    out = strip_mso_style_props(&out);
    out = unwrap_style_only_spans(&out);
    out = convert_mso_list_paragraphs(&out);
    out = EMPTY_PARAGRAPH.replace_all(&out, "").into_owned();
    out
}

fn normalize_google_docs(html: &str) -> String {
    let mut out = DOCS_WRAPPER_OPEN.replace(html, "").into_owned();
    if let Some(pos) = out.rfind("</div>") {
        out.replace_range(pos..pos + "</div>".len(), "");
    }
    out = wrap_inline_styles_as_tags(&out);
    out
}

/// Drop any `mso-*` declaration from a `style` attribute, leaving the rest
/// intact (`spec.md` §4.9, Word: "strip mso-* style properties").
fn strip_mso_style_props(html: &str) -> String {
    STYLE_ATTR
        .replace_all(html, |caps: &regex::Captures| {
            let kept: Vec<&str> = caps[1]
                .split(';')
                .map(str::trim)
                .filter(|d| !d.is_empty() && !d.to_ascii_lowercase().starts_with("mso-"))
                .collect();
            if kept.is_empty() {
                String::new()
            } else {
                format!(r#" style="{}""#, kept.join("; "))
            }
        })
        .into_owned()
}

/// Replace `<span style="…">text</span>` / `<span class="…">text</span>`
/// (no other attributes) with its bare content (`spec.md` §4.9, Word:
/// "unwrap spans that carry only style/class").
fn unwrap_style_only_spans(html: &str) -> String {
    SPAN_STYLE_OR_CLASS_ONLY.replace_all(html, "$1").into_owned()
}

/// Turn a run of `MsoListParagraph*` `<p>` elements into a single
/// `<ul><li>…</li>…</ul>` (`spec.md` §4.9, Word).
fn convert_mso_list_paragraphs(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    let mut open = false;
    for m in MSO_LIST_PARAGRAPH.captures_iter(html) {
        let whole = m.get(0).unwrap();
        out.push_str(&html[last..whole.start()]);
        if !open {
            out.push_str("<ul>");
            open = true;
        }
        out.push_str("<li>");
        out.push_str(&m[1]);
        out.push_str("</li>");
        last = whole.end();
        // If nothing but whitespace separates this match from the next one,
        // keep the wrapper open; otherwise close it before falling through
        // to the gap text below.
        let gap = &html[last..];
        if !gap.trim_start().starts_with("<p") {
            out.push_str("</ul>");
            open = false;
        }
    }
    if open {
        out.push_str("</ul>");
    }
    out.push_str(&html[last..]);
    out
}

/// Google Docs/Pages emit plain `<span style="…">` runs instead of
/// `<b>/<i>/<u>/<s>`; promote the common weight/style/decoration properties
/// into real tags before the schema-aware parse runs (`spec.md` §4.9).
fn wrap_inline_styles_as_tags(html: &str) -> String {
    let span_with_style: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<span([^>]*)style="([^"]*)"([^>]*)>(.*?)</span>"#).unwrap());
    span_with_style
        .replace_all(html, |caps: &regex::Captures| {
            let style = caps[2].to_ascii_lowercase();
            let mut inner = caps[4].to_string();
            if style.contains("text-decoration:line-through") || style.contains("text-decoration: line-through") {
                inner = format!("<s>{inner}</s>");
            }
            if style.contains("text-decoration:underline") || style.contains("text-decoration: underline") {
                inner = format!("<u>{inner}</u>");
            }
            if style.contains("font-style:italic") || style.contains("font-style: italic") {
                inner = format!("<em>{inner}</em>");
            }
            if style.contains("font-weight:700") || style.contains("font-weight:bold") || style.contains("font-weight: 700") || style.contains("font-weight: bold") {
                inner = format!("<strong>{inner}</strong>");
            }
            format!(r#"<span{}style="{}"{}>{inner}</span>"#, &caps[1], &caps[2], &caps[3])
        })
        .into_owned()
}

fn strip_style_and_class(html: &str) -> String {
    let no_style = STYLE_ATTR.replace_all(html, "");
    CLASS_ATTR.replace_all(&no_style, "").into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detects_word_by_xmlns() {
        assert_eq!(detect_source(r#"<p xmlns:w="urn:x">x</p>"#), HtmlSource::Word);
    }

    #[test]
    fn detects_google_docs_by_guid() {
        assert_eq!(detect_source(r#"<div id="docs-internal-guid-123">x</div>"#), HtmlSource::GoogleDocs);
    }

    #[test]
    fn falls_back_to_browser() {
        assert_eq!(detect_source("<p>hello</p>"), HtmlSource::Browser);
    }

    #[test]
    fn word_normalization_strips_comments_and_namespaced_elements() {
        let html = r#"<!--[if gte mso 9]><xml>junk</xml><![endif]--><p><o:p>ignored</o:p>text</p>"#;
        let out = normalize_word(html);
        assert!(!out.contains("mso"));
        assert!(!out.contains("<o:p>"));
        assert!(out.contains("text"));
    }

    #[test]
    fn mso_style_props_are_dropped_but_siblings_survive() {
        let out = strip_mso_style_props(r#"<p style="mso-margin-top:0;color:red">x</p>"#);
        assert_eq!(out, r#"<p style="color: red">x</p>"#);
    }

    #[test]
    fn style_only_span_unwraps_to_bare_text() {
        assert_eq!(unwrap_style_only_spans(r#"<span style="color:red">hi</span>"#), "hi");
    }

    #[test]
    fn final_pass_always_strips_style_and_class() {
        let out = normalize_source(r#"<p class="foo" style="color:red">x</p>"#, HtmlSource::Browser);
        assert_eq!(out, "<p>x</p>");
    }
}
