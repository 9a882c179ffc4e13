// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Output sanitization (`spec.md` §4.8, "Sanitization"): every tag and
//! attribute the serializer emits is checked against the schema's allow-list
//! before being written out, and every CSS value a style mark contributes is
//! validated before interpolation into a `style="…"` attribute.

use std::collections::HashSet;

/// A conservative CSS `<color>` grammar: hex triplets/quads, `rgb()`/`rgba()`,
/// `hsl()`/`hsla()`, and the handful of named colors the rich-text toolbar
/// actually offers. Anything else (in particular `url(...)`, `expression(...)`
/// or bare identifiers we don't recognize) is rejected rather than guessed at
/// — a dropped highlight is harmless, an injected style value is not.
pub fn is_valid_css_color(value: &str) -> bool {
    let v = value.trim();
    if v.is_empty() {
        return false;
    }
    if let Some(hex) = v.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(inner) = v.strip_prefix("rgb(").or_else(|| v.strip_prefix("rgba(")) {
        return inner.ends_with(')') && is_numeric_function_body(&inner[..inner.len() - 1]);
    }
    if let Some(inner) = v.strip_prefix("hsl(").or_else(|| v.strip_prefix("hsla(")) {
        return inner.ends_with(')') && is_numeric_function_body(&inner[..inner.len() - 1]);
    }
    named_color(v)
}

fn is_numeric_function_body(body: &str) -> bool {
    body.split(',').all(|part| {
        let p = part.trim().trim_end_matches('%');
        !p.is_empty() && p.chars().all(|c| c.is_ascii_digit() || c == '.')
    })
}

fn named_color(v: &str) -> bool {
    const NAMES: &[&str] = &[
        "black", "white", "red", "green", "blue", "yellow", "orange", "purple", "pink", "gray",
        "grey", "transparent", "currentcolor",
    ];
    NAMES.contains(&v.to_ascii_lowercase().as_str())
}

/// Drop any `(tag, attrs)` pair not present in `allowed`; used as the last
/// line of defense on ingested-then-reserialized HTML (`spec.md` §4.9
/// "Non-goals": this is not a full sanitizer, just the schema allow-list).
pub fn is_tag_allowed(tag: &str, allowed_tags: &HashSet<String>) -> bool {
    allowed_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

pub fn is_attr_allowed(attr: &str, allowed_attrs: &HashSet<String>) -> bool {
    allowed_attrs.iter().any(|a| a.eq_ignore_ascii_case(attr))
}
