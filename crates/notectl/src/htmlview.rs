// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! A minimal, backend-agnostic view of one HTML element, used as the
//! matching surface for `ParseRule`s (C4) without coupling the schema
//! registry to the `html5ever`/`rcdom` tree shape used by the parser (C10).

#[derive(Clone, Debug, Default)]
pub struct ElementView {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Concatenated text content of all descendants, used by rules that key
    /// off content rather than structure (e.g. the Word list-marker span).
    pub text_content: String,
}

impl ElementView {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|x| x == class))
            .unwrap_or(false)
    }

    pub fn style_prop(&self, prop: &str) -> Option<String> {
        let style = self.attr("style")?;
        style.split(';').find_map(|decl| {
            let mut it = decl.splitn(2, ':');
            let k = it.next()?.trim();
            let v = it.next()?.trim();
            if k.eq_ignore_ascii_case(prop) {
                Some(v.to_owned())
            } else {
                None
            }
        })
    }
}
