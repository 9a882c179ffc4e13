// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::sync::Arc;

use crate::htmlview::ElementView;
use crate::ids::MarkTypeName;
use crate::model::mark::Mark;

/// `toHTMLString?(mark, innerHTML) → string`: a mark that renders as a
/// dedicated element wrapper ("tag mark", `spec.md` glossary).
pub type ToHtmlStringFn = Arc<dyn Fn(&Mark, &str) -> String + Send + Sync>;

/// `toHTMLStyle?(mark) → string | null`: a mark that contributes a
/// `"prop: value"` fragment to a shared `<span style="…">` ("style mark").
/// Returning `None` means this particular mark instance is invalid (e.g. a
/// bad CSS color) and should be dropped rather than interpolated
/// (`spec.md` §6, "HTML guarantees").
pub type ToHtmlStyleFn = Arc<dyn Fn(&Mark) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct MarkSpec {
    pub mark_type: MarkTypeName,
    pub rank: i32,
    pub to_html_string: Option<ToHtmlStringFn>,
    pub to_html_style: Option<ToHtmlStyleFn>,
    pub parse_html: Vec<MarkParseRule>,
}

impl std::fmt::Debug for MarkSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkSpec")
            .field("mark_type", &self.mark_type)
            .field("rank", &self.rank)
            .field("is_style_mark", &self.to_html_style.is_some())
            .finish()
    }
}

impl MarkSpec {
    pub fn is_style_mark(&self) -> bool {
        self.to_html_style.is_some()
    }

    pub fn is_tag_mark(&self) -> bool {
        self.to_html_string.is_some()
    }
}

#[derive(Clone)]
pub struct MarkParseRule {
    pub priority: i32,
    pub matches: Arc<dyn Fn(&ElementView) -> bool + Send + Sync>,
    pub to_mark: Arc<dyn Fn(&ElementView) -> Mark + Send + Sync>,
}

impl std::fmt::Debug for MarkParseRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkParseRule")
            .field("priority", &self.priority)
            .finish()
    }
}
