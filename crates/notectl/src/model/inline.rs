// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::ids::InlineNodeTypeName;
use crate::model::attrs::AttrMap;
use crate::model::mark::MarkSet;

/// A run of text carrying a mark set. Occupies `text.chars().count()` offset
/// units. This crate addresses offsets as Unicode scalar value counts rather
/// than UTF-16 code units (the teacher's platform-FFI boundary does not
/// exist here); `model::ops` and the caret navigator stay grapheme-aware
/// where that matters for user-perceived movement.
#[derive(Clone, Debug, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub marks: MarkSet,
}

impl TextNode {
    pub fn new(text: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, MarkSet::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A length-1 atomic element inside a leaf block: hard break, inline image.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineNode {
    pub node_type: InlineNodeTypeName,
    pub attrs: AttrMap,
}

impl InlineNode {
    pub fn new(node_type: impl Into<InlineNodeTypeName>, attrs: AttrMap) -> Self {
        Self {
            node_type: node_type.into(),
            attrs,
        }
    }
}

/// The content of a leaf (inline-content) block: either a text run or an
/// atomic inline node.
#[derive(Clone, Debug, PartialEq)]
pub enum InlineContent {
    Text(TextNode),
    Inline(InlineNode),
}

impl InlineContent {
    pub fn is_text(&self) -> bool {
        matches!(self, InlineContent::Text(_))
    }

    pub fn is_inline_node(&self) -> bool {
        matches!(self, InlineContent::Inline(_))
    }

    /// Offset length contributed by this piece of content: text length in
    /// code units, or 1 for an inline node (`spec.md` §3, "Offsets and
    /// lengths").
    pub fn len(&self) -> usize {
        match self {
            InlineContent::Text(t) => t.len(),
            InlineContent::Inline(_) => 1,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            InlineContent::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_inline_node(&self) -> Option<&InlineNode> {
        match self {
            InlineContent::Inline(n) => Some(n),
            _ => None,
        }
    }
}
