// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::htmlview::ElementView;
use crate::ids::{MarkTypeName, NodeTypeName};
use crate::model::attrs::{AttrMap, AttrValue};
use crate::model::block::BlockNode;

/// A declarative attribute registration: only the default matters for
/// schema validation (`spec.md` §3 invariant 6 — unknown attrs dropped).
#[derive(Clone, Debug)]
pub struct AttrSpec {
    pub default: AttrValue,
}

/// What a node's `toDOM`/reconciler rendering produces, abstracted away
/// from any particular DOM binding (there is no browser in this crate —
/// the host custom element owns that; see `spec.md` §1 Non-goals).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DomElementSpec {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

/// `wrapper(node) → {tag, key, className?, attrs?}` (`spec.md` §4.1): an
/// optional extra element a node type wants wrapped around its rendered
/// content (e.g. a list item's marker wrapper).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WrapperSpec {
    pub tag: String,
    pub key: String,
    pub class_name: Option<String>,
    pub attrs: Vec<(String, String)>,
}

/// Tags/attrs a node type contributes to the sanitizer's allow-list.
#[derive(Clone, Debug, Default)]
pub struct SanitizeContribution {
    pub tags: Vec<String>,
    pub attrs: Vec<String>,
}

/// A rule for recognizing this node type while parsing ingested HTML.
/// Higher `priority` wins when more than one rule matches the same element
/// (`spec.md` §4.9, "Parse-rule priority is a plain integer, higher first").
#[derive(Clone)]
pub struct NodeParseRule {
    pub priority: i32,
    pub matches: Arc<dyn Fn(&ElementView) -> bool + Send + Sync>,
    /// Derive the block's attrs from the matched element.
    pub to_attrs: Arc<dyn Fn(&ElementView) -> AttrMap + Send + Sync>,
}

impl std::fmt::Debug for NodeParseRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeParseRule")
            .field("priority", &self.priority)
            .finish()
    }
}

pub type ToHtmlFn = Arc<dyn Fn(&BlockNode, &str) -> String + Send + Sync>;
pub type ToDomFn = Arc<dyn Fn(&BlockNode) -> DomElementSpec + Send + Sync>;
pub type WrapperFn = Arc<dyn Fn(&BlockNode) -> WrapperSpec + Send + Sync>;

#[derive(Clone)]
pub struct NodeSpec {
    pub node_type: NodeTypeName,
    pub group: Option<String>,
    /// `content.allow`: node types permitted as children of a compound
    /// block of this type. Empty for leaf (inline-content) node types.
    pub content_allow: Vec<NodeTypeName>,
    pub attrs: BTreeMap<String, AttrSpec>,
    pub exclude_marks: Vec<MarkTypeName>,
    pub is_void: bool,
    pub isolating: bool,
    pub selectable: bool,
    pub to_dom: ToDomFn,
    pub to_html: ToHtmlFn,
    pub parse_html: Vec<NodeParseRule>,
    pub wrapper: Option<WrapperFn>,
    pub sanitize: SanitizeContribution,
}

impl std::fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("node_type", &self.node_type)
            .field("is_void", &self.is_void)
            .field("isolating", &self.isolating)
            .finish()
    }
}

impl NodeSpec {
    /// Drop attrs not in the registry (invariant 6) and fall back to
    /// defaults for anything missing.
    pub fn normalize_attrs(&self, given: &AttrMap) -> AttrMap {
        self.attrs
            .iter()
            .map(|(k, spec)| {
                let v = given.get(k).cloned().unwrap_or_else(|| spec.default.clone());
                (k.clone(), v)
            })
            .collect()
    }
}

/// Like [`NodeSpec`] but always void, length 1 (`spec.md` §4.1).
#[derive(Clone)]
pub struct InlineNodeSpec {
    pub node_type: crate::ids::InlineNodeTypeName,
    pub attrs: BTreeMap<String, AttrSpec>,
    pub to_dom: Arc<dyn Fn(&crate::model::inline::InlineNode) -> DomElementSpec + Send + Sync>,
    pub to_html: Arc<dyn Fn(&crate::model::inline::InlineNode) -> String + Send + Sync>,
    pub parse_html: Vec<NodeParseRule>,
    pub sanitize: SanitizeContribution,
}

impl std::fmt::Debug for InlineNodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineNodeSpec")
            .field("node_type", &self.node_type)
            .finish()
    }
}
