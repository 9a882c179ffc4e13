// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The schema & plugin registry (C4, `spec.md` §4.1): the single source of
//! truth for what a document may contain and how it is rendered and
//! parsed.

use std::collections::{HashMap, HashSet};

use crate::ids::{InlineNodeTypeName, MarkTypeName, NodeTypeName};
use crate::model::mark::MarkSet;
use crate::schema::block_picker::BlockTypePickerRegistry;
use crate::schema::command::CommandRegistry;
use crate::schema::input_rule::InputRuleRegistry;
use crate::schema::keymap::KeymapRegistry;
use crate::schema::mark_spec::MarkSpec;
use crate::schema::middleware::MiddlewareChain;
use crate::schema::node_spec::{InlineNodeSpec, NodeSpec};
use crate::schema::services::ServiceRegistry;

pub struct SchemaRegistry {
    nodes: HashMap<NodeTypeName, NodeSpec>,
    inline_nodes: HashMap<InlineNodeTypeName, InlineNodeSpec>,
    marks: HashMap<MarkTypeName, MarkSpec>,

    pub keymaps: KeymapRegistry,
    pub commands: CommandRegistry,
    pub input_rules: InputRuleRegistry,
    pub middleware: MiddlewareChain,
    pub services: ServiceRegistry,
    pub block_picker: BlockTypePickerRegistry,

    initialized: bool,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            inline_nodes: HashMap::new(),
            marks: HashMap::new(),
            keymaps: KeymapRegistry::new(),
            commands: CommandRegistry::new(),
            input_rules: InputRuleRegistry::new(),
            middleware: MiddlewareChain::new(),
            services: ServiceRegistry::new(),
            block_picker: BlockTypePickerRegistry::new(),
            initialized: false,
        }
    }

    /// Mark plugin init as complete. Until this is called, registration is
    /// monotonic (anything may be added); afterwards only
    /// `replace_node_spec`/`replace_mark_spec`/`replace_inline_spec` may
    /// change the node/mark tables (`spec.md` §4.1, "Contract").
    pub fn finish_init(&mut self) {
        self.initialized = true;
    }

    pub fn register_node_spec(&mut self, spec: NodeSpec) {
        if self.initialized {
            log::warn!(
                "attempted to register node spec `{}` after plugin init; use replace_node_spec",
                spec.node_type
            );
            return;
        }
        self.nodes.insert(spec.node_type.clone(), spec);
    }

    pub fn replace_node_spec(&mut self, spec: NodeSpec) {
        self.nodes.insert(spec.node_type.clone(), spec);
    }

    pub fn register_inline_spec(&mut self, spec: InlineNodeSpec) {
        if self.initialized {
            log::warn!(
                "attempted to register inline spec `{}` after plugin init; use replace_inline_spec",
                spec.node_type
            );
            return;
        }
        self.inline_nodes.insert(spec.node_type.clone(), spec);
    }

    pub fn replace_inline_spec(&mut self, spec: InlineNodeSpec) {
        self.inline_nodes.insert(spec.node_type.clone(), spec);
    }

    pub fn register_mark_spec(&mut self, spec: MarkSpec) {
        if self.initialized {
            log::warn!(
                "attempted to register mark spec `{}` after plugin init; use replace_mark_spec",
                spec.mark_type
            );
            return;
        }
        self.marks.insert(spec.mark_type.clone(), spec);
    }

    pub fn replace_mark_spec(&mut self, spec: MarkSpec) {
        self.marks.insert(spec.mark_type.clone(), spec);
    }

    pub fn node_spec(&self, t: &NodeTypeName) -> Option<&NodeSpec> {
        self.nodes.get(t)
    }

    pub fn inline_spec(&self, t: &InlineNodeTypeName) -> Option<&InlineNodeSpec> {
        self.inline_nodes.get(t)
    }

    pub fn mark_spec(&self, t: &MarkTypeName) -> Option<&MarkSpec> {
        self.marks.get(t)
    }

    pub fn node_specs(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.values()
    }

    pub fn mark_specs(&self) -> impl Iterator<Item = &MarkSpec> {
        self.marks.values()
    }

    /// Rank lookup used by `MarkSet` to keep itself sorted; unknown marks
    /// sort last.
    pub fn mark_rank(&self, t: &MarkTypeName) -> i32 {
        self.marks.get(t).map(|m| m.rank).unwrap_or(i32::MAX)
    }

    pub fn sort_marks(&self, marks: MarkSet) -> MarkSet {
        let mut v: Vec<_> = marks.into_iter().collect();
        v.sort_by_key(|m| self.mark_rank(&m.mark_type));
        MarkSet::from_sorted(v)
    }

    /// Whether `mark_type` is allowed on `node_type` (invariant 5,
    /// `spec.md` §3): registered as a mark type at all, and not excluded by
    /// the node's `excludeMarks`.
    pub fn mark_allowed_on(&self, node_type: &NodeTypeName, mark_type: &MarkTypeName) -> bool {
        if self.marks.get(mark_type).is_none() {
            return false;
        }
        match self.nodes.get(node_type) {
            Some(spec) => !spec.exclude_marks.contains(mark_type),
            None => true,
        }
    }

    /// The union of allowed tags/attrs across every registered node, inline
    /// node and mark spec's `sanitize` contribution, deduplicated
    /// (`spec.md` §4.1).
    pub fn sanitize_allowlist(&self) -> (HashSet<String>, HashSet<String>) {
        let mut tags = HashSet::new();
        let mut attrs = HashSet::new();
        for spec in self.nodes.values() {
            tags.extend(spec.sanitize.tags.iter().cloned());
            attrs.extend(spec.sanitize.attrs.iter().cloned());
        }
        for spec in self.inline_nodes.values() {
            tags.extend(spec.sanitize.tags.iter().cloned());
            attrs.extend(spec.sanitize.attrs.iter().cloned());
        }
        (tags, attrs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::node_spec::{DomElementSpec, SanitizeContribution};
    use std::sync::Arc;

    fn minimal_node(t: &str) -> NodeSpec {
        NodeSpec {
            node_type: NodeTypeName::new(t),
            group: None,
            content_allow: Vec::new(),
            attrs: Default::default(),
            exclude_marks: Vec::new(),
            is_void: false,
            isolating: false,
            selectable: false,
            to_dom: Arc::new(|_| DomElementSpec::default()),
            to_html: Arc::new(|_, inner| inner.to_owned()),
            parse_html: Vec::new(),
            wrapper: None,
            sanitize: SanitizeContribution {
                tags: vec![t.to_owned()],
                attrs: vec![],
            },
        }
    }

    #[test]
    fn registration_after_init_is_rejected_without_replace() {
        let mut reg = SchemaRegistry::new();
        reg.register_node_spec(minimal_node("paragraph"));
        reg.finish_init();
        reg.register_node_spec(minimal_node("heading"));
        assert!(reg.node_spec(&NodeTypeName::new("heading")).is_none());
        reg.replace_node_spec(minimal_node("heading"));
        assert!(reg.node_spec(&NodeTypeName::new("heading")).is_some());
    }

    #[test]
    fn sanitize_allowlist_unions_and_dedups() {
        let mut reg = SchemaRegistry::new();
        reg.register_node_spec(minimal_node("paragraph"));
        reg.register_node_spec(minimal_node("heading"));
        let (tags, _attrs) = reg.sanitize_allowlist();
        assert!(tags.contains("paragraph"));
        assert!(tags.contains("heading"));
        assert_eq!(tags.len(), 2);
    }
}
