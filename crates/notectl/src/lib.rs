// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `notectl`: the model-transaction-view core of a browser-embedded
//! rich-text editing engine, independent of any particular host DOM
//! binding. See `spec.md` for the full component design; [`EditorCore`]
//! is the surface a host actually embeds.

pub mod history;
pub mod html;
pub mod htmlview;
pub mod ids;
pub mod keyboard;
pub mod model;
pub mod reconcile;
pub mod schema;
pub mod selection;
pub mod state;
pub mod transaction;

use std::collections::HashMap;
use std::sync::Arc;

use crate::history::{HistoryConfig, HistoryManager};
use crate::ids::BlockId;
use crate::keyboard::{dispatch_keydown, CompositionTracker, KeyEvent};
use crate::model::ops::{get_block_length, get_block_marks_at_offset, get_block_text};
use crate::model::{attrs, BlockChildren, BlockNode, Document, MarkSet};
use crate::reconcile::caret::DispatchOutcome;
use crate::schema::command::CommandArgs;
use crate::schema::registry::SchemaRegistry;
use crate::selection::{create_collapsed_selection, Selection};
use crate::state::{ApplyTransactionError, EditorState};
use crate::transaction::builder::BuilderError;
use crate::transaction::step::{Origin, Transaction};

#[derive(Debug)]
pub enum EditorCoreError {
    Builder(BuilderError),
    Apply(ApplyTransactionError),
}

impl std::fmt::Display for EditorCoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditorCoreError::Builder(e) => write!(f, "{e}"),
            EditorCoreError::Apply(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EditorCoreError {}

impl From<BuilderError> for EditorCoreError {
    fn from(e: BuilderError) -> Self {
        EditorCoreError::Builder(e)
    }
}

impl From<ApplyTransactionError> for EditorCoreError {
    fn from(e: ApplyTransactionError) -> Self {
        EditorCoreError::Apply(e)
    }
}

/// What the host should do with a keydown once it has been run through the
/// pipeline (`spec.md` §4.7/§4.11).
#[derive(Debug, PartialEq, Eq)]
pub enum KeydownOutcome {
    /// Call `preventDefault()`; the model (and possibly the DOM) already
    /// reflects the result.
    PreventDefault,
    /// Let the browser's own default behavior run.
    PassThrough,
}

/// The events `EditorCore` publishes (`spec.md` §6, "Events"). There is no
/// async runtime or DOM event bus in this crate, so events are queued and
/// drained by the host via [`EditorCore::take_events`] after each call that
/// might produce one, rather than pushed through a callback.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    Ready,
    /// Fires after every successful dispatch; `counter` increments once per
    /// applied transaction (`spec.md` §6).
    StateChange { counter: u64 },
    /// Fires after `StateChange` for the same transaction when the
    /// selection actually changed (`spec.md` §6's ordering guarantee).
    SelectionChange,
    EditorFocus,
    EditorBlur,
}

/// Toolbar-facing action identifiers (`spec.md` §C.3 supplement), grounded
/// in the upstream `ComposerAction` enum this crate's `action_states` is
/// modeled on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComposerAction {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Link,
    OrderedList,
    UnorderedList,
    Quote,
    Indent,
    Unindent,
    Undo,
    Redo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionState {
    /// Available and not currently applied at the cursor/selection.
    Enabled,
    /// Available and currently applied — invoking it again would undo it.
    Reversed,
    /// Not applicable in the current context.
    Disabled,
}

/// The host-facing API (`spec.md` §6): wraps [`EditorState`] with the
/// history manager, keydown pipeline state, and readonly/event bookkeeping a
/// host actually needs to drive the engine end to end.
pub struct EditorCore {
    state: EditorState,
    history: HistoryManager,
    composition: CompositionTracker,
    readonly: bool,
    change_counter: u64,
    events: Vec<EditorEvent>,
}

impl EditorCore {
    /// Construct with a single empty paragraph, a collapsed cursor inside
    /// it, and a `ready` event already queued.
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        let block_id = BlockId::new();
        let doc = Document::new(vec![BlockNode::new_leaf(block_id.clone(), "paragraph", attrs([]), vec![])]);
        let selection =
            create_collapsed_selection(&doc, block_id, 0).expect("the block just inserted into this document");
        Self {
            state: EditorState::new(doc, selection, schema),
            history: HistoryManager::new(HistoryConfig::default()),
            composition: CompositionTracker::default(),
            readonly: false,
            change_counter: 0,
            events: vec![EditorEvent::Ready],
        }
    }

    /// Convenience constructor registering [`crate::schema::builtin`]'s
    /// standard node/mark library.
    pub fn with_default_schema() -> Self {
        let mut registry = SchemaRegistry::new();
        crate::schema::builtin::register_builtins(&mut registry);
        registry.finish_init();
        Self::new(Arc::new(registry))
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.state.schema
    }

    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    /// Drain queued events for the host to dispatch. Returns them in the
    /// order they were produced.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---- read surface ----

    pub fn get_json(&self) -> Document {
        self.state.doc.clone()
    }

    pub fn get_html(&self) -> String {
        crate::html::serialize_document(&self.state.doc, &self.state.schema)
    }

    /// Block text, joined by `\n`, walking into compound blocks so that
    /// e.g. a table's cell text is still included (`spec.md` §6).
    pub fn get_text(&self) -> String {
        let mut parts = Vec::new();
        collect_leaf_text(&self.state.doc.blocks, &mut parts);
        parts.join("\n")
    }

    /// True iff the document is exactly one empty inline block.
    pub fn is_empty(&self) -> bool {
        match self.state.doc.blocks.as_slice() {
            [only] => only.children.is_inline() && get_block_length(only) == 0,
            _ => false,
        }
    }

    // ---- write surface ----

    /// Replace the whole document with the parsed result of `html`, run
    /// through source normalization (`spec.md` §4.9), as a single
    /// `api`-origin transaction.
    #[cfg(feature = "sys")]
    pub fn set_html(&mut self, html: &str) -> Result<(), EditorCoreError> {
        let slice = crate::html::parser::parse_html(html, &self.state.schema);
        self.replace_document(slice.blocks)
    }

    pub fn set_json(&mut self, doc: Document) -> Result<(), EditorCoreError> {
        self.replace_document(doc.blocks)
    }

    /// The paste protocol (`spec.md` §6): parse `html` through §4.9 and
    /// insert the result immediately after the block the selection is
    /// currently in, as a single `api`-origin transaction.
    #[cfg(feature = "sys")]
    pub fn paste_html(&mut self, html: &str) -> Result<(), EditorCoreError> {
        let slice = crate::html::parser::parse_html(html, &self.state.schema);
        self.insert_blocks_after_current(slice.blocks)
    }

    fn replace_document(&mut self, mut new_blocks: Vec<BlockNode>) -> Result<(), EditorCoreError> {
        if new_blocks.is_empty() {
            new_blocks.push(BlockNode::new_leaf(BlockId::new(), "paragraph", attrs([]), vec![]));
        }
        let mut tr = self.state.transaction(Origin::Api);
        let old_len = self.state.doc.blocks.len();
        for i in (0..old_len).rev() {
            tr.remove_node(Vec::new(), i)?;
        }
        let first_id = new_blocks[0].id.clone();
        for (i, block) in new_blocks.into_iter().enumerate() {
            tr.insert_node(Vec::new(), i, block)?;
        }
        if let Some(doc) = tr.working_doc() {
            if let Ok(sel) = create_collapsed_selection(doc, first_id, 0) {
                tr.set_selection(sel);
            }
        }
        self.commit(tr.build())
    }

    fn insert_blocks_after_current(&mut self, new_blocks: Vec<BlockNode>) -> Result<(), EditorCoreError> {
        if new_blocks.is_empty() {
            return Ok(());
        }
        let order = self.state.doc.top_level_order();
        let anchor = self.current_block_id();
        let insert_at = anchor
            .and_then(|id| order.iter().position(|b| b == &id))
            .map(|pos| pos + 1)
            .unwrap_or(order.len());

        let mut tr = self.state.transaction(Origin::Api);
        let last_id = new_blocks.last().map(|b| b.id.clone());
        for (offset, block) in new_blocks.into_iter().enumerate() {
            tr.insert_node(Vec::new(), insert_at + offset, block)?;
        }
        if let (Some(id), Some(doc)) = (last_id, tr.working_doc()) {
            // `usize::MAX` relies on `create_collapsed_selection` clamping
            // to the block's actual length, landing the cursor at its end.
            if let Ok(sel) = create_collapsed_selection(doc, id, usize::MAX) {
                tr.set_selection(sel);
            }
        }
        self.commit(tr.build())
    }

    // ---- commands ----

    /// Run a registered command by name. Returns `false` if it is
    /// unregistered, blocked by readonly, or declined to apply.
    pub fn dispatch_command(&mut self, name: &str, args: &CommandArgs) -> bool {
        let mut builder = self.state.transaction(Origin::Command);
        let applied = self
            .state
            .schema
            .commands
            .dispatch(name, &self.state, &mut builder, args, self.readonly);
        if !applied {
            return false;
        }
        let tr = builder.build();
        match self.commit(tr) {
            Ok(()) => true,
            Err(e) => {
                log::error!("command `{name}` produced a transaction that failed to apply: {e}");
                false
            }
        }
    }

    // ---- keyboard ----

    pub fn composition_start(&mut self) {
        self.composition.start();
    }

    pub fn composition_end(&mut self) {
        self.composition.end();
    }

    pub fn handle_keydown(&mut self, event: &KeyEvent) -> KeydownOutcome {
        match dispatch_keydown(event, &self.state, &self.composition, self.readonly) {
            None => KeydownOutcome::PassThrough,
            Some(DispatchOutcome::Blocked) => KeydownOutcome::PreventDefault,
            Some(DispatchOutcome::Apply(tr)) => match self.commit(tr) {
                Ok(()) => KeydownOutcome::PreventDefault,
                Err(e) => {
                    log::error!("keydown transaction failed to apply: {e}");
                    KeydownOutcome::PassThrough
                }
            },
        }
    }

    // ---- focus ----

    pub fn focus(&mut self) {
        self.events.push(EditorEvent::EditorFocus);
    }

    pub fn blur(&mut self) {
        self.events.push(EditorEvent::EditorBlur);
    }

    // ---- history ----

    pub fn undo(&mut self, timestamp_ms: u64) -> bool {
        let Some(tr) = self.history.undo(self.state.selection.clone(), timestamp_ms) else {
            return false;
        };
        self.apply_history_transaction(tr)
    }

    pub fn redo(&mut self, timestamp_ms: u64) -> bool {
        let Some(tr) = self.history.redo(self.state.selection.clone(), timestamp_ms) else {
            return false;
        };
        self.apply_history_transaction(tr)
    }

    /// Undo/redo transactions bypass middleware (they are engine-internal
    /// replays, not fresh user intents) and are not re-recorded into
    /// history.
    fn apply_history_transaction(&mut self, tr: Transaction) -> bool {
        let selection_before = self.state.selection.clone();
        match self.state.apply(&tr) {
            Ok(next) => {
                self.state = next;
                self.change_counter += 1;
                self.events.push(EditorEvent::StateChange {
                    counter: self.change_counter,
                });
                if self.state.selection != selection_before {
                    self.events.push(EditorEvent::SelectionChange);
                }
                true
            }
            Err(e) => {
                log::error!("failed to apply history transaction: {e}");
                false
            }
        }
    }

    // ---- toolbar state (SPEC_FULL.md §C.3) ----

    /// The state of each toolbar action given the current selection/cursor
    /// context. Modeled on the upstream engine's `action_states` query.
    pub fn action_states(&self) -> HashMap<ComposerAction, ActionState> {
        let mut states = HashMap::new();
        let marks = self.marks_at_cursor();
        let block = self.current_block_id().and_then(|id| self.state.get_block(&id));

        let inline = [
            (ComposerAction::Bold, "bold"),
            (ComposerAction::Italic, "italic"),
            (ComposerAction::Underline, "underline"),
            (ComposerAction::Strike, "strike"),
            (ComposerAction::Code, "code"),
        ];
        for (action, mark_type) in inline {
            let active = marks.contains_type(&mark_type.into());
            states.insert(action, if active { ActionState::Reversed } else { ActionState::Enabled });
        }
        states.insert(ComposerAction::Link, ActionState::Enabled);

        let list_type = block
            .filter(|b| b.node_type.as_str() == "list_item")
            .and_then(|b| b.attrs.get("listType"))
            .and_then(crate::model::AttrValue::as_str);
        let is_blockquote = block.map(|b| b.node_type.as_str() == "blockquote").unwrap_or(false);
        states.insert(
            ComposerAction::OrderedList,
            if list_type == Some("ordered") { ActionState::Reversed } else { ActionState::Enabled },
        );
        states.insert(
            ComposerAction::UnorderedList,
            if matches!(list_type, Some("bullet") | Some("todo")) {
                ActionState::Reversed
            } else {
                ActionState::Enabled
            },
        );
        states.insert(ComposerAction::Quote, if is_blockquote { ActionState::Reversed } else { ActionState::Enabled });

        let in_list = block.map(|b| b.node_type.as_str() == "list_item").unwrap_or(false);
        let indent = block
            .and_then(|b| b.attrs.get("indent"))
            .and_then(crate::model::AttrValue::as_num)
            .unwrap_or(0.0);
        states.insert(ComposerAction::Indent, if in_list { ActionState::Enabled } else { ActionState::Disabled });
        states.insert(
            ComposerAction::Unindent,
            if in_list && indent > 0.0 { ActionState::Enabled } else { ActionState::Disabled },
        );

        states.insert(ComposerAction::Undo, if self.can_undo() { ActionState::Enabled } else { ActionState::Disabled });
        states.insert(ComposerAction::Redo, if self.can_redo() { ActionState::Enabled } else { ActionState::Disabled });

        states
    }

    fn current_block_id(&self) -> Option<BlockId> {
        match &self.state.selection {
            Selection::Text(t) => Some(t.head.block_id.clone()),
            Selection::Node(n) => Some(n.node_id.clone()),
            Selection::Gap(g) => Some(g.node_id.clone()),
        }
    }

    /// The marks a freshly typed character would carry: `storedMarks` when
    /// set, otherwise the marks at the collapsed cursor (`spec.md` §4.4).
    fn marks_at_cursor(&self) -> MarkSet {
        if let Some(stored) = &self.state.stored_marks {
            return stored.clone();
        }
        match &self.state.selection {
            Selection::Text(t) => self
                .state
                .get_block(&t.head.block_id)
                .map(|b| get_block_marks_at_offset(b, t.head.offset))
                .unwrap_or_default(),
            _ => MarkSet::new(),
        }
    }

    // ---- dispatch plumbing ----

    /// Run `tr` through the registered middleware chain and, for whatever
    /// transaction (if any) comes out the other end, apply it, record it
    /// into history, and queue the resulting events.
    fn commit(&mut self, tr: Transaction) -> Result<(), EditorCoreError> {
        use std::cell::RefCell;
        use std::rc::Rc;

        let schema = self.state.schema.clone();
        let state_snapshot = self.state.clone();
        let captured: Rc<RefCell<Option<Transaction>>> = Rc::new(RefCell::new(None));
        let sink = captured.clone();
        schema.middleware.run(tr, &state_snapshot, &|forwarded| {
            *sink.borrow_mut() = Some(forwarded);
        });
        let Some(final_tr) = captured.borrow_mut().take() else {
            return Ok(());
        };

        let selection_before = self.state.selection.clone();
        let next_state = self.state.apply(&final_tr)?;
        self.history.record(&final_tr);
        self.state = next_state;
        self.change_counter += 1;
        self.events.push(EditorEvent::StateChange {
            counter: self.change_counter,
        });
        if self.state.selection != selection_before {
            self.events.push(EditorEvent::SelectionChange);
        }
        Ok(())
    }
}

fn collect_leaf_text(blocks: &[BlockNode], out: &mut Vec<String>) {
    for b in blocks {
        match &b.children {
            BlockChildren::Inline(_) => out.push(get_block_text(b)),
            BlockChildren::Blocks(children) => collect_leaf_text(children, out),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::InlineContent;
    use crate::schema::command::{CommandEntry, CommandRegistry};
    use crate::schema::node_spec::{DomElementSpec, SanitizeContribution};

    #[test]
    fn fresh_core_is_empty_and_ready() {
        let mut core = EditorCore::with_default_schema();
        assert!(core.is_empty());
        assert_eq!(core.get_text(), "");
        assert_eq!(core.take_events(), vec![EditorEvent::Ready]);
    }

    #[test]
    fn set_json_then_get_text_round_trips_block_text() {
        let mut core = EditorCore::with_default_schema();
        let doc = Document::new(vec![
            BlockNode::new_leaf(
                BlockId::from_raw("b1"),
                "paragraph",
                attrs([]),
                vec![InlineContent::Text(crate::model::TextNode::plain("hello"))],
            ),
            BlockNode::new_leaf(
                BlockId::from_raw("b2"),
                "paragraph",
                attrs([]),
                vec![InlineContent::Text(crate::model::TextNode::plain("world"))],
            ),
        ]);
        core.set_json(doc).unwrap();
        assert_eq!(core.get_text(), "hello\nworld");
        assert!(!core.is_empty());
        let events = core.take_events();
        assert!(matches!(events.last(), Some(EditorEvent::StateChange { .. }) | Some(EditorEvent::SelectionChange)));
    }

    fn registry_with_insert_command() -> Arc<SchemaRegistry> {
        let mut reg = SchemaRegistry::new();
        reg.register_node_spec(crate::schema::node_spec::NodeSpec {
            node_type: "paragraph".into(),
            group: Some("block".to_owned()),
            content_allow: Vec::new(),
            attrs: Default::default(),
            exclude_marks: Vec::new(),
            is_void: false,
            isolating: false,
            selectable: false,
            to_dom: Arc::new(|_| DomElementSpec {
                tag: "p".to_owned(),
                attrs: Vec::new(),
            }),
            to_html: Arc::new(|_, inner| format!("<p>{inner}</p>")),
            parse_html: Vec::new(),
            wrapper: None,
            sanitize: SanitizeContribution {
                tags: vec!["p".to_owned()],
                attrs: vec![],
            },
        });
        let mut commands = CommandRegistry::new();
        commands.register(CommandEntry {
            name: "insertHi".to_owned(),
            run: Arc::new(|_state, builder, _args| {
                let block_id = BlockId::from_raw("b1");
                builder.insert_text(block_id, 0, "hi", MarkSet::new(), None).is_ok()
            }),
            readonly_allowed: false,
        });
        reg.commands = commands;
        reg.finish_init();
        Arc::new(reg)
    }

    #[test]
    fn dispatch_command_applies_and_records_history() {
        let mut core = EditorCore::new(registry_with_insert_command());
        let args = CommandArgs::new();
        assert!(core.dispatch_command("insertHi", &args));
        assert_eq!(core.get_text(), "hi");
        assert!(core.can_undo());

        core.undo(1000);
        assert_eq!(core.get_text(), "");
        assert!(core.can_redo());
    }

    #[test]
    fn readonly_blocks_non_allowed_commands() {
        let mut core = EditorCore::new(registry_with_insert_command());
        core.set_readonly(true);
        let args = CommandArgs::new();
        assert!(!core.dispatch_command("insertHi", &args));
        assert_eq!(core.get_text(), "");
    }

    #[test]
    fn unbound_arrow_key_falls_through_to_model_navigator() {
        let mut core = EditorCore::with_default_schema();
        let doc = Document::new(vec![BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "paragraph",
            attrs([]),
            vec![InlineContent::Text(crate::model::TextNode::plain("ab"))],
        )]);
        core.set_json(doc).unwrap();
        let outcome = core.handle_keydown(&KeyEvent::new("ArrowRight"));
        assert_eq!(outcome, KeydownOutcome::PreventDefault);
    }

    #[test]
    fn arrow_key_with_nowhere_to_go_passes_through() {
        let mut core = EditorCore::with_default_schema();
        let outcome = core.handle_keydown(&KeyEvent::new("ArrowRight"));
        assert_eq!(outcome, KeydownOutcome::PassThrough);
    }

    #[test]
    fn action_states_reports_undo_redo_availability() {
        let mut core = EditorCore::new(registry_with_insert_command());
        let states = core.action_states();
        assert_eq!(states.get(&ComposerAction::Undo), Some(&ActionState::Disabled));
        core.dispatch_command("insertHi", &CommandArgs::new());
        let states = core.action_states();
        assert_eq!(states.get(&ComposerAction::Undo), Some(&ActionState::Enabled));
    }
}
