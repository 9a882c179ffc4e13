// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The keydown pipeline (C8, `spec.md` §4.7): composition guard,
//! NodeSelection/GapCursor interception, readonly filter, keymap dispatch,
//! fallback navigator.

use crate::keyboard::descriptor::KeyEvent;
use crate::reconcile::caret::{self, DispatchOutcome};
use crate::schema::keymap::KeymapTier;
use crate::selection::Selection;
use crate::state::EditorState;
use crate::transaction::step::Origin;

/// Tracks IME composition independently of keydown events. The host flips
/// this from its own `compositionstart`/`compositionend` listeners.
#[derive(Default)]
pub struct CompositionTracker {
    active: bool,
}

impl CompositionTracker {
    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn end(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Run one keydown through the full pipeline. `Some(Apply(tr))` means the
/// caller should apply `tr` and call `preventDefault()`; `Some(Blocked)`
/// means `preventDefault()` with no state change; `None` means let the
/// browser's own default behavior run.
pub fn dispatch_keydown(
    event: &KeyEvent,
    state: &EditorState,
    composition: &CompositionTracker,
    readonly: bool,
) -> Option<DispatchOutcome> {
    // 1. Composition guard.
    if composition.is_active() {
        return None;
    }

    // 2. NodeSelection guard.
    if let Selection::Node(node_sel) = &state.selection {
        if event.is_arrow() && event.is_plain() {
            return Some(caret::resolve_node_selection_arrow(state, node_sel, event));
        }
    }

    // 3. GapCursor keys.
    if let Selection::Gap(gap) = &state.selection {
        if let Some(outcome) = caret::resolve_gap_cursor_key(state, gap, event) {
            return Some(outcome);
        }
        // Arrows (and anything else unclaimed) fall through below.
    }

    // 4. Readonly filter.
    let tiers: &[KeymapTier] = if readonly {
        &[KeymapTier::Navigation]
    } else {
        &[KeymapTier::Context, KeymapTier::Navigation, KeymapTier::Default]
    };

    // 5. Keymap dispatch.
    let descriptor = event.descriptor();
    let mut builder = state.transaction(Origin::Input);
    let handled = state.schema.keymaps.dispatch(tiers, &descriptor, state, &mut builder);
    if handled {
        return Some(DispatchOutcome::Apply(builder.build()));
    }

    // 6. Fallback: plain arrows enter the model-level navigator.
    if event.is_arrow() && event.is_plain() {
        return caret::navigate_arrow(state, event);
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::{BlockNode, Document, InlineContent, TextNode};
    use crate::schema::registry::SchemaRegistry;
    use crate::selection::create_collapsed_selection;
    use std::sync::Arc;

    fn state() -> EditorState {
        let b = BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain("ab"))],
        );
        let doc = Document::new(vec![b]);
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 0).unwrap();
        EditorState::new(doc, sel, Arc::new(SchemaRegistry::new()))
    }

    #[test]
    fn composition_guard_swallows_everything() {
        let st = state();
        let mut comp = CompositionTracker::default();
        comp.start();
        let outcome = dispatch_keydown(&KeyEvent::new("ArrowRight"), &st, &comp, false);
        assert!(outcome.is_none());
    }

    #[test]
    fn unbound_arrow_falls_through_to_navigator() {
        let st = state();
        let comp = CompositionTracker::default();
        let outcome = dispatch_keydown(&KeyEvent::new("ArrowRight"), &st, &comp, false);
        assert!(matches!(outcome, Some(DispatchOutcome::Apply(_))));
    }
}
