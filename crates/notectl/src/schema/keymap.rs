// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `KeymapRegistry` (`spec.md` §4.1): three priority tiers, each an ordered
//! list of keymaps, each keymap an ordered map of key descriptor → handler.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::state::EditorState;
use crate::transaction::builder::TransactionBuilder;

/// A handler returns `true` to stop the dispatch walk ("I handled this"),
/// `false` to mean "not my concern, keep searching" (`spec.md` §4.7).
pub type KeyHandler = Arc<dyn Fn(&EditorState, &mut TransactionBuilder) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Keymap {
    bindings: Vec<(String, KeyHandler)>,
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}

impl Keymap {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    pub fn bind(&mut self, descriptor: impl Into<String>, handler: KeyHandler) {
        self.bindings.push((descriptor.into(), handler));
    }

    /// Look up the handler for `descriptor`, if any is bound in this
    /// keymap. If more than one binding targets the same descriptor, the
    /// most recently added wins (last-registered-wins), matching
    /// remove-then-register replacement semantics in `spec.md` §4.1.
    pub fn lookup(&self, descriptor: &str) -> Option<&KeyHandler> {
        self.bindings
            .iter()
            .rev()
            .find(|(d, _)| d == descriptor)
            .map(|(_, h)| h)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeymapTier {
    Context,
    Navigation,
    Default,
}

#[derive(Default)]
pub struct KeymapRegistry {
    context: Vec<Keymap>,
    navigation: Vec<Keymap>,
    default: Vec<Keymap>,
}

impl KeymapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tier: KeymapTier, keymap: Keymap) {
        match tier {
            KeymapTier::Context => self.context.push(keymap),
            KeymapTier::Navigation => self.navigation.push(keymap),
            KeymapTier::Default => self.default.push(keymap),
        }
    }

    fn tier_slice(&self, tier: KeymapTier) -> &[Keymap] {
        match tier {
            KeymapTier::Context => &self.context,
            KeymapTier::Navigation => &self.navigation,
            KeymapTier::Default => &self.default,
        }
    }

    /// Walk `context > navigation > default`, within a tier in reverse
    /// registration order, calling each bound handler for `descriptor`
    /// until one returns `true`. A handler that panics is treated as
    /// "false" and logged (`spec.md` §7).
    pub fn dispatch(
        &self,
        tiers: &[KeymapTier],
        descriptor: &str,
        state: &EditorState,
        builder: &mut TransactionBuilder,
    ) -> bool {
        for &tier in tiers {
            for keymap in self.tier_slice(tier).iter().rev() {
                if let Some(handler) = keymap.lookup(descriptor) {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| handler(state, builder)));
                    match result {
                        Ok(true) => return true,
                        Ok(false) => continue,
                        Err(_) => {
                            log::error!(
                                "keymap handler for `{descriptor}` panicked; continuing to next handler"
                            );
                            continue;
                        }
                    }
                }
            }
        }
        false
    }
}
