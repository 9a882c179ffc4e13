// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Declarative entries for a block-type dropdown (`spec.md` §4.1,
//! "BlockTypePickerEntries").

use std::sync::Arc;

use crate::state::EditorState;

pub type IsActiveFn = Arc<dyn Fn(&EditorState) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct BlockTypePickerEntry {
    pub id: String,
    pub label: String,
    pub command: String,
    pub priority: i32,
    pub is_active: IsActiveFn,
    pub style: Option<String>,
}

#[derive(Default)]
pub struct BlockTypePickerRegistry {
    entries: Vec<BlockTypePickerEntry>,
}

impl BlockTypePickerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: BlockTypePickerEntry) {
        self.entries.push(entry);
        self.entries.sort_by_key(|e| e.priority);
    }

    pub fn entries(&self) -> &[BlockTypePickerEntry] {
        &self.entries
    }

    pub fn active_entry(&self, state: &EditorState) -> Option<&BlockTypePickerEntry> {
        self.entries.iter().find(|e| (e.is_active)(state))
    }
}
