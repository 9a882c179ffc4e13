// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::HashMap;
use std::sync::Arc;

use crate::state::EditorState;
use crate::transaction::builder::TransactionBuilder;

pub type CommandArgs = HashMap<String, crate::model::attrs::AttrValue>;

pub type CommandFn =
    Arc<dyn Fn(&EditorState, &mut TransactionBuilder, &CommandArgs) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct CommandEntry {
    pub name: String,
    pub run: CommandFn,
    /// Commands flagged `readonlyAllowed` still execute when the host is in
    /// read-only mode (`spec.md` §4.7 step 4).
    pub readonly_allowed: bool,
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) {
        self.commands.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    /// Run a command by name. Returns `false` if unregistered, or if the
    /// command itself reports it could not apply (e.g. no valid selection).
    /// `readonly` gates anything not flagged `readonlyAllowed`.
    pub fn dispatch(
        &self,
        name: &str,
        state: &EditorState,
        builder: &mut TransactionBuilder,
        args: &CommandArgs,
        readonly: bool,
    ) -> bool {
        let Some(entry) = self.commands.get(name) else {
            return false;
        };
        if readonly && !entry.readonly_allowed {
            return false;
        }
        (entry.run)(state, builder, args)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn readonly_blocks_commands_without_the_flag() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandEntry {
            name: "bold".to_owned(),
            run: Arc::new(|_s, _b, _a| true),
            readonly_allowed: false,
        });
        registry.register(CommandEntry {
            name: "selectAll".to_owned(),
            run: Arc::new(|_s, _b, _a| true),
            readonly_allowed: true,
        });
        assert_eq!(registry.get("bold").unwrap().readonly_allowed, false);
        assert_eq!(registry.get("selectAll").unwrap().readonly_allowed, true);
    }
}
