// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! `InputRules` (`spec.md` §4.1): `{pattern: regex, handler(state, match,
//! from, to) → Transaction | null}`. These run after an `insertText` step
//! lands, matching the just-typed text against a pattern anchored at the
//! cursor (e.g. `"- "` at the start of a paragraph converting it to a
//! bullet list item).

use std::sync::Arc;

use regex::Regex;

use crate::state::EditorState;
use crate::transaction::builder::TransactionBuilder;

pub type InputRuleHandler =
    Arc<dyn Fn(&EditorState, &regex::Captures, usize, usize, &mut TransactionBuilder) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct InputRule {
    pub pattern: Regex,
    pub handler: InputRuleHandler,
}

#[derive(Default)]
pub struct InputRuleRegistry {
    rules: Vec<InputRule>,
}

impl InputRuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: InputRule) {
        self.rules.push(rule);
    }

    /// Try every rule against `text_before_cursor`, in registration order,
    /// applying the first whose pattern matches at the end of the string
    /// and whose handler accepts.
    pub fn try_apply(
        &self,
        state: &EditorState,
        text_before_cursor: &str,
        block_offset: usize,
        builder: &mut TransactionBuilder,
    ) -> bool {
        for rule in &self.rules {
            if let Some(m) = rule.pattern.captures(text_before_cursor) {
                let whole = m.get(0).unwrap();
                if whole.end() != text_before_cursor.len() {
                    continue;
                }
                let from = block_offset - (whole.end() - whole.start());
                let to = block_offset;
                if (rule.handler)(state, &m, from, to, builder) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let mut registry = InputRuleRegistry::new();
        registry.register(InputRule {
            pattern: Regex::new(r"^- $").unwrap(),
            handler: Arc::new(|_s, _m, _f, _t, _b| true),
        });
        assert_eq!(registry.rules.len(), 1);
    }
}
