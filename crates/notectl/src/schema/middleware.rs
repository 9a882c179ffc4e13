// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Ordered `(tr, state, next) → void` interceptors (`spec.md` §4.1, §5).
//!
//! Middleware may transform or swallow a transaction in flight but, per
//! §5's reentrancy rule, must not issue a *new* transaction synchronously
//! from inside `next`; that has to go back through the dispatch API from a
//! fresh task. This crate cannot enforce that at the type level (there is
//! no async runtime specified), so it is a documented contract rather than
//! a compiled one, same as the rest of §5's cooperative-scheduling model.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::state::EditorState;
use crate::transaction::step::Transaction;

/// `next` hands the (possibly already-transformed) transaction onward.
/// Implementations call it exactly once, or not at all to swallow the
/// transaction outright.
pub type Middleware =
    Arc<dyn Fn(Transaction, &EditorState, &dyn Fn(Transaction)) -> () + Send + Sync>;

#[derive(Clone)]
struct Entry {
    priority: i32,
    middleware: Middleware,
}

#[derive(Default)]
pub struct MiddlewareChain {
    entries: Vec<Entry>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, priority: i32, middleware: Middleware) {
        self.entries.push(Entry { priority, middleware });
        self.entries.sort_by_key(|e| e.priority);
    }

    /// Run the chain over `tr`, calling `apply` with whatever transaction
    /// (if any) the last link in the chain hands onward. If a middleware
    /// panics, the chain is treated as having completed as identity — the
    /// original transaction is applied unmodified (`spec.md` §7) — and the
    /// panic is logged.
    pub fn run(&self, tr: Transaction, state: &EditorState, apply: &dyn Fn(Transaction)) {
        if self.entries.is_empty() {
            apply(tr);
            return;
        }
        self.run_from(0, tr, state, apply);
    }

    fn run_from(&self, index: usize, tr: Transaction, state: &EditorState, apply: &dyn Fn(Transaction)) {
        let Some(entry) = self.entries.get(index) else {
            apply(tr);
            return;
        };
        let next_index = index + 1;
        let entries_len = self.entries.len();
        let tr_for_fallback = tr.clone();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            (entry.middleware)(tr, state, &|forwarded: Transaction| {
                if next_index < entries_len {
                    self.run_from(next_index, forwarded, state, apply);
                } else {
                    apply(forwarded);
                }
            })
        }));
        if result.is_err() {
            log::error!("middleware at priority {} panicked; applying transaction as-is", entry.priority);
            apply(tr_for_fallback);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ids::BlockId;
    use crate::model::{BlockNode, Document, InlineContent, TextNode};
    use crate::schema::registry::SchemaRegistry;
    use crate::selection::create_collapsed_selection;
    use crate::transaction::step::Origin;
    use std::sync::Mutex;

    fn state() -> EditorState {
        let b = BlockNode::new_leaf(
            BlockId::from_raw("b1"),
            "paragraph",
            Default::default(),
            vec![InlineContent::Text(TextNode::plain(""))],
        );
        let doc = Document::new(vec![b]);
        let sel = create_collapsed_selection(&doc, BlockId::from_raw("b1"), 0).unwrap();
        EditorState::new(doc, sel, Arc::new(SchemaRegistry::new()))
    }

    #[test]
    fn lower_priority_runs_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();

        let order2 = order.clone();
        chain.register(
            10,
            Arc::new(move |tr, _s, next| {
                order2.lock().unwrap().push(10);
                next(tr);
            }),
        );
        let order3 = order.clone();
        chain.register(
            1,
            Arc::new(move |tr, _s, next| {
                order3.lock().unwrap().push(1);
                next(tr);
            }),
        );

        let st = state();
        let builder = st.transaction(Origin::Command);
        let tr = builder.build();
        chain.run(tr, &st, &|_tr| {});
        assert_eq!(*order.lock().unwrap(), vec![1, 10]);
    }

    #[test]
    fn panicking_middleware_falls_back_to_identity_application() {
        let applied = Arc::new(Mutex::new(false));
        let mut chain = MiddlewareChain::new();
        chain.register(0, Arc::new(|_tr, _s, _next| panic!("boom")));
        let st = state();
        let builder = st.transaction(Origin::Command);
        let tr = builder.build();
        let applied2 = applied.clone();
        chain.run(tr, &st, &move |_tr| {
            *applied2.lock().unwrap() = true;
        });
        assert!(*applied.lock().unwrap());
    }
}
