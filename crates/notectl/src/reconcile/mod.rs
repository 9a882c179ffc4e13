// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Reconciler & caret navigation (C11). See `spec.md` §4.10.

pub mod caret;
pub mod diff;

pub use caret::DispatchOutcome;
pub use diff::{diff_children, render_node_view, NodeView, NodeViewFactory, Patch};
