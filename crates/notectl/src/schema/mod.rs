// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Schema & plugin registry (C4). See `spec.md` §4.1.

pub mod block_picker;
pub mod builtin;
pub mod command;
pub mod input_rule;
pub mod keymap;
pub mod mark_spec;
pub mod middleware;
pub mod node_spec;
pub mod registry;
pub mod services;

pub use mark_spec::MarkSpec;
pub use node_spec::{InlineNodeSpec, NodeSpec};
pub use registry::SchemaRegistry;
