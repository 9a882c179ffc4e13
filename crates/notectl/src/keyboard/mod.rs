// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The keydown pipeline (C8). See `spec.md` §4.7.

pub mod descriptor;
pub mod dispatch;

pub use descriptor::KeyEvent;
pub use dispatch::{dispatch_keydown, CompositionTracker};
