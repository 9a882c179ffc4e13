// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The transaction system (C5): steps, the builder that assembles them,
//! application against a working document, and inversion for undo. See
//! `spec.md` §4.5.

pub mod apply;
pub mod builder;
pub mod invert;
pub mod step;

pub use apply::{apply_step, ApplyStepError};
pub use builder::{BuilderError, TransactionBuilder};
pub use invert::{invert_step, invert_transaction};
pub use step::{Origin, Step, Transaction, TransactionMetadata};
