// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The document model (C2): an immutable, tree-shaped document of blocks,
//! inline nodes, text segments and marks. See `spec.md` §3.

pub mod attrs;
pub mod block;
pub mod doc;
pub mod inline;
pub mod invariants;
pub mod mark;
pub mod mutate;
pub mod ops;

pub use attrs::{attrs, AttrMap, AttrValue};
pub use block::{BlockChildren, BlockNode};
pub use doc::Document;
pub use inline::{InlineContent, InlineNode, TextNode};
pub use mark::{Mark, MarkSet};

/// A path addresses a sub-block through a chain of compound-block ids, root
/// to leaf inclusive (`spec.md` §3, "Offsets and lengths").
pub type Path = Vec<crate::ids::BlockId>;
