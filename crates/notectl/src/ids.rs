// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Branded identifier types.
//!
//! `BlockId`, `NodeTypeName`, `MarkTypeName` and `InlineNodeTypeName` are all
//! thin wrappers around a single `String` field. They exist to stop a raw
//! string meant as a node type from being passed where a block id is
//! expected, and vice versa — equality is plain string equality, there is no
//! structural comparison involved in identity.
//!
//! Construction only happens through the functions below so that, in
//! particular, `BlockId::new` is the one place that id generation lives.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier for a [`crate::model::BlockNode`].
///
/// Ids are unique across a single document for the document's lifetime
/// (invariant 1 in `spec.md` §3); uniqueness across separate documents is
/// not guaranteed or required.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(String);

impl BlockId {
    /// Forge a new, process-unique id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("b{n}"))
    }

    /// Forge an id from a caller-supplied string, e.g. when round-tripping
    /// the JSON wire format (§6) where ids already exist.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! brand {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }
    };
}

brand!(NodeTypeName, "Registered block node type, e.g. `paragraph`, `heading`, `table`.");
brand!(MarkTypeName, "Registered mark type, e.g. `bold`, `textColor`.");
brand!(InlineNodeTypeName, "Registered inline node type, e.g. `hard_break`, `image`.");

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = BlockId::new();
        let b = BlockId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn brand_equality_is_string_equality() {
        assert_eq!(NodeTypeName::new("paragraph"), NodeTypeName::from("paragraph"));
        assert_ne!(NodeTypeName::new("paragraph"), NodeTypeName::new("heading"));
    }
}
