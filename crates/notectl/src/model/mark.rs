// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::ids::MarkTypeName;
use crate::model::attrs::AttrMap;

/// A non-structural annotation on a text run: bold, italic, link, textColor.
///
/// Two marks are equal iff type and attrs match (`spec.md` §3).
#[derive(Clone, Debug, PartialEq)]
pub struct Mark {
    pub mark_type: MarkTypeName,
    pub attrs: AttrMap,
}

impl Mark {
    pub fn new(mark_type: impl Into<MarkTypeName>, attrs: AttrMap) -> Self {
        Self {
            mark_type: mark_type.into(),
            attrs,
        }
    }

    pub fn simple(mark_type: impl Into<MarkTypeName>) -> Self {
        Self::new(mark_type, AttrMap::new())
    }
}

/// A set of marks: no duplicate types, ordered by registered rank.
///
/// `spec.md` §9 ("Mark sets") calls for a sorted array keyed by rank with
/// set equality; this wraps a `Vec<Mark>` rather than reaching for a
/// `BTreeSet` because rank-based ordering is schema-dependent, not a
/// property of `Mark` itself — sorting happens in
/// [`crate::schema::registry::SchemaRegistry::sort_marks`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkSet(Vec<Mark>);

impl MarkSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_sorted(marks: Vec<Mark>) -> Self {
        Self(marks)
    }

    pub fn as_slice(&self) -> &[Mark] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_type(&self, t: &MarkTypeName) -> bool {
        self.0.iter().any(|m| &m.mark_type == t)
    }

    pub fn get(&self, t: &MarkTypeName) -> Option<&Mark> {
        self.0.iter().find(|m| &m.mark_type == t)
    }

    /// Insert or replace the mark of the same type, keeping `ranked` as the
    /// invariant sort order. Callers (the transaction step applier, the
    /// builder's `addMark`) always hand in the rank function so no mark set
    /// ever observes an unsorted intermediate state.
    pub fn with_added(&self, mark: Mark, rank: impl Fn(&MarkTypeName) -> i32) -> Self {
        let mut v: Vec<Mark> = self
            .0
            .iter()
            .filter(|m| m.mark_type != mark.mark_type)
            .cloned()
            .collect();
        v.push(mark);
        v.sort_by_key(|m| rank(&m.mark_type));
        Self(v)
    }

    pub fn with_removed(&self, mark_type: &MarkTypeName) -> Self {
        Self(
            self.0
                .iter()
                .filter(|m| &m.mark_type != mark_type)
                .cloned()
                .collect(),
        )
    }

    /// Set equality ignoring order (`markSetsEqual` in `spec.md` §4.2).
    pub fn set_eq(&self, other: &MarkSet) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        self.0.iter().all(|m| other.0.contains(m))
    }
}

impl IntoIterator for MarkSet {
    type Item = Mark;
    type IntoIter = std::vec::IntoIter<Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
