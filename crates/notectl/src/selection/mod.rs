// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The selection model (C3): text ranges, whole-node selection, and gap
//! cursors around void/isolating blocks. See `spec.md` §4.3.

use crate::ids::BlockId;
use crate::model::doc::Document;
use crate::model::ops::{find_node, get_block_length};

/// A position within a leaf block's inline content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub block_id: BlockId,
    pub offset: usize,
}

impl Point {
    pub fn new(block_id: BlockId, offset: usize) -> Self {
        Self { block_id, offset }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSelection {
    pub anchor: Point,
    pub head: Point,
}

impl TextSelection {
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Start/end ordered by document position within a single block. For a
    /// selection spanning multiple blocks, ordering across blocks is the
    /// caller's responsibility (the block order in the document); within one
    /// block this just orders by offset.
    pub fn ordered_offsets_within_block(&self) -> Option<(usize, usize)> {
        if self.anchor.block_id != self.head.block_id {
            return None;
        }
        Some(if self.anchor.offset <= self.head.offset {
            (self.anchor.offset, self.head.offset)
        } else {
            (self.head.offset, self.anchor.offset)
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSelection {
    pub node_id: BlockId,
    pub path: Option<Vec<BlockId>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GapSide {
    Before,
    After,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GapCursor {
    pub node_id: BlockId,
    pub side: GapSide,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Text(TextSelection),
    Node(NodeSelection),
    Gap(GapCursor),
}

impl Selection {
    pub fn is_text_selection(&self) -> bool {
        matches!(self, Selection::Text(_))
    }

    pub fn is_node_selection(&self) -> bool {
        matches!(self, Selection::Node(_))
    }

    pub fn is_gap_cursor(&self) -> bool {
        matches!(self, Selection::Gap(_))
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            Selection::Text(t) => t.is_collapsed(),
            // A NodeSelection or GapCursor has no "extent" to collapse; they
            // are treated as collapsed for the purposes of e.g. deciding
            // whether stored marks should apply.
            Selection::Node(_) | Selection::Gap(_) => true,
        }
    }

    pub fn as_text(&self) -> Option<&TextSelection> {
        match self {
            Selection::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&NodeSelection> {
        match self {
            Selection::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_gap(&self) -> Option<&GapCursor> {
        match self {
            Selection::Gap(g) => Some(g),
            _ => None,
        }
    }

    /// The block this selection is anchored in, regardless of variant. Used
    /// to decide whether a selection change crossed a block boundary
    /// (`spec.md` §4.4, storedMarks clearing).
    pub fn anchor_block_id(&self) -> &BlockId {
        match self {
            Selection::Text(t) => &t.anchor.block_id,
            Selection::Node(n) => &n.node_id,
            Selection::Gap(g) => &g.node_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionError {
    UnknownBlock(BlockId),
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionError::UnknownBlock(id) => write!(f, "selection refers to unknown block {id}"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// The common cursor constructor: a collapsed `TextSelection` at `offset`
/// in `block_id`, clamped to the block's valid length.
pub fn create_collapsed_selection(
    doc: &Document,
    block_id: BlockId,
    offset: usize,
) -> Result<Selection, SelectionError> {
    let block = find_node(doc, &block_id).ok_or_else(|| SelectionError::UnknownBlock(block_id.clone()))?;
    let clamped = offset.min(get_block_length(block));
    let point = Point::new(block_id, clamped);
    Ok(Selection::Text(TextSelection {
        anchor: point.clone(),
        head: point,
    }))
}

/// Constructs a `TextSelection`, clamping both offsets to their blocks'
/// valid lengths and validating both block ids exist.
pub fn create_text_selection(
    doc: &Document,
    anchor: Point,
    head: Point,
) -> Result<Selection, SelectionError> {
    let clamp = |p: Point| -> Result<Point, SelectionError> {
        let block = find_node(doc, &p.block_id).ok_or_else(|| SelectionError::UnknownBlock(p.block_id.clone()))?;
        Ok(Point::new(p.block_id, p.offset.min(get_block_length(block))))
    };
    Ok(Selection::Text(TextSelection {
        anchor: clamp(anchor)?,
        head: clamp(head)?,
    }))
}

pub fn create_node_selection(
    doc: &Document,
    node_id: BlockId,
    path: Option<Vec<BlockId>>,
) -> Result<Selection, SelectionError> {
    if find_node(doc, &node_id).is_none() {
        return Err(SelectionError::UnknownBlock(node_id));
    }
    Ok(Selection::Node(NodeSelection { node_id, path }))
}

pub fn create_gap_cursor(
    doc: &Document,
    node_id: BlockId,
    side: GapSide,
) -> Result<Selection, SelectionError> {
    if find_node(doc, &node_id).is_none() {
        return Err(SelectionError::UnknownBlock(node_id));
    }
    Ok(Selection::Gap(GapCursor { node_id, side }))
}

/// Invariant 4 (`spec.md` §8): the selection's referenced block ids exist
/// and offsets are within block lengths.
pub fn validate(doc: &Document, selection: &Selection) -> bool {
    match selection {
        Selection::Text(t) => {
            let check = |p: &Point| {
                find_node(doc, &p.block_id)
                    .map(|b| p.offset <= get_block_length(b))
                    .unwrap_or(false)
            };
            check(&t.anchor) && check(&t.head)
        }
        Selection::Node(n) => find_node(doc, &n.node_id).is_some(),
        Selection::Gap(g) => find_node(doc, &g.node_id).is_some(),
    }
}
