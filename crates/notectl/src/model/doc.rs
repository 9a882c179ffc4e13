// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::fmt::Write as _;

use crate::ids::BlockId;
use crate::model::block::{BlockChildren, BlockNode};
use crate::model::inline::InlineContent;

/// The document root: an ordered sequence of top-level blocks.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Document {
    pub blocks: Vec<BlockNode>,
}

impl Document {
    pub fn new(blocks: Vec<BlockNode>) -> Self {
        Self { blocks }
    }

    pub fn top_level_order(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.id.clone()).collect()
    }

    /// An indented debug dump of the whole tree: one line per block giving
    /// its type, id and attrs, and one line per inline content piece under a
    /// leaf block. Not part of the wire format — for logging and tests only.
    pub fn to_tree(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            write_block_tree(&mut out, block, 0);
        }
        out
    }
}

fn write_block_tree(out: &mut String, block: &BlockNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{indent}{} ({}) {:?}", block.node_type, block.id, block.attrs);
    match &block.children {
        BlockChildren::Blocks(children) => {
            for child in children {
                write_block_tree(out, child, depth + 1);
            }
        }
        BlockChildren::Inline(content) => {
            let child_indent = "  ".repeat(depth + 1);
            for piece in content {
                match piece {
                    InlineContent::Text(t) => {
                        let _ = writeln!(out, "{child_indent}text {:?} marks={:?}", t.text, t.marks.as_slice());
                    }
                    InlineContent::Inline(n) => {
                        let _ = writeln!(out, "{child_indent}{} {:?}", n.node_type, n.attrs);
                    }
                }
            }
        }
    }
}
