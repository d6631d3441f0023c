// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{INVALID, LayerId};
use super::store::LayerTree;

/// An iterator over the direct children of a layer, in paint order.
///
/// Masks and replicas are not children and are not yielded.
///
/// Created by [`LayerTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a LayerTree,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a LayerTree, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.id[idx as usize])
    }
}

impl LayerTree {
    /// Slots of the subtree rooted at `idx` in paint order (pre-order),
    /// including masks and replicas right after their owner.
    pub(crate) fn subtree_slots(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        self.collect_subtree(idx, &mut out);
        out
    }

    fn collect_subtree(&self, idx: u32, out: &mut Vec<u32>) {
        out.push(idx);
        let mask = self.mask[idx as usize];
        if mask != INVALID {
            self.collect_subtree(mask, out);
        }
        let replica = self.replica[idx as usize];
        if replica != INVALID {
            self.collect_subtree(replica, out);
        }
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.collect_subtree(child, out);
            child = self.next_sibling[child as usize];
        }
    }
}
