// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll tree and the scroll offsets it carries across rebuilds.

use alloc::collections::BTreeMap;
use core::ops::{Deref, DerefMut};

use kurbo::{Size, Vec2};

use super::tree::{NodeId, PropertyTree, ROOT_NODE};
use crate::layer::LayerId;

/// Scroll tree node payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollNode {
    /// The owner has a scroll clip layer.
    pub scrollable: bool,
    /// Bounds of the scrolled content.
    pub bounds: Size,
    /// Bounds of the layer that clips the scrolled content.
    pub scroll_clip_layer_bounds: Size,
    /// The user may scroll horizontally.
    pub user_scrollable_horizontal: bool,
    /// The user may scroll vertically.
    pub user_scrollable_vertical: bool,
    /// Why scrolling must happen on the main thread, as a bitmask.
    pub main_thread_scrolling_reasons: u32,
    /// The owner has a non-empty non-fast-scrollable region.
    pub contains_non_fast_scrollable_region: bool,
    /// Transform node that applies this node's scroll offset.
    pub transform_id: NodeId,
}

impl Default for ScrollNode {
    fn default() -> Self {
        Self {
            scrollable: false,
            bounds: Size::ZERO,
            scroll_clip_layer_bounds: Size::ZERO,
            user_scrollable_horizontal: false,
            user_scrollable_vertical: false,
            main_thread_scrolling_reasons: 0,
            contains_non_fast_scrollable_region: false,
            transform_id: ROOT_NODE,
        }
    }
}

/// A scroll offset split into the committed base and a local delta.
///
/// The current offset is `base + delta`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SyncedScrollOffset {
    /// Last offset received from a commit.
    pub base: Vec2,
    /// Scrolling applied on top of [`base`](Self::base).
    pub delta: Vec2,
}

impl SyncedScrollOffset {
    /// The offset content is drawn at.
    #[must_use]
    pub fn current(&self) -> Vec2 {
        self.base + self.delta
    }
}

/// The scroll tree.
///
/// Dereferences to the node arena. Offsets are keyed by owner layer and are
/// not dropped when the arena is rebuilt.
#[derive(Clone, Debug, Default)]
pub struct ScrollTree {
    nodes: PropertyTree<ScrollNode>,
    offsets: BTreeMap<LayerId, SyncedScrollOffset>,
}

impl Deref for ScrollTree {
    type Target = PropertyTree<ScrollNode>;

    fn deref(&self) -> &Self::Target {
        &self.nodes
    }
}

impl DerefMut for ScrollTree {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.nodes
    }
}

impl ScrollTree {
    /// Creates a tree holding only the sentinel root and no offsets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset of `owner`, or zero if it was never scrolled.
    #[must_use]
    pub fn current_scroll_offset(&self, owner: LayerId) -> Vec2 {
        self.offsets
            .get(&owner)
            .map_or(Vec2::ZERO, SyncedScrollOffset::current)
    }

    /// The stored offset record for `owner`.
    #[must_use]
    pub fn synced_scroll_offset(&self, owner: LayerId) -> Option<&SyncedScrollOffset> {
        self.offsets.get(&owner)
    }

    /// Sets the current offset of `owner` by adjusting its delta.
    ///
    /// Returns true if the current offset changed. Marks the tree for update.
    pub fn set_scroll_offset(&mut self, owner: LayerId, offset: Vec2) -> bool {
        let entry = self.offsets.entry(owner).or_default();
        if entry.current() == offset {
            return false;
        }
        entry.delta = offset - entry.base;
        self.nodes.set_needs_update(true);
        true
    }

    /// Replaces the committed base of `owner`, keeping its delta.
    ///
    /// Returns true if the current offset changed.
    pub fn update_scroll_offset_base_for_testing(&mut self, owner: LayerId, base: Vec2) -> bool {
        let entry = self.offsets.entry(owner).or_default();
        let before = entry.current();
        entry.base = base;
        let changed = entry.current() != before;
        if changed {
            self.nodes.set_needs_update(true);
        }
        changed
    }

    /// Folds every delta into its base, as after a commit that carried the
    /// current offsets.
    pub fn collapse_deltas(&mut self) {
        for entry in self.offsets.values_mut() {
            entry.base = entry.current();
            entry.delta = Vec2::ZERO;
        }
    }

    /// Forgets the offset of a layer that left the tree.
    pub fn remove_scroll_offset(&mut self, owner: LayerId) {
        self.offsets.remove(&owner);
    }

    /// Largest offset node `id` can scroll to. Never negative.
    #[must_use]
    pub fn max_scroll_offset(&self, id: NodeId) -> Vec2 {
        let node = &self.nodes.node(id).data;
        if !node.scrollable {
            return Vec2::ZERO;
        }
        Vec2::new(
            (node.bounds.width - node.scroll_clip_layer_bounds.width).max(0.0),
            (node.bounds.height - node.scroll_clip_layer_bounds.height).max(0.0),
        )
    }

    /// Clamps `offset` into `[0, max_scroll_offset(id)]` on both axes.
    #[must_use]
    pub fn clamp_scroll_offset(&self, id: NodeId, offset: Vec2) -> Vec2 {
        let max = self.max_scroll_offset(id);
        Vec2::new(offset.x.clamp(0.0, max.x), offset.y.clamp(0.0, max.y))
    }

    /// Drops every node, keeping offsets.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_survive_clear() {
        let mut tree = ScrollTree::new();
        let owner = LayerId::from_raw(3);
        assert!(tree.set_scroll_offset(owner, Vec2::new(0.0, 40.0)));
        assert!(!tree.set_scroll_offset(owner, Vec2::new(0.0, 40.0)));
        tree.clear();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.current_scroll_offset(owner), Vec2::new(0.0, 40.0));
    }

    #[test]
    fn base_update_keeps_delta() {
        let mut tree = ScrollTree::new();
        let owner = LayerId::from_raw(3);
        tree.set_scroll_offset(owner, Vec2::new(10.0, 0.0));
        assert!(tree.update_scroll_offset_base_for_testing(owner, Vec2::new(5.0, 0.0)));
        assert_eq!(tree.current_scroll_offset(owner), Vec2::new(15.0, 0.0));
        tree.collapse_deltas();
        let synced = tree.synced_scroll_offset(owner).copied().unwrap_or_default();
        assert_eq!(synced.base, Vec2::new(15.0, 0.0));
        assert_eq!(synced.delta, Vec2::ZERO);
    }

    #[test]
    fn max_offset_is_content_minus_clip() {
        let mut tree = ScrollTree::new();
        let id = tree.insert(
            ScrollNode {
                scrollable: true,
                bounds: Size::new(100.0, 300.0),
                scroll_clip_layer_bounds: Size::new(100.0, 200.0),
                ..ScrollNode::default()
            },
            ROOT_NODE,
            None,
        );
        assert_eq!(tree.max_scroll_offset(id), Vec2::new(0.0, 100.0));
        assert_eq!(
            tree.clamp_scroll_offset(id, Vec2::new(-5.0, 250.0)),
            Vec2::new(0.0, 100.0)
        );
        assert_eq!(tree.max_scroll_offset(ROOT_NODE), Vec2::ZERO);
    }
}
