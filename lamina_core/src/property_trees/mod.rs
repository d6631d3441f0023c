// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform, clip, effect, and scroll trees.
//!
//! The four trees are a compacted form of the layer tree: a layer only gets a
//! node in a tree when it introduces new state there, and otherwise shares its
//! nearest ancestor's node. Every tree is a flat arena whose node 0 is a
//! sentinel root and whose parents always precede their children.
//!
//! There are two granularities of staleness:
//!
//! - per tree, [`needs_update`](PropertyTree::needs_update) means cached
//!   outputs (accumulated transforms, clip rects, opacities) are out of date;
//! - on the aggregate, [`needs_rebuild`](PropertyTrees::needs_rebuild) means
//!   node membership changed and the arenas must be rebuilt from the layers.
//!
//! Rebuilding bumps [`sequence_number`](PropertyTrees::sequence_number);
//! indices cached on layers under an older number are treated as absent.

mod clip;
mod effect;
mod scroll;
mod transform;
mod tree;

use alloc::collections::BTreeMap;

use kurbo::Vec2;

pub use clip::{ClipNode, ClipTree};
pub(crate) use clip::convert_clip_rect;
pub use effect::{EffectNode, EffectTree};
pub use scroll::{ScrollNode, ScrollTree, SyncedScrollOffset};
pub use transform::{SurfaceScaleInputs, TransformNode, TransformTree};
pub use tree::{NO_NODE, NodeId, PropertyTree, ROOT_NODE, TreeNode};

use crate::layer::LayerId;

/// Names one of the four trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeType {
    /// The transform tree.
    Transform,
    /// The clip tree.
    Clip,
    /// The effect tree.
    Effect,
    /// The scroll tree.
    Scroll,
}

/// The four property trees plus their owner lookup maps.
#[derive(Clone, Debug)]
pub struct PropertyTrees {
    /// Transform tree.
    pub transform_tree: TransformTree,
    /// Clip tree.
    pub clip_tree: ClipTree,
    /// Effect tree.
    pub effect_tree: EffectTree,
    /// Scroll tree.
    pub scroll_tree: ScrollTree,
    id_to_index: [BTreeMap<LayerId, NodeId>; 4],
    sequence_number: u64,
    needs_rebuild: bool,
}

impl Default for PropertyTrees {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyTrees {
    /// Creates empty trees that need a rebuild.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transform_tree: TransformTree::new(),
            clip_tree: ClipTree::new(),
            effect_tree: EffectTree::new(),
            scroll_tree: ScrollTree::new(),
            id_to_index: core::array::from_fn(|_| BTreeMap::new()),
            sequence_number: 0,
            needs_rebuild: true,
        }
    }

    /// Drops every node and owner mapping. Scroll offsets are kept.
    pub fn clear(&mut self) {
        self.transform_tree.clear();
        self.clip_tree.clear();
        self.effect_tree.clear();
        self.scroll_tree.clear();
        for map in &mut self.id_to_index {
            map.clear();
        }
    }

    /// Number bumped on every rebuild.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Starts a new generation of node indices.
    pub(crate) fn bump_sequence_number(&mut self) -> u64 {
        self.sequence_number += 1;
        self.sequence_number
    }

    /// Whether node membership is stale.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Sets whether node membership is stale.
    pub fn set_needs_rebuild(&mut self, needs_rebuild: bool) {
        self.needs_rebuild = needs_rebuild;
    }

    /// Marks all four trees' cached outputs stale.
    pub fn set_needs_update_all(&mut self) {
        self.transform_tree.set_needs_update(true);
        self.clip_tree.set_needs_update(true);
        self.effect_tree.set_needs_update(true);
        self.scroll_tree.set_needs_update(true);
    }

    /// Records that `owner` owns `id` in `tree`.
    ///
    /// # Panics
    ///
    /// Panics if `owner` already owns a node in `tree`.
    pub fn set_owner(&mut self, tree: TreeType, owner: LayerId, id: NodeId) {
        let previous = self.id_to_index[tree as usize].insert(owner, id);
        assert!(
            previous.is_none(),
            "{owner:?} already owns a {tree:?} node"
        );
    }

    /// Node owned by `owner` in `tree`, if any.
    #[must_use]
    pub fn owned_node(&self, tree: TreeType, owner: LayerId) -> Option<NodeId> {
        self.id_to_index[tree as usize].get(&owner).copied()
    }

    /// Returns true if `owner` owns a node in `tree`.
    #[must_use]
    pub fn is_in_id_to_index_map(&self, tree: TreeType, owner: LayerId) -> bool {
        self.id_to_index[tree as usize].contains_key(&owner)
    }

    /// Forgets every node `owner` owns, in all four trees.
    pub fn remove_id_from_id_to_index_maps(&mut self, owner: LayerId) {
        for map in &mut self.id_to_index {
            map.remove(&owner);
        }
    }

    /// Sets the scroll offset of `owner` and updates its transform node in
    /// place.
    ///
    /// Returns true if the offset changed.
    pub fn set_scroll_offset(&mut self, owner: LayerId, offset: Vec2) -> bool {
        if !self.scroll_tree.set_scroll_offset(owner, offset) {
            return false;
        }
        if let Some(id) = self.owned_node(TreeType::Transform, owner) {
            self.transform_tree
                .node_mut(id)
                .data
                .set_scroll_offset(offset);
        }
        self.transform_tree.set_needs_update(true);
        true
    }

    /// Sets the opacity of the effect node `owner` owns, in place.
    ///
    /// Returns false if `owner` has no effect node.
    pub fn set_opacity(&mut self, owner: LayerId, opacity: f32) -> bool {
        let Some(id) = self.owned_node(TreeType::Effect, owner) else {
            return false;
        };
        self.effect_tree.node_mut(id).data.set_opacity(opacity);
        self.effect_tree.set_needs_update(true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_maps_track_membership() {
        let mut trees = PropertyTrees::new();
        let owner = LayerId::from_raw(5);
        let id = trees
            .effect_tree
            .insert(EffectNode::default(), ROOT_NODE, Some(owner));
        trees.set_owner(TreeType::Effect, owner, id);
        assert!(trees.is_in_id_to_index_map(TreeType::Effect, owner));
        assert!(!trees.is_in_id_to_index_map(TreeType::Clip, owner));
        trees.remove_id_from_id_to_index_maps(owner);
        assert!(!trees.is_in_id_to_index_map(TreeType::Effect, owner));
    }

    #[test]
    #[should_panic(expected = "already owns a Transform node")]
    fn one_node_per_owner() {
        let mut trees = PropertyTrees::new();
        let owner = LayerId::from_raw(5);
        trees.set_owner(TreeType::Transform, owner, 1);
        trees.set_owner(TreeType::Transform, owner, 2);
    }

    #[test]
    fn scroll_offset_reaches_transform_node() {
        let mut trees = PropertyTrees::new();
        let owner = LayerId::from_raw(9);
        let id = trees
            .transform_tree
            .insert(TransformNode::default(), ROOT_NODE, Some(owner));
        trees.set_owner(TreeType::Transform, owner, id);
        trees.transform_tree.set_needs_update(false);

        assert!(trees.set_scroll_offset(owner, Vec2::new(0.0, 12.0)));
        let node = &trees.transform_tree.node(id).data;
        assert_eq!(node.scroll_offset, Vec2::new(0.0, 12.0));
        assert!(node.needs_local_transform_update);
        assert!(trees.transform_tree.needs_update());
        assert!(!trees.set_scroll_offset(owner, Vec2::new(0.0, 12.0)));
    }

    #[test]
    fn clear_keeps_sequence_and_offsets() {
        let mut trees = PropertyTrees::new();
        let owner = LayerId::from_raw(2);
        trees.set_scroll_offset(owner, Vec2::new(3.0, 4.0));
        let seq = trees.bump_sequence_number();
        trees.clear();
        assert_eq!(trees.sequence_number(), seq);
        assert_eq!(
            trees.scroll_tree.current_scroll_offset(owner),
            Vec2::new(3.0, 4.0)
        );
    }
}
