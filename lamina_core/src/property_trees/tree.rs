// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generic arena tree shared by the four property trees.

use alloc::vec::Vec;

use crate::layer::LayerId;

/// Index of a node inside a property tree.
pub type NodeId = u32;

/// Sentinel meaning "no node".
pub const NO_NODE: NodeId = u32::MAX;

/// Index of the sentinel root present in every tree.
pub const ROOT_NODE: NodeId = 0;

/// Common data every property-tree node carries.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode<T> {
    /// This node's own index.
    pub id: NodeId,
    /// Parent index; [`NO_NODE`] only for the sentinel root.
    pub parent_id: NodeId,
    /// The layer whose properties caused this node to exist, if any.
    pub owner_id: Option<LayerId>,
    /// Tree-specific payload.
    pub data: T,
}

/// Flat arena of nodes. Node 0 is a sentinel root; every other node's parent
/// has a smaller index, so a forward scan visits parents before children.
#[derive(Clone, Debug)]
pub struct PropertyTree<T> {
    nodes: Vec<TreeNode<T>>,
    needs_update: bool,
}

impl<T: Default> Default for PropertyTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> PropertyTree<T> {
    /// Creates a tree holding only the sentinel root.
    #[must_use]
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            needs_update: false,
        };
        tree.clear();
        tree
    }

    /// Drops every node except a fresh sentinel root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(TreeNode {
            id: ROOT_NODE,
            parent_id: NO_NODE,
            owner_id: None,
            data: T::default(),
        });
        self.needs_update = true;
    }
}

impl<T> PropertyTree<T> {
    /// Appends a node under `parent_id` and returns its index.
    ///
    /// # Panics
    ///
    /// Panics if `parent_id` does not name an existing node.
    pub fn insert(&mut self, data: T, parent_id: NodeId, owner_id: Option<LayerId>) -> NodeId {
        assert!(
            (parent_id as usize) < self.nodes.len(),
            "parent node {parent_id} out of range (len {})",
            self.nodes.len()
        );
        let id = NodeId::try_from(self.nodes.len()).unwrap_or(NO_NODE);
        assert!(id != NO_NODE, "property tree is full");
        self.nodes.push(TreeNode {
            id,
            parent_id,
            owner_id,
            data,
        });
        id
    }

    /// Returns the node at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is [`NO_NODE`] or out of range.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &TreeNode<T> {
        assert!(
            (id as usize) < self.nodes.len(),
            "node {id} out of range (len {})",
            self.nodes.len()
        );
        &self.nodes[id as usize]
    }

    /// Returns the node at `id` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` is [`NO_NODE`] or out of range.
    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode<T> {
        assert!(
            (id as usize) < self.nodes.len(),
            "node {id} out of range (len {})",
            self.nodes.len()
        );
        &mut self.nodes[id as usize]
    }

    /// Returns the node at `id`, or `None` for [`NO_NODE`] and out-of-range
    /// indices.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.nodes.get(id as usize)
    }

    /// Returns the parent of `id`, or `None` for the sentinel root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<&TreeNode<T>> {
        let p = self.node(id).parent_id;
        if p == NO_NODE { None } else { Some(self.node(p)) }
    }

    /// Number of nodes, including the sentinel root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its sentinel root, so this is never true after
    /// construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates all nodes in index order (parents before children).
    pub fn iter(&self) -> core::slice::Iter<'_, TreeNode<T>> {
        self.nodes.iter()
    }

    /// Whether cached per-node outputs must be recomputed.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Sets whether cached per-node outputs must be recomputed.
    pub fn set_needs_update(&mut self, needs_update: bool) {
        self.needs_update = needs_update;
    }

    /// Returns true if `ancestor` is `id` or lies on `id`'s parent chain.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        while id != NO_NODE {
            if id == ancestor {
                return true;
            }
            id = self.node(id).parent_id;
        }
        false
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [TreeNode<T>] {
        &mut self.nodes
    }
}
