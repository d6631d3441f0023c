// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, topology, and property
//! management.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::vec::Vec;

use kurbo::{Point, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::blend::BlendMode;
use super::copy::CopyOutputRequest;
use super::draw::DrawProperties;
use super::filter::FilterOperations;
use super::id::{INVALID, LayerId, LayerIdAllocator};
use super::props::{
    AnimationState, CopyQueue, LayerFlags, LayerProperties, LayerRole, TreeIndices,
};
use super::region::Region;
use super::surface::RenderSurface;
use super::traverse::Children;
use crate::dirty;
use crate::property_trees::{NO_NODE, NodeId, PropertyTrees, TreeType};
use crate::settings::{CalcDrawPropsInputs, LayerTreeSettings};
#[cfg(feature = "trace-rich")]
use crate::trace::{LayerChange, LayerField};
use crate::transform::Transform3d;

/// The layer tree host: every layer of one tree, its property trees, and the
/// draw properties computed from them.
///
/// Layers are addressed by [`LayerId`]. Internally each layer occupies a slot
/// in parallel arrays; destroyed slots are recycled through a free list while
/// ids are never reused.
///
/// A layer is *attached* when it is reachable from the
/// [root layer](Self::set_root_layer) through child, mask, or replica slots.
/// Only attached layers take part in property trees, draw properties, and
/// pushes to the impl side.
#[derive(Debug)]
pub struct LayerTree {
    pub(crate) settings: LayerTreeSettings,
    pub(crate) ids: Rc<LayerIdAllocator>,
    pub(crate) slot_of: BTreeMap<LayerId, u32>,

    // -- Topology --
    pub(crate) id: Vec<LayerId>,
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) mask: Vec<u32>,
    pub(crate) replica: Vec<u32>,
    pub(crate) role: Vec<LayerRole>,

    // -- Properties (set by callers) --
    pub(crate) props: Vec<LayerProperties>,
    pub(crate) animation: Vec<AnimationState>,
    pub(crate) copy_requests: Vec<CopyQueue>,
    pub(crate) scroll_children: Vec<Vec<LayerId>>,
    pub(crate) clip_children: Vec<Vec<LayerId>>,

    // -- Host registration --
    pub(crate) root: u32,
    pub(crate) attached: Vec<bool>,

    // -- Property-tree state (written by the builder) --
    pub(crate) property_trees: PropertyTrees,
    pub(crate) tree_indices: Vec<TreeIndices>,
    pub(crate) offset_to_transform_parent: Vec<Vec2>,
    pub(crate) has_render_surface: Vec<bool>,
    pub(crate) scroll_clip_layers: BTreeSet<LayerId>,
    pub(crate) has_fixed_position_layers: bool,

    // -- Draw state (written by the draw pass) --
    pub(crate) inputs: Option<CalcDrawPropsInputs>,
    pub(crate) draw_properties: Vec<DrawProperties>,
    pub(crate) render_surfaces: Vec<Option<RenderSurface>>,
    pub(crate) render_surface_layer_list: Vec<LayerId>,

    // -- Allocation --
    pub(crate) live: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) needs_full_tree_sync: bool,
    pub(crate) needs_commit: bool,
    pub(crate) in_paint: bool,
    pub(crate) source_frame_number: u64,
    #[cfg(feature = "trace-rich")]
    pub(crate) pending_changes: Vec<LayerChange>,
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new(LayerTreeSettings::default())
    }
}

impl LayerTree {
    /// Creates an empty tree with its own id allocator.
    #[must_use]
    pub fn new(settings: LayerTreeSettings) -> Self {
        Self::with_allocator(settings, Rc::new(LayerIdAllocator::new()))
    }

    /// Creates an empty tree that draws ids from a shared allocator.
    #[must_use]
    pub fn with_allocator(settings: LayerTreeSettings, ids: Rc<LayerIdAllocator>) -> Self {
        Self {
            settings,
            ids,
            slot_of: BTreeMap::new(),
            id: Vec::new(),
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            mask: Vec::new(),
            replica: Vec::new(),
            role: Vec::new(),
            props: Vec::new(),
            animation: Vec::new(),
            copy_requests: Vec::new(),
            scroll_children: Vec::new(),
            clip_children: Vec::new(),
            root: INVALID,
            attached: Vec::new(),
            property_trees: PropertyTrees::new(),
            tree_indices: Vec::new(),
            offset_to_transform_parent: Vec::new(),
            has_render_surface: Vec::new(),
            scroll_clip_layers: BTreeSet::new(),
            has_fixed_position_layers: false,
            inputs: None,
            draw_properties: Vec::new(),
            render_surfaces: Vec::new(),
            render_surface_layer_list: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            needs_full_tree_sync: true,
            needs_commit: false,
            in_paint: false,
            source_frame_number: 0,
            #[cfg(feature = "trace-rich")]
            pending_changes: Vec::new(),
        }
    }

    /// The settings this tree was created with.
    #[must_use]
    pub fn settings(&self) -> &LayerTreeSettings {
        &self.settings
    }

    /// The allocator ids are drawn from.
    #[must_use]
    pub fn id_allocator(&self) -> &Rc<LayerIdAllocator> {
        &self.ids
    }

    /// The property trees as of the last build.
    #[must_use]
    pub fn property_trees(&self) -> &PropertyTrees {
        &self.property_trees
    }

    /// Number of live layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slot_of.len()
    }

    /// Returns true if the tree has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot_of.is_empty()
    }

    /// Iterates the ids of all live layers in id order.
    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.slot_of.keys().copied()
    }

    // -- Allocation API --

    /// Creates a detached layer with default properties.
    pub fn create_layer(&mut self) -> LayerId {
        let id = self.ids.allocate();
        self.create_layer_with_id(id);
        id
    }

    /// Creates a detached layer with a caller-chosen id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already in use in this tree.
    pub(crate) fn create_layer_with_id(&mut self, id: LayerId) -> u32 {
        assert!(!self.slot_of.contains_key(&id), "duplicate LayerId: {id:?}");
        self.ids.reserve_through(id);
        let idx = if let Some(idx) = self.free_list.pop() {
            self.reset_slot(idx, id);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.id.push(id);
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.mask.push(INVALID);
            self.replica.push(INVALID);
            self.role.push(LayerRole::Child);
            self.props.push(LayerProperties::default());
            self.animation.push(AnimationState::default());
            self.copy_requests.push(Vec::new());
            self.scroll_children.push(Vec::new());
            self.clip_children.push(Vec::new());
            self.attached.push(false);
            self.tree_indices.push(TreeIndices::default());
            self.offset_to_transform_parent.push(Vec2::ZERO);
            self.has_render_surface.push(false);
            self.draw_properties.push(DrawProperties::default());
            self.render_surfaces.push(None);
            self.live.push(true);
            idx
        };
        self.slot_of.insert(id, idx);
        idx
    }

    /// Destroys a layer.
    ///
    /// Scroll and clip relations in both directions are cleared first.
    ///
    /// # Panics
    ///
    /// Panics if the id is unknown, if the layer is still attached to a
    /// parent or is the root, or if it still has children, a mask, or a
    /// replica.
    pub fn destroy_layer(&mut self, id: LayerId) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        assert!(
            self.parent[idx as usize] == INVALID && self.root != idx,
            "cannot destroy attached layer {id:?}"
        );
        assert!(
            self.first_child[idx as usize] == INVALID
                && self.mask[idx as usize] == INVALID
                && self.replica[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        self.cut_relations(idx, false);
        self.property_trees.remove_id_from_id_to_index_maps(id);
        self.property_trees.scroll_tree.remove_scroll_offset(id);
        self.dirty.remove_key(idx);

        self.slot_of.remove(&id);
        self.live[idx as usize] = false;
        self.copy_requests[idx as usize].clear();
        self.free_list.push(idx);
    }

    /// Returns whether `id` names a live layer of this tree.
    #[must_use]
    pub fn contains(&self, id: LayerId) -> bool {
        self.slot_of.contains_key(&id)
    }

    // -- Host registration --

    /// Makes `root` the root of the tree, or clears the root.
    ///
    /// # Panics
    ///
    /// Panics if `root` has a parent.
    pub fn set_root_layer(&mut self, root: Option<LayerId>) {
        self.check_mutation_allowed();
        let new_root = match root {
            Some(id) => {
                let idx = self.slot(id);
                assert!(
                    self.parent[idx as usize] == INVALID,
                    "root layer cannot have a parent"
                );
                idx
            }
            None => INVALID,
        };
        if new_root == self.root {
            return;
        }
        let old_root = self.root;
        self.root = new_root;
        for idx in [old_root, new_root] {
            if idx != INVALID {
                self.dirty.mark_with(idx, dirty::HOST, &EagerPolicy);
                self.dirty.mark(idx, dirty::TOPOLOGY);
            }
        }
        self.topology_changed(INVALID);
        self.sync_host_registration();
    }

    /// The root layer, if one is set.
    #[must_use]
    pub fn root_layer(&self) -> Option<LayerId> {
        (self.root != INVALID).then(|| self.id[self.root as usize])
    }

    /// Returns true if the layer is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: LayerId) -> bool {
        self.attached[self.slot(id) as usize]
    }

    // -- Topology API --

    /// Sets or clears the parent of `child`.
    ///
    /// `Some(parent)` appends `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`insert_child`](Self::insert_child).
    pub fn set_parent(&mut self, child: LayerId, parent: Option<LayerId>) {
        match parent {
            Some(p) => self.add_child(p, child),
            None => self.remove_from_parent(child),
        }
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`insert_child`](Self::insert_child).
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.insert_child(parent, child, usize::MAX);
    }

    /// Inserts `child` into `parent`'s child list at `index`.
    ///
    /// `child` is first removed from wherever it was attached. `index` is
    /// clamped to the number of children.
    ///
    /// # Panics
    ///
    /// Panics if either id is unknown, if `child` is `parent` or one of its
    /// ancestors, or if `child` is the root.
    pub fn insert_child(&mut self, parent: LayerId, child: LayerId, index: usize) {
        let p = self.slot(parent);
        let c = self.slot(child);
        self.check_mutation_allowed();
        self.check_no_cycle(p, c);
        assert!(c != self.root, "root layer cannot have a parent");

        if self.parent[c as usize] != INVALID {
            self.detach(c);
        }

        let mut before = self.first_child[p as usize];
        for _ in 0..index {
            if before == INVALID {
                break;
            }
            before = self.next_sibling[before as usize];
        }
        self.link_child(p, c, before);
        self.attach_dependencies(p, c);
        self.topology_changed(p);
        self.sync_host_registration();
    }

    /// Detaches `child` from its parent's child list, mask slot, or replica
    /// slot. Does nothing if the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        let c = self.slot(child);
        self.check_mutation_allowed();
        if self.parent[c as usize] == INVALID {
            return;
        }
        self.detach(c);
        self.sync_host_registration();
    }

    /// Replaces `reference` with `new_layer` at the same position in
    /// `parent`'s child list.
    ///
    /// Does nothing if `reference` and `new_layer` are the same layer. The
    /// tree is left untouched if any check fails.
    ///
    /// # Panics
    ///
    /// Panics if `reference` is not a child of `parent`, or if `new_layer`
    /// could not be inserted there by [`insert_child`](Self::insert_child).
    pub fn replace_child(&mut self, parent: LayerId, reference: LayerId, new_layer: LayerId) {
        let p = self.slot(parent);
        let r = self.slot(reference);
        let n = self.slot(new_layer);
        self.check_mutation_allowed();
        assert!(
            self.parent[r as usize] == p && self.role[r as usize] == LayerRole::Child,
            "{reference:?} is not a child of {parent:?}"
        );
        if reference == new_layer {
            return;
        }
        self.check_no_cycle(p, n);
        assert!(n != self.root, "root layer cannot have a parent");

        if self.parent[n as usize] != INVALID {
            self.detach(n);
        }
        let mut index = 0;
        let mut child = self.first_child[p as usize];
        while child != r {
            index += 1;
            child = self.next_sibling[child as usize];
        }
        self.detach(r);
        self.sync_host_registration();
        self.insert_child(parent, new_layer, index);
    }

    /// Removes every child of `parent`.
    pub fn remove_all_children(&mut self, parent: LayerId) {
        let p = self.slot(parent);
        self.check_mutation_allowed();
        while self.first_child[p as usize] != INVALID {
            let c = self.first_child[p as usize];
            self.detach(c);
        }
        self.sync_host_registration();
    }

    /// Sets or clears the mask of `owner`.
    ///
    /// The previous mask is detached, and `mask` is removed from wherever it
    /// was attached before.
    ///
    /// # Panics
    ///
    /// Panics if `mask` is `owner` or one of its ancestors.
    pub fn set_mask_layer(&mut self, owner: LayerId, mask: Option<LayerId>) {
        self.set_dependent(owner, mask, LayerRole::Mask);
    }

    /// Sets or clears the replica of `owner`.
    ///
    /// The previous replica is detached, and `replica` is removed from
    /// wherever it was attached before.
    ///
    /// # Panics
    ///
    /// Panics if `replica` is `owner` or one of its ancestors.
    pub fn set_replica_layer(&mut self, owner: LayerId, replica: Option<LayerId>) {
        self.set_dependent(owner, replica, LayerRole::Replica);
    }

    /// Returns the parent of a layer, if any. Masks and replicas report their
    /// owner.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        let p = self.parent[self.slot(id) as usize];
        (p != INVALID).then(|| self.id[p as usize])
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        let idx = self.slot(id);
        Children::new(self, self.first_child[idx as usize])
    }

    /// The mask of a layer.
    #[must_use]
    pub fn mask_layer(&self, id: LayerId) -> Option<LayerId> {
        self.id_at(self.mask[self.slot(id) as usize])
    }

    /// The replica of a layer.
    #[must_use]
    pub fn replica_layer(&self, id: LayerId) -> Option<LayerId> {
        self.id_at(self.replica[self.slot(id) as usize])
    }

    /// Which slot of its parent a layer occupies.
    #[must_use]
    pub fn role(&self, id: LayerId) -> LayerRole {
        self.role[self.slot(id) as usize]
    }

    /// Returns true if `candidate` is a strict ancestor of `id`.
    #[must_use]
    pub fn has_ancestor(&self, id: LayerId, candidate: LayerId) -> bool {
        let idx = self.slot(id);
        let Some(&cand) = self.slot_of.get(&candidate) else {
            return false;
        };
        self.has_ancestor_slot(idx, cand)
    }

    // -- Relations --

    /// Sets or clears the layer whose scroll node `id` scrolls with.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is `id` or unknown.
    pub fn set_scroll_parent(&mut self, id: LayerId, parent: Option<LayerId>) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        if let Some(p) = parent {
            self.slot(p);
            assert!(p != id, "{id:?} cannot be its own scroll parent");
        }
        if self.props[idx as usize].scroll_parent == parent {
            return;
        }
        self.relink_scroll_parent(idx, parent);
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Relations);
        self.property_changed(idx, true);
    }

    /// Sets or clears the layer whose clip `id` inherits instead of its
    /// parent's.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is `id` or unknown.
    pub fn set_clip_parent(&mut self, id: LayerId, parent: Option<LayerId>) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        if let Some(p) = parent {
            self.slot(p);
            assert!(p != id, "{id:?} cannot be its own clip parent");
        }
        if self.props[idx as usize].clip_parent == parent {
            return;
        }
        self.relink_clip_parent(idx, parent);
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Relations);
        self.property_changed(idx, true);
    }

    /// The scroll parent of a layer.
    #[must_use]
    pub fn scroll_parent(&self, id: LayerId) -> Option<LayerId> {
        self.props[self.slot(id) as usize].scroll_parent
    }

    /// The clip parent of a layer.
    #[must_use]
    pub fn clip_parent(&self, id: LayerId) -> Option<LayerId> {
        self.props[self.slot(id) as usize].clip_parent
    }

    /// Layers whose scroll parent is `id`.
    #[must_use]
    pub fn scroll_children(&self, id: LayerId) -> &[LayerId] {
        &self.scroll_children[self.slot(id) as usize]
    }

    /// Layers whose clip parent is `id`.
    #[must_use]
    pub fn clip_children(&self, id: LayerId) -> &[LayerId] {
        &self.clip_children[self.slot(id) as usize]
    }

    // -- Property getters --

    /// All persisted properties of a layer.
    #[must_use]
    pub fn properties(&self, id: LayerId) -> &LayerProperties {
        &self.props[self.slot(id) as usize]
    }

    /// Bounds of a layer.
    #[must_use]
    pub fn bounds(&self, id: LayerId) -> Size {
        self.properties(id).bounds
    }

    /// Position of a layer in its parent.
    #[must_use]
    pub fn position(&self, id: LayerId) -> Point {
        self.properties(id).position
    }

    /// Local transform of a layer.
    #[must_use]
    pub fn transform(&self, id: LayerId) -> Transform3d {
        self.properties(id).transform
    }

    /// Opacity of a layer.
    #[must_use]
    pub fn opacity(&self, id: LayerId) -> f32 {
        self.properties(id).opacity
    }

    /// Flags of a layer.
    #[must_use]
    pub fn flags(&self, id: LayerId) -> LayerFlags {
        self.properties(id).flags
    }

    /// Scroll offset of a layer.
    #[must_use]
    pub fn scroll_offset(&self, id: LayerId) -> Vec2 {
        self.properties(id).scroll_offset
    }

    /// Pending copy requests of a layer.
    #[must_use]
    pub fn copy_requests(&self, id: LayerId) -> &[CopyOutputRequest] {
        &self.copy_requests[self.slot(id) as usize]
    }

    /// Returns true if the layer has content of its own to draw.
    #[must_use]
    pub fn draws_content(&self, id: LayerId) -> bool {
        self.draws_content_at(self.slot(id))
    }

    // -- Mutation API --

    /// Sets the bounds of a layer.
    pub fn set_bounds(&mut self, id: LayerId, bounds: Size) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        if self.props[idx as usize].bounds == bounds {
            return;
        }
        let drew = self.draws_content_at(idx);
        self.props[idx as usize].bounds = bounds;
        let p = &self.props[idx as usize];
        let rebuild = p.flags.masks_to_bounds
            || p.is_scrollable()
            || self.scroll_clip_layers.contains(&id)
            || drew != self.draws_content_at(idx);
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Bounds);
        self.property_changed(idx, rebuild);
    }

    /// Sets the offset of a layer's origin from its parent's origin.
    pub fn set_position(&mut self, id: LayerId, position: Point) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        let old = self.props[idx as usize].position;
        if old == position {
            return;
        }
        self.props[idx as usize].position = position;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Position);
        let node = self
            .owned_node(TreeType::Transform, id)
            .filter(|_| !self.has_fixed_position_layers);
        if let Some(node) = node {
            let tree = &mut self.property_trees.transform_tree;
            let data = &mut tree.node_mut(node).data;
            data.post_local_offset += position - old;
            data.needs_local_transform_update = true;
            tree.set_needs_update(true);
            self.property_changed(idx, false);
        } else {
            self.property_changed(idx, true);
        }
    }

    /// Sets the local transform of a layer.
    ///
    /// Changes that keep the transform's class (translation-only and 2-D
    /// axis alignment) update the existing transform node in place.
    pub fn set_transform(&mut self, id: LayerId, transform: Transform3d) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        let old = self.props[idx as usize].transform;
        if old == transform {
            return;
        }
        self.props[idx as usize].transform = transform;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Transform);
        let same_class = old.is_2d_translation() == transform.is_2d_translation()
            && old.preserves_2d_axis_alignment() == transform.preserves_2d_axis_alignment();
        let rebuild = !same_class || !self.set_local_transform_in_place(id, transform);
        self.property_changed(idx, rebuild);
    }

    /// Sets the pivot of a layer's transform.
    pub fn set_transform_origin(&mut self, id: LayerId, origin: [f64; 3]) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        let old = self.props[idx as usize].transform_origin;
        if old == origin {
            return;
        }
        self.props[idx as usize].transform_origin = origin;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Position);
        let node = self
            .owned_node(TreeType::Transform, id)
            .filter(|_| old != [0.0; 3] && origin != [0.0; 3]);
        if let Some(node) = node {
            let tree = &mut self.property_trees.transform_tree;
            let data = &mut tree.node_mut(node).data;
            data.origin = origin;
            data.needs_local_transform_update = true;
            tree.set_needs_update(true);
            self.property_changed(idx, false);
        } else {
            self.property_changed(idx, true);
        }
    }

    /// Sets the opacity of a layer.
    ///
    /// Crossing 1.0 in either direction rebuilds the property trees.
    ///
    /// # Panics
    ///
    /// Panics if `opacity` is outside `[0, 1]`.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        assert!(
            (0.0..=1.0).contains(&opacity),
            "opacity {opacity} outside [0, 1]"
        );
        let old = self.props[idx as usize].opacity;
        if old == opacity {
            return;
        }
        self.props[idx as usize].opacity = opacity;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Opacity);
        let crosses_one = (old == 1.0) != (opacity == 1.0);
        let rebuild = crosses_one || !self.set_opacity_in_place(id, opacity);
        self.property_changed(idx, rebuild);
    }

    /// Sets the blend mode of a layer.
    ///
    /// # Panics
    ///
    /// Panics if `mode` is a Porter-Duff mode other than source-over.
    pub fn set_blend_mode(&mut self, id: LayerId, mode: BlendMode) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        assert!(
            mode.is_allowed_for_layers(),
            "blend mode {mode:?} is not allowed on layers"
        );
        let old = self.props[idx as usize].blend_mode;
        if old == mode {
            return;
        }
        self.props[idx as usize].blend_mode = mode;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::BlendMode);
        let node = self
            .owned_node(TreeType::Effect, id)
            .filter(|_| old.is_non_default() == mode.is_non_default());
        if let Some(node) = node {
            let tree = &mut self.property_trees.effect_tree;
            tree.node_mut(node).data.blend_mode = mode;
            tree.set_needs_update(true);
            self.property_changed(idx, false);
        } else {
            self.property_changed(idx, true);
        }
    }

    /// Replaces all flags of a layer at once.
    pub fn set_flags(&mut self, id: LayerId, flags: LayerFlags) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        let old = self.props[idx as usize].flags;
        if old == flags {
            return;
        }
        self.props[idx as usize].flags = flags;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Flags);
        if let Some(node) = self.owned_node(TreeType::Scroll, id) {
            let data = &mut self.property_trees.scroll_tree.node_mut(node).data;
            data.user_scrollable_horizontal = flags.user_scrollable_horizontal;
            data.user_scrollable_vertical = flags.user_scrollable_vertical;
        }
        self.property_changed(idx, old.structural_change(&flags));
    }

    /// Sets whether a layer clips its subtree to its bounds.
    pub fn set_masks_to_bounds(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.masks_to_bounds = value);
    }

    /// Sets whether a layer's content is fully opaque.
    pub fn set_contents_opaque(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.contents_opaque = value);
    }

    /// Sets whether a layer draws its back face.
    pub fn set_double_sided(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.double_sided = value);
    }

    /// Sets whether children inherit a flattened transform.
    pub fn set_should_flatten_transform(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.should_flatten_transform = value);
    }

    /// Sets whether a layer has content of its own.
    pub fn set_is_drawable(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.is_drawable = value);
    }

    /// Sets whether a layer and its subtree are hidden.
    pub fn set_hide_layer_and_subtree(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.hide_layer_and_subtree = value);
    }

    /// Sets whether a layer always owns a render surface.
    pub fn set_force_render_surface(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.force_render_surface = value);
    }

    /// Sets whether a layer is a container for fixed-position descendants.
    pub fn set_is_container_for_fixed_position_layers(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.is_container_for_fixed_position_layers = value);
    }

    /// Sets whether a layer is fixed to its fixed-position container.
    pub fn set_fixed_position(&mut self, id: LayerId, value: bool) {
        self.update_flags(id, |f| f.fixed_position = value);
    }

    /// Sets which axes the user may scroll.
    pub fn set_user_scrollable(&mut self, id: LayerId, horizontal: bool, vertical: bool) {
        self.update_flags(id, |f| {
            f.user_scrollable_horizontal = horizontal;
            f.user_scrollable_vertical = vertical;
        });
    }

    /// Sets the 3-D rendering context of a layer. 0 means none.
    pub fn set_sorting_context_id(&mut self, id: LayerId, context: i32) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        if self.props[idx as usize].sorting_context_id == context {
            return;
        }
        self.props[idx as usize].sorting_context_id = context;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Flags);
        self.property_changed(idx, true);
    }

    /// Sets the scroll offset of a layer. Never rebuilds.
    pub fn set_scroll_offset(&mut self, id: LayerId, offset: Vec2) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        if self.props[idx as usize].scroll_offset == offset {
            return;
        }
        self.props[idx as usize].scroll_offset = offset;
        self.property_trees.set_scroll_offset(id, offset);
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Scroll);
        self.property_changed(idx, false);
    }

    /// Sets the layer whose bounds clip this layer's scrolling. A layer with
    /// a scroll clip layer is scrollable.
    pub fn set_scroll_clip_layer(&mut self, id: LayerId, clip_layer: Option<LayerId>) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        if self.props[idx as usize].scroll_clip_layer == clip_layer {
            return;
        }
        self.props[idx as usize].scroll_clip_layer = clip_layer;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Scroll);
        self.property_changed(idx, true);
    }

    /// Sets the reasons scrolling must happen on the main thread.
    pub fn set_main_thread_scrolling_reasons(&mut self, id: LayerId, reasons: u32) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        let old = self.props[idx as usize].main_thread_scrolling_reasons;
        if old == reasons {
            return;
        }
        self.props[idx as usize].main_thread_scrolling_reasons = reasons;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Scroll);
        let node = self
            .owned_node(TreeType::Scroll, id)
            .filter(|_| (old == 0) == (reasons == 0));
        if let Some(node) = node {
            self.property_trees
                .scroll_tree
                .node_mut(node)
                .data
                .main_thread_scrolling_reasons = reasons;
            self.property_changed(idx, false);
        } else {
            self.property_changed(idx, true);
        }
    }

    /// Sets the area where scrolling cannot be handled off the main thread.
    pub fn set_non_fast_scrollable_region(&mut self, id: LayerId, region: Region) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        let p = &mut self.props[idx as usize];
        if p.non_fast_scrollable_region == region {
            return;
        }
        let rebuild = p.non_fast_scrollable_region.is_empty() != region.is_empty();
        p.non_fast_scrollable_region = region;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Scroll);
        self.property_changed(idx, rebuild);
    }

    /// Sets the area with touch handlers.
    pub fn set_touch_event_handler_region(&mut self, id: LayerId, region: Region) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        if self.props[idx as usize].touch_event_handler_region == region {
            return;
        }
        self.props[idx as usize].touch_event_handler_region = region;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Scroll);
        self.property_changed(idx, false);
    }

    /// Sets the filters applied to a layer's rendered subtree.
    pub fn set_filters(&mut self, id: LayerId, filters: FilterOperations) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        let p = &mut self.props[idx as usize];
        if p.filters == filters {
            return;
        }
        let rebuild = p.filters.is_empty() != filters.is_empty();
        p.filters = filters;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Filters);
        self.property_changed(idx, rebuild);
    }

    /// Sets the filters applied to what is behind a layer.
    pub fn set_background_filters(&mut self, id: LayerId, filters: FilterOperations) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        let p = &mut self.props[idx as usize];
        if p.background_filters == filters {
            return;
        }
        let rebuild = p.background_filters.is_empty() != filters.is_empty();
        p.background_filters = filters;
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::Filters);
        self.property_changed(idx, rebuild);
    }

    /// Queues a request for a copy of the layer's rendered output.
    ///
    /// Requests covering an empty area are dropped. A pending request from
    /// the same source is replaced.
    pub fn request_copy_of_output(&mut self, id: LayerId, request: CopyOutputRequest) {
        let idx = self.slot(id);
        self.check_mutation_allowed();
        if request.is_empty() {
            return;
        }
        let queue = &mut self.copy_requests[idx as usize];
        if let Some(source) = request.source {
            queue.retain(|r| r.source != Some(source));
        }
        queue.push(request);
        #[cfg(feature = "trace-rich")]
        self.record(idx, LayerField::CopyRequests);
        self.property_changed(idx, true);
    }

    // -- Animation API --

    /// Replaces the animation signals of a layer.
    pub fn set_animation_state(&mut self, id: LayerId, state: AnimationState) {
        let idx = self.slot(id);
        if self.animation[idx as usize] == state {
            return;
        }
        self.animation[idx as usize] = state;
        self.property_changed(idx, true);
    }

    /// The animation signals of a layer.
    #[must_use]
    pub fn animation_state(&self, id: LayerId) -> AnimationState {
        self.animation[self.slot(id) as usize]
    }

    /// Returns true if an opacity animation is running on the layer.
    #[must_use]
    pub fn is_animating_opacity_property(&self, id: LayerId) -> bool {
        self.animation_state(id).is_animating_opacity
    }

    /// Returns true if a transform animation is running or may start.
    #[must_use]
    pub fn has_potentially_running_transform_animation(&self, id: LayerId) -> bool {
        self.animation_state(id).transform_can_animate()
    }

    /// Largest scale any transform animation on the layer reaches.
    #[must_use]
    pub fn maximum_target_scale(&self, id: LayerId) -> f64 {
        self.animation_state(id).maximum_target_scale
    }

    /// Applies an animated opacity without requesting a commit.
    ///
    /// # Panics
    ///
    /// Panics if `opacity` is outside `[0, 1]`.
    pub fn on_opacity_animated(&mut self, id: LayerId, opacity: f32) {
        let idx = self.slot(id);
        assert!(
            (0.0..=1.0).contains(&opacity),
            "opacity {opacity} outside [0, 1]"
        );
        self.props[idx as usize].opacity = opacity;
        if !self.set_opacity_in_place(id, opacity) {
            self.property_trees.set_needs_rebuild(true);
        }
    }

    /// Applies an animated transform without requesting a commit.
    pub fn on_transform_animated(&mut self, id: LayerId, transform: Transform3d) {
        let idx = self.slot(id);
        self.props[idx as usize].transform = transform;
        if !self.set_local_transform_in_place(id, transform) {
            self.property_trees.set_needs_rebuild(true);
        }
    }

    /// Applies animated filters without requesting a commit.
    pub fn on_filter_animated(&mut self, id: LayerId, filters: FilterOperations) {
        let idx = self.slot(id);
        let p = &mut self.props[idx as usize];
        if p.filters.is_empty() != filters.is_empty() {
            self.property_trees.set_needs_rebuild(true);
        }
        p.filters = filters;
    }

    // -- Paint gating --

    /// Marks the start of painting. Under strict checking, property changes
    /// panic until [`end_paint`](Self::end_paint).
    pub fn begin_paint(&mut self) {
        self.in_paint = true;
    }

    /// Marks the end of painting.
    pub fn end_paint(&mut self) {
        self.in_paint = false;
    }

    /// Returns true if property changes are currently allowed.
    #[must_use]
    pub fn is_property_change_allowed(&self) -> bool {
        !self.settings.strict_layer_property_change_checking || !self.in_paint
    }

    // -- Commit state --

    /// Returns true if something changed since the last push.
    #[must_use]
    pub fn needs_commit(&self) -> bool {
        self.needs_commit
    }

    /// Returns true if the next push must resync the impl tree's structure.
    #[must_use]
    pub fn needs_full_tree_sync(&self) -> bool {
        self.needs_full_tree_sync
    }

    /// Number of pushes so far.
    #[must_use]
    pub fn source_frame_number(&self) -> u64 {
        self.source_frame_number
    }

    // -- Cached property-tree indices --

    /// Transform node of a layer, or [`NO_NODE`] if the trees were rebuilt
    /// since the index was cached.
    #[must_use]
    pub fn transform_tree_index(&self, id: LayerId) -> NodeId {
        self.current_indices(id).map_or(NO_NODE, |t| t.transform)
    }

    /// Clip node of a layer, or [`NO_NODE`] if stale.
    #[must_use]
    pub fn clip_tree_index(&self, id: LayerId) -> NodeId {
        self.current_indices(id).map_or(NO_NODE, |t| t.clip)
    }

    /// Effect node of a layer, or [`NO_NODE`] if stale.
    #[must_use]
    pub fn effect_tree_index(&self, id: LayerId) -> NodeId {
        self.current_indices(id).map_or(NO_NODE, |t| t.effect)
    }

    /// Scroll node of a layer, or [`NO_NODE`] if stale.
    #[must_use]
    pub fn scroll_tree_index(&self, id: LayerId) -> NodeId {
        self.current_indices(id).map_or(NO_NODE, |t| t.scroll)
    }

    /// Offset of a layer's origin within its transform node's space.
    #[must_use]
    pub fn offset_to_transform_parent(&self, id: LayerId) -> Vec2 {
        self.offset_to_transform_parent[self.slot(id) as usize]
    }

    // -- Internal helpers --

    /// Returns the slot of `id`, panicking if it is unknown.
    pub(crate) fn slot(&self, id: LayerId) -> u32 {
        match self.slot_of.get(&id) {
            Some(&idx) => idx,
            None => panic!("unknown LayerId: {id:?}"),
        }
    }

    pub(crate) fn id_at(&self, idx: u32) -> Option<LayerId> {
        (idx != INVALID).then(|| self.id[idx as usize])
    }

    pub(crate) fn draws_content_at(&self, idx: u32) -> bool {
        let p = &self.props[idx as usize];
        p.flags.is_drawable && p.bounds.width > 0.0 && p.bounds.height > 0.0
    }

    fn current_indices(&self, id: LayerId) -> Option<TreeIndices> {
        let t = self.tree_indices[self.slot(id) as usize];
        (t.sequence_number == self.property_trees.sequence_number()
            && !self.property_trees.needs_rebuild())
        .then_some(t)
    }

    /// Node `owner` owns in `tree`, if the trees are current.
    fn owned_node(&self, tree: TreeType, owner: LayerId) -> Option<NodeId> {
        if self.property_trees.needs_rebuild() {
            return None;
        }
        self.property_trees.owned_node(tree, owner)
    }

    fn set_local_transform_in_place(&mut self, id: LayerId, transform: Transform3d) -> bool {
        let Some(node) = self.owned_node(TreeType::Transform, id) else {
            return false;
        };
        let tree = &mut self.property_trees.transform_tree;
        tree.node_mut(node).data.set_local(transform);
        tree.set_needs_update(true);
        true
    }

    fn set_opacity_in_place(&mut self, id: LayerId, opacity: f32) -> bool {
        self.owned_node(TreeType::Effect, id).is_some()
            && self.property_trees.set_opacity(id, opacity)
    }

    fn update_flags(&mut self, id: LayerId, f: impl FnOnce(&mut LayerFlags)) {
        let mut flags = self.flags(id);
        f(&mut flags);
        self.set_flags(id, flags);
    }

    fn check_mutation_allowed(&self) {
        assert!(
            self.is_property_change_allowed(),
            "property change not allowed during paint"
        );
    }

    fn check_no_cycle(&self, parent: u32, child: u32) {
        assert!(
            parent != child && !self.has_ancestor_slot(parent, child),
            "cannot attach {:?} below its own descendant {:?}",
            self.id[child as usize],
            self.id[parent as usize]
        );
    }

    fn has_ancestor_slot(&self, idx: u32, candidate: u32) -> bool {
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            if p == candidate {
                return true;
            }
            p = self.parent[p as usize];
        }
        false
    }

    /// Records a property change for the next push.
    fn property_changed(&mut self, idx: u32, rebuild: bool) {
        self.needs_commit = true;
        self.dirty.mark(idx, dirty::PROPERTIES);
        if rebuild {
            self.property_trees.set_needs_rebuild(true);
        }
    }

    /// Records a structural change under `idx` (or at the root slot when
    /// `idx` is [`INVALID`]).
    fn topology_changed(&mut self, idx: u32) {
        if idx != INVALID {
            self.dirty.mark(idx, dirty::TOPOLOGY);
            #[cfg(feature = "trace-rich")]
            self.record(idx, LayerField::Topology);
        }
        self.needs_full_tree_sync = true;
        self.needs_commit = true;
        self.property_trees.set_needs_rebuild(true);
    }

    #[cfg(feature = "trace-rich")]
    fn record(&mut self, idx: u32, field: LayerField) {
        self.pending_changes.push(LayerChange {
            layer: self.id[idx as usize],
            field,
        });
    }

    fn set_dependent(&mut self, owner: LayerId, layer: Option<LayerId>, role: LayerRole) {
        let o = self.slot(owner);
        self.check_mutation_allowed();
        let new = layer.map_or(INVALID, |l| self.slot(l));
        let current = match role {
            LayerRole::Mask => self.mask[o as usize],
            _ => self.replica[o as usize],
        };
        if current == new {
            return;
        }
        if new != INVALID {
            self.check_no_cycle(o, new);
            assert!(new != self.root, "root layer cannot have a parent");
        }
        if current != INVALID {
            self.detach(current);
        }
        if new != INVALID {
            if self.parent[new as usize] != INVALID {
                self.detach(new);
            }
            self.parent[new as usize] = o;
            self.role[new as usize] = role;
            match role {
                LayerRole::Mask => self.mask[o as usize] = new,
                _ => self.replica[o as usize] = new,
            }
            self.attach_dependencies(o, new);
        }
        self.topology_changed(o);
        self.sync_host_registration();
    }

    /// Links `c` into `p`'s child list before `before` (or last).
    fn link_child(&mut self, p: u32, c: u32, before: u32) {
        self.parent[c as usize] = p;
        self.role[c as usize] = LayerRole::Child;
        self.next_sibling[c as usize] = before;
        if before == INVALID {
            let mut last = self.first_child[p as usize];
            if last == INVALID {
                self.first_child[p as usize] = c;
                self.prev_sibling[c as usize] = INVALID;
            } else {
                while self.next_sibling[last as usize] != INVALID {
                    last = self.next_sibling[last as usize];
                }
                self.next_sibling[last as usize] = c;
                self.prev_sibling[c as usize] = last;
            }
        } else {
            let prev = self.prev_sibling[before as usize];
            self.prev_sibling[c as usize] = prev;
            if prev == INVALID {
                self.first_child[p as usize] = c;
            } else {
                self.next_sibling[prev as usize] = c;
            }
            self.prev_sibling[before as usize] = c;
        }
    }

    fn attach_dependencies(&mut self, p: u32, c: u32) {
        let _ = self.dirty.add_dependency(c, p, dirty::HOST);
        self.dirty.mark_with(c, dirty::HOST, &EagerPolicy);
    }

    /// Removes `idx` from its parent's child list, mask slot, or replica slot,
    /// in that order of precedence.
    fn detach(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        if self.mask[p as usize] == idx {
            self.mask[p as usize] = INVALID;
        } else if self.replica[p as usize] == idx {
            self.replica[p as usize] = INVALID;
        } else {
            let prev = self.prev_sibling[idx as usize];
            let next = self.next_sibling[idx as usize];
            if prev != INVALID {
                self.next_sibling[prev as usize] = next;
            } else {
                self.first_child[p as usize] = next;
            }
            if next != INVALID {
                self.prev_sibling[next as usize] = prev;
            }
        }
        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
        self.role[idx as usize] = LayerRole::Child;

        self.dirty.remove_dependency(idx, p, dirty::HOST);
        self.dirty.mark_with(idx, dirty::HOST, &EagerPolicy);
        self.topology_changed(p);
    }

    /// Recomputes host registration for every layer marked on the host
    /// channel, and cuts relations of layers that just left the tree.
    pub(crate) fn sync_host_registration(&mut self) {
        let affected: Vec<u32> = self
            .dirty
            .drain(dirty::HOST)
            .affected()
            .deterministic()
            .run()
            .collect();
        let mut left = Vec::new();
        for idx in affected {
            if !self.live[idx as usize] {
                continue;
            }
            let now = self.reaches_root(idx);
            if self.attached[idx as usize] && !now {
                left.push(idx);
            }
            self.attached[idx as usize] = now;
        }
        for idx in left {
            let id = self.id[idx as usize];
            self.property_trees.remove_id_from_id_to_index_maps(id);
            self.cut_relations(idx, true);
        }
    }

    fn reaches_root(&self, mut idx: u32) -> bool {
        if self.root == INVALID {
            return false;
        }
        loop {
            if idx == self.root {
                return true;
            }
            idx = self.parent[idx as usize];
            if idx == INVALID {
                return false;
            }
        }
    }

    /// Clears scroll and clip relations of `idx` in both directions. With
    /// `only_attached`, relations to detached layers are kept.
    fn cut_relations(&mut self, idx: u32, only_attached: bool) {
        let keep = |tree: &Self, other: LayerId| {
            only_attached
                && tree
                    .slot_of
                    .get(&other)
                    .is_none_or(|&o| !tree.attached[o as usize])
        };
        if let Some(p) = self.props[idx as usize].scroll_parent {
            if !keep(self, p) {
                self.relink_scroll_parent(idx, None);
                self.property_changed(idx, true);
            }
        }
        if let Some(p) = self.props[idx as usize].clip_parent {
            if !keep(self, p) {
                self.relink_clip_parent(idx, None);
                self.property_changed(idx, true);
            }
        }
        for child in self.scroll_children[idx as usize].clone() {
            if !keep(self, child) {
                let c = self.slot(child);
                self.relink_scroll_parent(c, None);
                self.property_changed(c, true);
            }
        }
        for child in self.clip_children[idx as usize].clone() {
            if !keep(self, child) {
                let c = self.slot(child);
                self.relink_clip_parent(c, None);
                self.property_changed(c, true);
            }
        }
    }

    fn relink_scroll_parent(&mut self, idx: u32, parent: Option<LayerId>) {
        let id = self.id[idx as usize];
        if let Some(old) = self.props[idx as usize].scroll_parent {
            if let Some(&o) = self.slot_of.get(&old) {
                self.scroll_children[o as usize].retain(|&c| c != id);
            }
        }
        if let Some(new) = parent {
            let n = self.slot(new);
            self.scroll_children[n as usize].push(id);
        }
        self.props[idx as usize].scroll_parent = parent;
    }

    fn relink_clip_parent(&mut self, idx: u32, parent: Option<LayerId>) {
        let id = self.id[idx as usize];
        if let Some(old) = self.props[idx as usize].clip_parent {
            if let Some(&o) = self.slot_of.get(&old) {
                self.clip_children[o as usize].retain(|&c| c != id);
            }
        }
        if let Some(new) = parent {
            let n = self.slot(new);
            self.clip_children[n as usize].push(id);
        }
        self.props[idx as usize].clip_parent = parent;
    }

    fn reset_slot(&mut self, idx: u32, id: LayerId) {
        let i = idx as usize;
        self.id[i] = id;
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.mask[i] = INVALID;
        self.replica[i] = INVALID;
        self.role[i] = LayerRole::Child;
        self.props[i] = LayerProperties::default();
        self.animation[i] = AnimationState::default();
        self.copy_requests[i].clear();
        self.scroll_children[i].clear();
        self.clip_children[i].clear();
        self.attached[i] = false;
        self.tree_indices[i] = TreeIndices::default();
        self.offset_to_transform_parent[i] = Vec2::ZERO;
        self.has_render_surface[i] = false;
        self.draw_properties[i] = DrawProperties::default();
        self.render_surfaces[i] = None;
        self.live[i] = true;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::commit::ImplLayerTree;
    use crate::trace::Tracer;

    fn tree_with_root() -> (LayerTree, LayerId) {
        let mut tree = LayerTree::default();
        let root = tree.create_layer();
        tree.set_root_layer(Some(root));
        (tree, root)
    }

    fn commit(tree: &mut LayerTree) {
        let mut impl_tree = ImplLayerTree::new();
        tree.push_properties_to(&mut impl_tree, &mut Tracer::none());
        tree.build_property_trees();
    }

    #[test]
    fn ids_are_monotonic_from_one() {
        let mut tree = LayerTree::default();
        let a = tree.create_layer();
        let b = tree.create_layer();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        tree.destroy_layer(a);
        let c = tree.create_layer();
        assert_eq!(c.get(), 3);
        assert!(!tree.contains(a));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn shared_allocator_spans_trees() {
        let ids = Rc::new(LayerIdAllocator::new());
        let mut a = LayerTree::with_allocator(LayerTreeSettings::new(), Rc::clone(&ids));
        let mut b = LayerTree::with_allocator(LayerTreeSettings::new(), ids);
        assert_ne!(a.create_layer(), b.create_layer());
    }

    #[test]
    fn add_child_and_query() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let b = tree.create_layer();
        tree.add_child(root, a);
        tree.add_child(root, b);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b]);
        assert!(tree.is_attached(a));
        assert!(tree.has_ancestor(a, root));
        assert!(!tree.has_ancestor(root, a));
    }

    #[test]
    fn insert_child_clamps_and_moves() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let b = tree.create_layer();
        let c = tree.create_layer();
        tree.insert_child(root, a, 10);
        tree.insert_child(root, b, 0);
        tree.insert_child(root, c, 1);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![b, c, a]);

        let other = tree.create_layer();
        tree.add_child(root, other);
        tree.insert_child(other, c, 0);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![b, a, other]);
        assert_eq!(tree.parent(c), Some(other));
    }

    #[test]
    #[should_panic(expected = "below its own descendant")]
    fn cycles_are_rejected() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let b = tree.create_layer();
        tree.add_child(root, a);
        tree.add_child(a, b);
        tree.add_child(b, a);
    }

    #[test]
    #[should_panic(expected = "below its own descendant")]
    fn self_parenting_is_rejected() {
        let mut tree = LayerTree::default();
        let a = tree.create_layer();
        tree.set_parent(a, Some(a));
    }

    #[test]
    fn replace_child_keeps_position() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let b = tree.create_layer();
        let c = tree.create_layer();
        let d = tree.create_layer();
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(root, c);
        tree.replace_child(root, b, d);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, d, c]);
        assert_eq!(tree.parent(b), None);
        assert!(!tree.is_attached(b));

        tree.replace_child(root, d, d);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, d, c]);
    }

    #[test]
    fn replace_child_with_sibling_takes_its_place() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let b = tree.create_layer();
        let c = tree.create_layer();
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(root, c);
        tree.replace_child(root, c, a);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![b, a]);
        assert!(!tree.is_attached(c));
    }

    #[test]
    fn replace_child_with_ancestor_leaves_tree_unchanged() {
        extern crate std;
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let (mut tree, root) = tree_with_root();
        let outer = tree.create_layer();
        let inner = tree.create_layer();
        let leaf = tree.create_layer();
        tree.add_child(root, outer);
        tree.add_child(outer, inner);
        tree.add_child(inner, leaf);

        let result = catch_unwind(AssertUnwindSafe(|| tree.replace_child(inner, leaf, outer)));
        assert!(result.is_err());
        assert_eq!(tree.children(inner).collect::<Vec<_>>(), vec![leaf]);
        assert_eq!(tree.parent(leaf), Some(inner));
        assert_eq!(tree.parent(outer), Some(root));
        assert!(tree.is_attached(leaf));
    }

    #[test]
    #[should_panic(expected = "below its own descendant")]
    fn replace_child_with_ancestor_panics() {
        let (mut tree, root) = tree_with_root();
        let outer = tree.create_layer();
        let leaf = tree.create_layer();
        tree.add_child(root, outer);
        tree.add_child(outer, leaf);
        tree.replace_child(outer, leaf, root);
    }

    #[test]
    #[should_panic(expected = "is not a child of")]
    fn replace_non_child_panics() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let b = tree.create_layer();
        tree.replace_child(root, a, b);
    }

    #[test]
    fn mask_and_replica_are_not_children() {
        let (mut tree, root) = tree_with_root();
        let owner = tree.create_layer();
        let mask = tree.create_layer();
        let replica = tree.create_layer();
        tree.add_child(root, owner);
        tree.set_mask_layer(owner, Some(mask));
        tree.set_replica_layer(owner, Some(replica));
        assert_eq!(tree.children(owner).count(), 0);
        assert_eq!(tree.parent(mask), Some(owner));
        assert_eq!(tree.role(mask), LayerRole::Mask);
        assert!(tree.is_attached(replica));

        tree.remove_from_parent(mask);
        assert_eq!(tree.mask_layer(owner), None);
        assert_eq!(tree.replica_layer(owner), Some(replica));
        assert!(!tree.is_attached(mask));
    }

    #[test]
    fn setting_a_mask_detaches_previous_occupant() {
        let (mut tree, root) = tree_with_root();
        let owner = tree.create_layer();
        let first = tree.create_layer();
        let second = tree.create_layer();
        tree.add_child(root, owner);
        tree.add_child(root, second);
        tree.set_mask_layer(owner, Some(first));
        tree.set_mask_layer(owner, Some(second));
        assert_eq!(tree.parent(first), None);
        assert_eq!(tree.mask_layer(owner), Some(second));
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![owner]);
    }

    #[test]
    fn setters_short_circuit_on_equal_values() {
        let (mut tree, root) = tree_with_root();
        tree.set_bounds(root, Size::new(10.0, 10.0));
        tree.set_opacity(root, 0.5);
        commit(&mut tree);
        assert!(!tree.needs_commit());
        assert!(!tree.property_trees().needs_rebuild());

        tree.set_bounds(root, Size::new(10.0, 10.0));
        tree.set_opacity(root, 0.5);
        tree.set_position(root, Point::ORIGIN);
        tree.set_transform(root, Transform3d::IDENTITY);
        tree.set_blend_mode(root, BlendMode::SrcOver);
        tree.set_flags(root, LayerFlags::default());
        tree.set_scroll_offset(root, Vec2::ZERO);
        assert!(!tree.needs_commit());
        assert!(!tree.property_trees().needs_rebuild());
    }

    #[test]
    fn opacity_crossing_one_rebuilds() {
        let (mut tree, root) = tree_with_root();
        let child = tree.create_layer();
        tree.add_child(root, child);
        tree.set_opacity(child, 0.5);
        commit(&mut tree);

        tree.set_opacity(child, 0.25);
        assert!(tree.needs_commit());
        assert!(!tree.property_trees().needs_rebuild());

        tree.set_opacity(child, 1.0);
        assert!(tree.property_trees().needs_rebuild());
    }

    #[test]
    fn transform_class_change_rebuilds() {
        let (mut tree, root) = tree_with_root();
        let child = tree.create_layer();
        tree.add_child(root, child);
        tree.set_transform(child, Transform3d::from_scale(2.0, 2.0, 1.0));
        commit(&mut tree);

        tree.set_transform(child, Transform3d::from_scale(3.0, 3.0, 1.0));
        assert!(!tree.property_trees().needs_rebuild());

        tree.set_transform(child, Transform3d::from_rotation_z(0.3));
        assert!(tree.property_trees().needs_rebuild());
    }

    #[test]
    fn scroll_offset_never_rebuilds() {
        let (mut tree, root) = tree_with_root();
        let scroller = tree.create_layer();
        tree.add_child(root, scroller);
        tree.set_scroll_clip_layer(scroller, Some(root));
        commit(&mut tree);

        tree.set_scroll_offset(scroller, Vec2::new(0.0, 25.0));
        assert!(!tree.property_trees().needs_rebuild());
        assert!(tree.property_trees().transform_tree.needs_update());
    }

    #[test]
    #[should_panic(expected = "outside [0, 1]")]
    fn opacity_out_of_range_panics() {
        let (mut tree, root) = tree_with_root();
        tree.set_opacity(root, 1.5);
    }

    #[test]
    #[should_panic(expected = "is not allowed on layers")]
    fn porter_duff_blend_mode_panics() {
        let (mut tree, root) = tree_with_root();
        tree.set_blend_mode(root, BlendMode::Xor);
    }

    #[test]
    #[should_panic(expected = "property change not allowed during paint")]
    fn strict_checking_rejects_changes_during_paint() {
        let mut tree = LayerTree::new(LayerTreeSettings::strict());
        let root = tree.create_layer();
        tree.begin_paint();
        tree.set_bounds(root, Size::new(1.0, 1.0));
    }

    #[test]
    fn relaxed_checking_allows_changes_during_paint() {
        let mut tree = LayerTree::default();
        let root = tree.create_layer();
        tree.begin_paint();
        tree.set_bounds(root, Size::new(1.0, 1.0));
        tree.end_paint();
        assert_eq!(tree.bounds(root), Size::new(1.0, 1.0));
    }

    #[test]
    fn relations_keep_forward_sets() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let b = tree.create_layer();
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.set_clip_parent(b, Some(a));
        tree.set_scroll_parent(b, Some(a));
        assert_eq!(tree.clip_children(a), &[b]);
        assert_eq!(tree.scroll_children(a), &[b]);

        tree.set_clip_parent(b, None);
        assert!(tree.clip_children(a).is_empty());
        assert_eq!(tree.clip_parent(b), None);
    }

    #[test]
    fn leaving_the_tree_cuts_crossing_relations() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let inner = tree.create_layer();
        let b = tree.create_layer();
        tree.add_child(root, a);
        tree.add_child(a, inner);
        tree.add_child(root, b);
        tree.set_scroll_parent(b, Some(a));
        tree.set_clip_parent(inner, Some(a));

        tree.remove_from_parent(a);
        assert_eq!(tree.scroll_parent(b), None);
        assert!(tree.scroll_children(a).is_empty());
        // Both ends left together.
        assert_eq!(tree.clip_parent(inner), Some(a));
    }

    #[test]
    fn destroy_clears_relations() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        let b = tree.create_layer();
        tree.add_child(root, b);
        tree.set_scroll_parent(b, Some(a));
        tree.destroy_layer(a);
        assert_eq!(tree.scroll_parent(b), None);
    }

    #[test]
    #[should_panic(expected = "cannot destroy attached layer")]
    fn destroying_attached_layer_panics() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_layer();
        tree.add_child(root, a);
        tree.destroy_layer(a);
    }

    #[test]
    #[should_panic(expected = "unknown LayerId")]
    fn destroyed_ids_stop_resolving() {
        let mut tree = LayerTree::default();
        let a = tree.create_layer();
        tree.destroy_layer(a);
        let _ = tree.bounds(a);
    }

    #[test]
    fn copy_requests_supersede_same_source() {
        use super::super::copy::CopySource;
        use kurbo::Rect;

        let (mut tree, root) = tree_with_root();
        tree.request_copy_of_output(
            root,
            CopyOutputRequest::new().with_area(Rect::new(0.0, 0.0, 0.0, 5.0)),
        );
        assert!(tree.copy_requests(root).is_empty());

        let source = CopySource(4);
        tree.request_copy_of_output(root, CopyOutputRequest::new().with_source(source));
        tree.request_copy_of_output(
            root,
            CopyOutputRequest::new()
                .with_source(source)
                .with_area(Rect::new(0.0, 0.0, 5.0, 5.0)),
        );
        tree.request_copy_of_output(root, CopyOutputRequest::new());
        assert_eq!(tree.copy_requests(root).len(), 2);
        assert_eq!(
            tree.copy_requests(root)[0].area,
            Some(Rect::new(0.0, 0.0, 5.0, 5.0))
        );
    }

    #[test]
    fn stale_tree_indices_read_as_absent() {
        let (mut tree, root) = tree_with_root();
        tree.build_property_trees();
        assert_ne!(tree.transform_tree_index(root), NO_NODE);
        tree.set_sorting_context_id(root, 3);
        assert_eq!(tree.transform_tree_index(root), NO_NODE);
        tree.build_property_trees();
        assert_ne!(tree.effect_tree_index(root), NO_NODE);
    }

    #[test]
    fn animated_opacity_does_not_request_commit() {
        let (mut tree, root) = tree_with_root();
        let child = tree.create_layer();
        tree.add_child(root, child);
        tree.set_animation_state(
            child,
            AnimationState {
                is_animating_opacity: true,
                ..AnimationState::default()
            },
        );
        commit(&mut tree);
        tree.on_opacity_animated(child, 0.3);
        assert!(!tree.needs_commit());
        assert_eq!(tree.opacity(child), 0.3);
        assert!(tree.is_animating_opacity_property(child));
    }
}
