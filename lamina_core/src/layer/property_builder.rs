// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building the four property trees from the layer tree.
//!
//! The builder walks attached layers in paint order and decides, per layer
//! and per tree, whether the layer introduces new state. Layers that do not
//! share their nearest ancestor's node; for transforms they also record the
//! offset of their origin inside that node's space.
//!
//! Clip and scroll parents may come later in paint order than the layers
//! that refer to them, so the walk defers a layer until every layer it
//! depends on has been visited. References that can never be satisfied
//! (relation cycles) are ignored.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Vec2;

use super::id::{INVALID, LayerId};
use super::props::{LayerRole, TreeIndices};
use super::store::LayerTree;
use crate::property_trees::{
    ClipNode, EffectNode, NodeId, ROOT_NODE, ScrollNode, TransformNode, TreeType,
};
use crate::settings::CalcDrawPropsInputs;
use crate::trace::{PhaseKind, PropertyTreesBuiltEvent, Tracer};
use crate::transform::Transform3d;

/// Per-build scratch state, indexed by slot.
struct BuildScratch {
    visited: Vec<bool>,
    drawing_descendants: Vec<u32>,
    copies_in_subtree: Vec<usize>,
    /// Nearest strict ancestor that contains fixed-position layers.
    fixed_container: Vec<u32>,
    /// Sum of positions from the fixed container (exclusive) down.
    offset_from_container: Vec<Vec2>,
    /// Relations that were ignored to break a dependency cycle.
    ignore_relations: Vec<bool>,
}

impl LayerTree {
    /// Rebuilds the property trees from the attached layers.
    ///
    /// Called automatically by [`calculate_draw_properties`] when a
    /// structural change happened; exposed for callers that only need node
    /// indices.
    ///
    /// [`calculate_draw_properties`]: Self::calculate_draw_properties
    pub fn build_property_trees(&mut self) {
        self.build_property_trees_traced(&mut Tracer::none());
    }

    /// Like [`build_property_trees`](Self::build_property_trees), reporting
    /// to `tracer`.
    pub fn build_property_trees_traced(&mut self, tracer: &mut Tracer<'_>) {
        let frame = self.source_frame_number;
        tracer.phase_begin(frame, PhaseKind::BuildPropertyTrees);

        self.sync_host_registration();
        self.property_trees.clear();
        let sequence_number = self.property_trees.bump_sequence_number();
        self.scroll_clip_layers.clear();
        self.has_fixed_position_layers = false;

        if self.root != INVALID {
            let order = self.subtree_slots(self.root);
            let mut scratch = BuildScratch {
                visited: vec![false; self.len as usize],
                drawing_descendants: vec![0; self.len as usize],
                copies_in_subtree: vec![0; self.len as usize],
                fixed_container: vec![INVALID; self.len as usize],
                offset_from_container: vec![Vec2::ZERO; self.len as usize],
                ignore_relations: vec![false; self.len as usize],
            };
            self.count_subtree(self.root, &mut scratch);
            for &idx in &order {
                self.has_render_surface[idx as usize] =
                    self.should_own_render_surface(idx, &scratch);
            }

            let inputs = self.inputs.unwrap_or_else(|| {
                CalcDrawPropsInputs::new(self.props[self.root as usize].bounds)
            });
            self.walk_deferred(order.clone(), &inputs, &mut scratch, sequence_number);
            self.mark_unclipped_descendants(&order, &scratch);
        }

        self.property_trees.set_needs_rebuild(false);
        self.property_trees.set_needs_update_all();

        tracer.property_trees_built(&PropertyTreesBuiltEvent {
            sequence_number,
            transform_nodes: self.property_trees.transform_tree.len(),
            clip_nodes: self.property_trees.clip_tree.len(),
            effect_nodes: self.property_trees.effect_tree.len(),
            scroll_nodes: self.property_trees.scroll_tree.len(),
        });
        tracer.phase_end(frame, PhaseKind::BuildPropertyTrees);
    }

    /// Fills drawing-descendant and copy-request rollups for the subtree.
    fn count_subtree(&self, idx: u32, scratch: &mut BuildScratch) {
        let mut drawing = 0;
        let mut copies = self.copy_requests[idx as usize].len();
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.count_subtree(child, scratch);
            drawing += scratch.drawing_descendants[child as usize]
                + u32::from(self.draws_content_at(child));
            copies += scratch.copies_in_subtree[child as usize];
            child = self.next_sibling[child as usize];
        }
        scratch.drawing_descendants[idx as usize] = drawing;
        scratch.copies_in_subtree[idx as usize] = copies;
    }

    fn should_own_render_surface(&self, idx: u32, scratch: &BuildScratch) -> bool {
        if idx == self.root {
            return true;
        }
        if self.role[idx as usize] != LayerRole::Child
            || !self.settings.can_render_to_separate_surface
        {
            return false;
        }
        let p = &self.props[idx as usize];
        let anim = &self.animation[idx as usize];
        let draws_below = scratch.drawing_descendants[idx as usize] > 0;

        p.flags.force_render_surface
            || self.mask[idx as usize] != INVALID
            || self.replica[idx as usize] != INVALID
            || !p.filters.is_empty()
            || !p.background_filters.is_empty()
            || p.blend_mode.is_non_default()
            || ((p.opacity != 1.0 || anim.opacity_can_animate()) && draws_below)
            || (p.flags.should_flatten_transform && p.sorting_context_id != 0 && draws_below)
            || !self.copy_requests[idx as usize].is_empty()
            || (p.flags.masks_to_bounds
                && !p.transform.preserves_2d_axis_alignment()
                && draws_below)
    }

    /// Visits `order`, deferring layers whose clip or scroll parent has not
    /// been visited yet.
    fn walk_deferred(
        &mut self,
        mut pending: Vec<u32>,
        inputs: &CalcDrawPropsInputs,
        scratch: &mut BuildScratch,
        sequence_number: u64,
    ) {
        while !pending.is_empty() {
            let mut deferred = Vec::new();
            for idx in pending {
                if self.relations_ready(idx, scratch) {
                    self.visit(idx, inputs, scratch, sequence_number);
                } else {
                    deferred.push(idx);
                }
            }
            if let Some(&first) = deferred.first() {
                let stuck = deferred.iter().all(|&i| !self.relations_ready(i, scratch));
                if stuck {
                    // The earliest deferred layer's paint parent is always
                    // visited, so only its relations can be in the way.
                    scratch.ignore_relations[first as usize] = true;
                }
            }
            pending = deferred;
        }
    }

    fn relations_ready(&self, idx: u32, scratch: &BuildScratch) -> bool {
        let parent = self.parent[idx as usize];
        if idx != self.root && !scratch.visited[parent as usize] {
            return false;
        }
        if scratch.ignore_relations[idx as usize] {
            return true;
        }
        let p = &self.props[idx as usize];
        [p.clip_parent, p.scroll_parent]
            .into_iter()
            .flatten()
            .all(|r| self.relation_slot(r).is_none_or(|s| scratch.visited[s as usize]))
    }

    /// Slot of a relation target that takes part in the build.
    fn relation_slot(&self, id: LayerId) -> Option<u32> {
        let &s = self.slot_of.get(&id)?;
        self.attached[s as usize].then_some(s)
    }

    fn resolved_relation(
        &self,
        idx: u32,
        relation: Option<LayerId>,
        scratch: &BuildScratch,
    ) -> Option<u32> {
        if scratch.ignore_relations[idx as usize] {
            return None;
        }
        relation
            .and_then(|r| self.relation_slot(r))
            .filter(|&s| scratch.visited[s as usize])
    }

    fn visit(
        &mut self,
        idx: u32,
        inputs: &CalcDrawPropsInputs,
        scratch: &mut BuildScratch,
        sequence_number: u64,
    ) {
        scratch.visited[idx as usize] = true;
        let i = idx as usize;
        let parent = self.parent[i];

        // Masks and replicas draw in their owner's space.
        if self.role[i] != LayerRole::Child {
            self.tree_indices[i] = self.tree_indices[parent as usize];
            self.offset_to_transform_parent[i] = self.offset_to_transform_parent[parent as usize];
            return;
        }

        let is_root = idx == self.root;
        let (parent_indices, parent_offset) = if is_root {
            (
                TreeIndices {
                    transform: ROOT_NODE,
                    clip: ROOT_NODE,
                    effect: ROOT_NODE,
                    scroll: ROOT_NODE,
                    sequence_number,
                },
                Vec2::ZERO,
            )
        } else {
            (
                self.tree_indices[parent as usize],
                self.offset_to_transform_parent[parent as usize],
            )
        };

        self.track_fixed_container(idx, scratch);
        let transform = self.add_transform_node(
            idx,
            parent_indices.transform,
            parent_offset,
            inputs,
            scratch,
        );
        let clip = self.add_clip_node(idx, parent_indices.clip, transform, scratch);
        let effect = self.add_effect_node(idx, parent_indices.effect, transform, scratch);
        let scroll = self.add_scroll_node(idx, parent_indices.scroll, transform, scratch);

        self.tree_indices[i] = TreeIndices {
            transform,
            clip,
            effect,
            scroll,
            sequence_number,
        };
    }

    fn track_fixed_container(&mut self, idx: u32, scratch: &mut BuildScratch) {
        let i = idx as usize;
        let parent = self.parent[i];
        let position = self.props[i].position.to_vec2();
        if parent == INVALID {
            scratch.fixed_container[i] = INVALID;
            scratch.offset_from_container[i] = Vec2::ZERO;
            return;
        }
        let p = parent as usize;
        let parent_is_container = parent == self.root
            || self.props[p]
                .flags
                .is_container_for_fixed_position_layers;
        if parent_is_container {
            scratch.fixed_container[i] = parent;
            scratch.offset_from_container[i] = position;
        } else {
            scratch.fixed_container[i] = scratch.fixed_container[p];
            scratch.offset_from_container[i] = scratch.offset_from_container[p] + position;
        }
    }

    fn add_transform_node(
        &mut self,
        idx: u32,
        parent_node: NodeId,
        parent_offset: Vec2,
        inputs: &CalcDrawPropsInputs,
        scratch: &BuildScratch,
    ) -> NodeId {
        let i = idx as usize;
        let id = self.id[i];
        let is_root = idx == self.root;
        let parent = self.parent[i];
        let p = &self.props[i];
        let anim = self.animation[i];

        let (parent_flattens, parent_context) = if is_root {
            (true, 0)
        } else {
            let pp = &self.props[parent as usize];
            (pp.flags.should_flatten_transform, pp.sorting_context_id)
        };
        let is_3d_root = p.sorting_context_id != 0 && parent_context != p.sorting_context_id;
        let is_page_scale = inputs.page_scale_layer == Some(id);

        if p.flags.fixed_position {
            self.has_fixed_position_layers = true;
        }
        let container = scratch.fixed_container[i];
        let fixed_target = (p.flags.fixed_position && container != INVALID)
            .then(|| {
                let c = container as usize;
                (
                    self.tree_indices[c].transform,
                    self.offset_to_transform_parent[c] + scratch.offset_from_container[i],
                )
            })
            .filter(|&(node, _)| node != parent_node);

        let needs_node = is_root
            || self.has_render_surface[i]
            || !p.transform.is_2d_translation()
            || p.has_transform_origin()
            || is_3d_root
            || !p.flags.should_flatten_transform
            || !parent_flattens
            || p.is_scrollable()
            || is_page_scale
            || anim.transform_can_animate()
            || fixed_target.is_some();

        if !needs_node {
            self.offset_to_transform_parent[i] =
                parent_offset + p.position.to_vec2() + p.transform.translation_2d();
            return parent_node;
        }

        let (node_parent, offset) =
            fixed_target.unwrap_or((parent_node, parent_offset + p.position.to_vec2()));
        let pre_transform = if is_root {
            inputs.device_transform
                * Transform3d::from_scale(
                    inputs.device_scale_factor,
                    inputs.device_scale_factor,
                    1.0,
                )
        } else {
            Transform3d::IDENTITY
        };
        let scroll_offset = if p.is_scrollable() {
            p.scroll_offset
        } else {
            Vec2::ZERO
        };
        let node = TransformNode {
            local: p.transform,
            origin: p.transform_origin,
            post_local_offset: offset,
            post_local_scale: if is_page_scale {
                inputs.page_scale_factor
            } else {
                1.0
            },
            pre_transform,
            scroll_offset,
            flattens_inherited_transform: parent_flattens,
            // The root surface is the screen, which the sentinel node stands
            // for.
            has_render_surface: self.has_render_surface[i] && !is_root,
            is_page_scale_node: is_page_scale,
            is_currently_animating: anim.is_animating_transform,
            has_potential_animation: anim.has_potential_transform_animation,
            has_only_translation_animations: anim.has_only_translation_transform_animations,
            sorting_context_id: p.sorting_context_id,
            needs_local_transform_update: true,
            ..TransformNode::default()
        };
        if p.is_scrollable() {
            self.property_trees.scroll_tree.set_scroll_offset(id, scroll_offset);
        }
        let node_id = self
            .property_trees
            .transform_tree
            .insert(node, node_parent, Some(id));
        self.property_trees
            .set_owner(TreeType::Transform, id, node_id);
        self.offset_to_transform_parent[i] = Vec2::ZERO;
        node_id
    }

    fn add_clip_node(
        &mut self,
        idx: u32,
        parent_clip: NodeId,
        transform: NodeId,
        scratch: &BuildScratch,
    ) -> NodeId {
        let i = idx as usize;
        let id = self.id[i];
        let clip_parent = self.resolved_relation(idx, self.props[i].clip_parent, scratch);
        let parent_clip = clip_parent.map_or(parent_clip, |s| self.tree_indices[s as usize].clip);

        let masks = self.props[i].flags.masks_to_bounds;
        let has_surface = self.has_render_surface[i];
        if !masks && !has_surface {
            return parent_clip;
        }
        let node = ClipNode {
            clip: self.props[i].bounds_rect() + self.offset_to_transform_parent[i],
            transform_id: transform,
            applies_local_clip: masks,
            resets_clip: has_surface,
            ..ClipNode::default()
        };
        let node_id = self.property_trees.clip_tree.insert(node, parent_clip, Some(id));
        self.property_trees.set_owner(TreeType::Clip, id, node_id);
        node_id
    }

    fn add_effect_node(
        &mut self,
        idx: u32,
        parent_effect: NodeId,
        transform: NodeId,
        scratch: &BuildScratch,
    ) -> NodeId {
        let i = idx as usize;
        let id = self.id[i];
        let p = &self.props[i];
        let anim = self.animation[i];
        let has_surface = self.has_render_surface[i];
        let copies_in_subtree = scratch.copies_in_subtree[i];

        let needs_node = idx == self.root
            || has_surface
            || p.opacity != 1.0
            || anim.opacity_can_animate()
            || p.blend_mode.is_non_default()
            || !p.filters.is_empty()
            || copies_in_subtree > 0
            || p.flags.hide_layer_and_subtree;
        if !needs_node {
            return parent_effect;
        }

        let parent_context = if idx == self.root {
            0
        } else {
            self.props[self.parent[i] as usize].sorting_context_id
        };
        let node = EffectNode {
            opacity: p.opacity,
            blend_mode: p.blend_mode,
            has_render_surface: has_surface,
            hide_layer_and_subtree: p.flags.hide_layer_and_subtree,
            is_currently_animating_opacity: anim.is_animating_opacity,
            has_potential_opacity_animation: anim.has_potential_opacity_animation,
            num_copy_requests: self.copy_requests[i].len(),
            num_copy_requests_in_subtree: copies_in_subtree,
            transform_id: transform,
            double_sided: p.flags.double_sided,
            uses_accumulated_backface: p.sorting_context_id != 0
                && parent_context == p.sorting_context_id,
            local_backface_transform: p.transform.about_origin(p.transform_origin),
            transform_can_animate: anim.transform_can_animate(),
            ..EffectNode::default()
        };
        let node_id = self
            .property_trees
            .effect_tree
            .insert(node, parent_effect, Some(id));
        self.property_trees.set_owner(TreeType::Effect, id, node_id);
        node_id
    }

    fn add_scroll_node(
        &mut self,
        idx: u32,
        parent_scroll: NodeId,
        transform: NodeId,
        scratch: &BuildScratch,
    ) -> NodeId {
        let i = idx as usize;
        let id = self.id[i];
        let scroll_parent = self.resolved_relation(idx, self.props[i].scroll_parent, scratch);
        let parent_scroll =
            scroll_parent.map_or(parent_scroll, |s| self.tree_indices[s as usize].scroll);

        let p = &self.props[i];
        let needs_node = idx == self.root
            || p.is_scrollable()
            || !p.non_fast_scrollable_region.is_empty()
            || p.main_thread_scrolling_reasons != 0;
        if !needs_node {
            return parent_scroll;
        }

        let clip_bounds = p
            .scroll_clip_layer
            .and_then(|c| self.slot_of.get(&c))
            .map(|&s| self.props[s as usize].bounds)
            .unwrap_or_default();
        let node = ScrollNode {
            scrollable: p.is_scrollable(),
            bounds: p.bounds,
            scroll_clip_layer_bounds: clip_bounds,
            user_scrollable_horizontal: p.flags.user_scrollable_horizontal,
            user_scrollable_vertical: p.flags.user_scrollable_vertical,
            main_thread_scrolling_reasons: p.main_thread_scrolling_reasons,
            contains_non_fast_scrollable_region: !p.non_fast_scrollable_region.is_empty(),
            transform_id: transform,
        };
        if let Some(clip_layer) = p.scroll_clip_layer {
            self.scroll_clip_layers.insert(clip_layer);
        }
        let node_id = self
            .property_trees
            .scroll_tree
            .insert(node, parent_scroll, Some(id));
        self.property_trees.set_owner(TreeType::Scroll, id, node_id);
        node_id
    }

    /// Marks every surface between a clip child and its clip parent: those
    /// surfaces hold content that escapes their own clip.
    fn mark_unclipped_descendants(&mut self, order: &[u32], scratch: &BuildScratch) {
        for &idx in order {
            let Some(clip_parent) =
                self.resolved_relation(idx, self.props[idx as usize].clip_parent, scratch)
            else {
                continue;
            };
            let mut p = self.parent[idx as usize];
            while p != INVALID && p != clip_parent {
                if self.has_render_surface[p as usize] {
                    let owner = self.id[p as usize];
                    if let Some(node) = self.property_trees.owned_node(TreeType::Clip, owner) {
                        let clips = &mut self.property_trees.clip_tree;
                        clips.node_mut(node).data.has_unclipped_descendants = true;
                    }
                }
                p = self.parent[p as usize];
            }
        }
    }

    /// Returns true if the layer owns a render surface as of the last build.
    #[must_use]
    pub fn has_render_surface(&self, id: LayerId) -> bool {
        self.has_render_surface[self.slot(id) as usize]
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Size};

    use super::*;
    use crate::layer::{AnimationState, BlendMode, CopyOutputRequest};
    use crate::property_trees::NO_NODE;
    use crate::settings::LayerTreeSettings;

    fn drawing(tree: &mut LayerTree, parent: LayerId, size: f64) -> LayerId {
        let id = tree.create_layer();
        tree.set_bounds(id, Size::new(size, size));
        tree.set_is_drawable(id, true);
        tree.add_child(parent, id);
        id
    }

    fn with_root() -> (LayerTree, LayerId) {
        let mut tree = LayerTree::default();
        let root = tree.create_layer();
        tree.set_bounds(root, Size::new(100.0, 100.0));
        tree.set_root_layer(Some(root));
        (tree, root)
    }

    #[test]
    fn plain_layers_share_root_nodes() {
        let (mut tree, root) = with_root();
        let a = drawing(&mut tree, root, 10.0);
        tree.set_position(a, Point::new(5.0, 6.0));
        tree.build_property_trees();

        assert_eq!(tree.transform_tree_index(a), tree.transform_tree_index(root));
        assert_eq!(tree.effect_tree_index(a), tree.effect_tree_index(root));
        assert_eq!(tree.offset_to_transform_parent(a), Vec2::new(5.0, 6.0));
        // Sentinel plus the root's node.
        assert_eq!(tree.property_trees().transform_tree.len(), 2);
        assert!(tree.has_render_surface(root));
        assert!(!tree.has_render_surface(a));
    }

    #[test]
    fn opacity_promotes_only_with_drawing_descendants() {
        let (mut tree, root) = with_root();
        let empty = tree.create_layer();
        tree.add_child(root, empty);
        tree.set_opacity(empty, 0.5);

        let full = tree.create_layer();
        tree.add_child(root, full);
        tree.set_opacity(full, 0.5);
        drawing(&mut tree, full, 10.0);

        let opaque = tree.create_layer();
        tree.add_child(root, opaque);
        drawing(&mut tree, opaque, 10.0);

        tree.build_property_trees();
        assert!(!tree.has_render_surface(empty));
        assert!(tree.has_render_surface(full));
        assert!(!tree.has_render_surface(opaque));
        // Opacity alone still needs an effect node.
        assert_ne!(tree.effect_tree_index(empty), tree.effect_tree_index(root));
    }

    #[test]
    fn promotion_rules() {
        let (mut tree, root) = with_root();
        let blend = tree.create_layer();
        tree.add_child(root, blend);
        tree.set_blend_mode(blend, BlendMode::Multiply);

        let copy = tree.create_layer();
        tree.add_child(root, copy);
        tree.request_copy_of_output(copy, CopyOutputRequest::new());

        let masked = tree.create_layer();
        let mask = tree.create_layer();
        tree.add_child(root, masked);
        tree.set_mask_layer(masked, Some(mask));

        let animated = tree.create_layer();
        tree.add_child(root, animated);
        drawing(&mut tree, animated, 4.0);
        tree.set_animation_state(
            animated,
            AnimationState {
                has_potential_opacity_animation: true,
                ..AnimationState::default()
            },
        );

        tree.build_property_trees();
        assert!(tree.has_render_surface(blend));
        assert!(tree.has_render_surface(copy));
        assert!(tree.has_render_surface(masked));
        assert!(!tree.has_render_surface(mask));
        assert!(tree.has_render_surface(animated));
        assert_eq!(tree.transform_tree_index(mask), tree.transform_tree_index(masked));
    }

    #[test]
    fn single_surface_mode_only_promotes_root() {
        let mut tree = LayerTree::new(LayerTreeSettings::single_surface());
        let root = tree.create_layer();
        tree.set_root_layer(Some(root));
        let child = tree.create_layer();
        tree.add_child(root, child);
        tree.set_force_render_surface(child, true);
        tree.build_property_trees();
        assert!(tree.has_render_surface(root));
        assert!(!tree.has_render_surface(child));
    }

    #[test]
    fn transform_nodes_only_where_needed() {
        let (mut tree, root) = with_root();
        let moved = drawing(&mut tree, root, 10.0);
        tree.set_transform(moved, Transform3d::from_translation(3.0, 4.0, 0.0));
        let scaled = drawing(&mut tree, root, 10.0);
        tree.set_transform(scaled, Transform3d::from_scale(2.0, 2.0, 1.0));
        let pivoted = drawing(&mut tree, root, 10.0);
        tree.set_transform_origin(pivoted, [5.0, 5.0, 0.0]);
        tree.build_property_trees();

        assert_eq!(tree.transform_tree_index(moved), tree.transform_tree_index(root));
        assert_eq!(tree.offset_to_transform_parent(moved), Vec2::new(3.0, 4.0));
        assert_ne!(tree.transform_tree_index(scaled), tree.transform_tree_index(root));
        assert_ne!(tree.transform_tree_index(pivoted), tree.transform_tree_index(root));
    }

    #[test]
    fn masks_to_bounds_creates_clip_node() {
        let (mut tree, root) = with_root();
        let clipper = tree.create_layer();
        tree.add_child(root, clipper);
        tree.set_position(clipper, Point::new(10.0, 10.0));
        tree.set_bounds(clipper, Size::new(20.0, 20.0));
        tree.set_masks_to_bounds(clipper, true);
        let inside = drawing(&mut tree, clipper, 50.0);
        tree.build_property_trees();

        let clip = tree.clip_tree_index(clipper);
        assert_eq!(tree.clip_tree_index(inside), clip);
        let node = &tree.property_trees().clip_tree.node(clip).data;
        assert!(node.applies_local_clip);
        assert!(!node.resets_clip);
        assert_eq!(node.clip, kurbo::Rect::new(10.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn clip_parent_later_in_paint_order_resolves() {
        let (mut tree, root) = with_root();
        let clip_child = drawing(&mut tree, root, 10.0);
        let clipper = tree.create_layer();
        tree.add_child(root, clipper);
        tree.set_bounds(clipper, Size::new(5.0, 5.0));
        tree.set_masks_to_bounds(clipper, true);
        tree.set_clip_parent(clip_child, Some(clipper));
        tree.build_property_trees();
        assert_eq!(tree.clip_tree_index(clip_child), tree.clip_tree_index(clipper));
    }

    #[test]
    fn relation_cycles_are_ignored() {
        let (mut tree, root) = with_root();
        let a = drawing(&mut tree, root, 10.0);
        let b = drawing(&mut tree, root, 10.0);
        tree.set_scroll_parent(a, Some(b));
        tree.set_scroll_parent(b, Some(a));
        tree.build_property_trees();
        assert_ne!(tree.scroll_tree_index(a), NO_NODE);
        assert_ne!(tree.scroll_tree_index(b), NO_NODE);
    }

    #[test]
    fn scroll_nodes_and_offsets() {
        let (mut tree, root) = with_root();
        let scroller = tree.create_layer();
        tree.add_child(root, scroller);
        tree.set_bounds(scroller, Size::new(100.0, 300.0));
        tree.set_scroll_clip_layer(scroller, Some(root));
        tree.set_scroll_offset(scroller, Vec2::new(0.0, 40.0));
        let content = drawing(&mut tree, scroller, 10.0);
        tree.build_property_trees();

        let s = tree.scroll_tree_index(scroller);
        assert_ne!(s, tree.scroll_tree_index(root));
        assert_eq!(tree.scroll_tree_index(content), s);
        let trees = tree.property_trees();
        assert_eq!(trees.scroll_tree.max_scroll_offset(s), Vec2::new(0.0, 200.0));
        let t = tree.transform_tree_index(scroller);
        assert_eq!(
            trees.transform_tree.node(t).data.scroll_offset,
            Vec2::new(0.0, 40.0)
        );
    }

    #[test]
    fn fixed_position_skips_scroller() {
        let (mut tree, root) = with_root();
        let scroller = tree.create_layer();
        tree.add_child(root, scroller);
        tree.set_position(scroller, Point::new(0.0, 10.0));
        tree.set_scroll_clip_layer(scroller, Some(root));
        let fixed = drawing(&mut tree, scroller, 10.0);
        tree.set_position(fixed, Point::new(5.0, 5.0));
        tree.set_fixed_position(fixed, true);
        tree.build_property_trees();

        let node = tree.transform_tree_index(fixed);
        let trees = tree.property_trees();
        assert_eq!(
            trees.transform_tree.node(node).parent_id,
            tree.transform_tree_index(root)
        );
        assert_eq!(
            trees.transform_tree.node(node).data.post_local_offset,
            Vec2::new(5.0, 15.0)
        );
    }

    #[test]
    fn rebuild_bumps_sequence_number() {
        let (mut tree, _root) = with_root();
        tree.build_property_trees();
        let first = tree.property_trees().sequence_number();
        tree.build_property_trees();
        assert_eq!(tree.property_trees().sequence_number(), first + 1);
        assert!(!tree.property_trees().needs_rebuild());
    }
}
