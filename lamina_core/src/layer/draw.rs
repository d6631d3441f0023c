// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer draw properties and the pass that computes them.
//!
//! A pass runs in four phases:
//!
//! 1. the property trees are rebuilt if node membership went stale;
//! 2. the transform, effect, and clip trees recompute their outputs;
//! 3. every attached layer reads its nodes and derives the values a
//!    compositor draws it with, in the space of its render target;
//! 4. surfaces are assembled into the render surface layer list
//!    (see `surface.rs`).
//!
//! Render targets follow the layer tree: a layer draws into the surface of
//! its nearest ancestor-or-self that owns one. The root's surface is the
//! screen.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Vec2};

use super::blend::BlendMode;
use super::id::{INVALID, LayerId};
use super::props::LayerRole;
use super::store::LayerTree;
use crate::geometry::{
    calculate_visible_rect, enclosing_rect, intersect_or_empty, map_enclosing_clipped_rect,
};
use crate::property_trees::{NodeId, ROOT_NODE, SurfaceScaleInputs, TreeType, convert_clip_rect};
use crate::settings::CalcDrawPropsInputs;
use crate::trace::{DrawPropertiesEvent, PhaseKind, Tracer};
use crate::transform::Transform3d;

/// What a compositor needs to draw one layer.
///
/// Rects are in the space of the layer's render target unless noted.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawProperties {
    /// Layer space to render-target space.
    pub draw_transform: Transform3d,
    /// Layer space to screen space.
    pub screen_space_transform: Transform3d,
    /// Clip applied while drawing, when [`is_clipped`](Self::is_clipped).
    pub clip_rect: Rect,
    /// Whether [`clip_rect`](Self::clip_rect) applies. Independent of whether
    /// the rect is empty.
    pub is_clipped: bool,
    /// Part of the layer bounds that can be seen, in layer space.
    pub visible_layer_rect: Rect,
    /// Layer bounds mapped into the target.
    ///
    /// When [`is_clipped`](Self::is_clipped), this is intersected with
    /// [`clip_rect`](Self::clip_rect), which carries every ancestor clip that
    /// applies in the target.
    pub drawable_content_rect: Rect,
    /// Opacity up to, not including, the render target's own opacity.
    pub opacity: f32,
    /// Blend mode used when drawing into the target.
    pub blend_mode: BlendMode,
    /// Owner of the surface the layer draws into.
    pub render_target: Option<LayerId>,
    /// Raster scale that maps one layer pixel to one device pixel.
    pub ideal_contents_scale: f64,
    /// Largest raster scale a running transform animation will need, or 0.
    pub maximum_animation_contents_scale: f64,
    /// The layer is not hidden, transparent, back-facing, or singular.
    pub is_drawn: bool,
    /// The screen-space transform may change without a commit.
    pub screen_space_transform_is_animating: bool,
}

impl Default for DrawProperties {
    fn default() -> Self {
        Self {
            draw_transform: Transform3d::IDENTITY,
            screen_space_transform: Transform3d::IDENTITY,
            clip_rect: Rect::ZERO,
            is_clipped: false,
            visible_layer_rect: Rect::ZERO,
            drawable_content_rect: Rect::ZERO,
            opacity: 1.0,
            blend_mode: BlendMode::SrcOver,
            render_target: None,
            ideal_contents_scale: 1.0,
            maximum_animation_contents_scale: 0.0,
            is_drawn: false,
            screen_space_transform_is_animating: false,
        }
    }
}

/// Counters from one draw-properties pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawPassStats {
    /// The pass rebuilt the property trees.
    pub rebuilt_property_trees: bool,
    /// Surfaces in the render surface layer list.
    pub render_surfaces: usize,
    /// Layers that contribute to some surface in the list.
    pub drawn_layers: usize,
    /// Surfaces dropped for having nothing to draw.
    pub pruned_surfaces: usize,
}

impl LayerTree {
    /// Computes draw properties for every attached layer and rebuilds the
    /// render surface layer list.
    pub fn calculate_draw_properties(&mut self, inputs: &CalcDrawPropsInputs) -> DrawPassStats {
        self.calculate_draw_properties_traced(inputs, &mut Tracer::none())
    }

    /// Like [`calculate_draw_properties`](Self::calculate_draw_properties),
    /// reporting phases and a summary to `tracer`.
    pub fn calculate_draw_properties_traced(
        &mut self,
        inputs: &CalcDrawPropsInputs,
        tracer: &mut Tracer<'_>,
    ) -> DrawPassStats {
        let frame = self.source_frame_number;
        self.sync_host_registration();
        self.apply_inputs(inputs);

        let rebuilt = self.property_trees.needs_rebuild();
        if rebuilt {
            self.build_property_trees_traced(tracer);
        }

        tracer.phase_begin(frame, PhaseKind::UpdateTransforms);
        self.update_property_trees(inputs);
        tracer.phase_end(frame, PhaseKind::UpdateTransforms);

        tracer.phase_begin(frame, PhaseKind::ComputeDrawProperties);
        let targets = self.compute_layer_draw_properties(inputs);
        tracer.phase_end(frame, PhaseKind::ComputeDrawProperties);

        tracer.phase_begin(frame, PhaseKind::BuildSurfaceList);
        let mut stats = self.build_render_surface_layer_list(inputs, &targets);
        tracer.phase_end(frame, PhaseKind::BuildSurfaceList);
        stats.rebuilt_property_trees = rebuilt;

        tracer.draw_properties(&DrawPropertiesEvent {
            frame,
            rebuilt_property_trees: rebuilt,
            render_surfaces: stats.render_surfaces,
            drawn_layers: stats.drawn_layers,
            pruned_surfaces: stats.pruned_surfaces,
        });

        self.property_trees.transform_tree.reset_change_tracking();
        self.property_trees.effect_tree.reset_change_tracking();
        stats
    }

    /// Draw properties of `id` as of the last pass.
    ///
    /// Layers that were not attached during the last pass report the
    /// defaults, with [`is_drawn`](DrawProperties::is_drawn) false.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown.
    #[must_use]
    pub fn draw_properties(&self, id: LayerId) -> &DrawProperties {
        &self.draw_properties[self.slot(id) as usize]
    }

    /// Stores `inputs`, pushing what changed into the trees in place when
    /// membership does not depend on it.
    fn apply_inputs(&mut self, inputs: &CalcDrawPropsInputs) {
        let Some(previous) = self.inputs.replace(*inputs) else {
            self.property_trees.set_needs_rebuild(true);
            return;
        };
        if previous == *inputs || self.property_trees.needs_rebuild() {
            return;
        }
        if previous.page_scale_layer != inputs.page_scale_layer {
            self.property_trees.set_needs_rebuild(true);
            return;
        }

        let dsf = inputs.device_scale_factor;
        let root_node = self
            .id_at(self.root)
            .and_then(|root| self.property_trees.owned_node(TreeType::Transform, root));
        if let Some(node) = root_node {
            let data = &mut self.property_trees.transform_tree.node_mut(node).data;
            data.pre_transform = inputs.device_transform * Transform3d::from_scale(dsf, dsf, 1.0);
            data.needs_local_transform_update = true;
        }
        let page_scale_node = inputs
            .page_scale_layer
            .and_then(|layer| self.property_trees.owned_node(TreeType::Transform, layer));
        if let Some(node) = page_scale_node {
            let data = &mut self.property_trees.transform_tree.node_mut(node).data;
            data.post_local_scale = inputs.page_scale_factor;
            data.needs_local_transform_update = true;
        }
        self.property_trees.set_needs_update_all();
    }

    fn update_property_trees(&mut self, inputs: &CalcDrawPropsInputs) {
        let scales = SurfaceScaleInputs {
            scale_from_screen_space: self.settings.layer_transforms_should_scale_layer_contents,
            device_scale_factor: inputs.device_scale_factor,
            page_scale_factor: inputs.page_scale_factor,
        };
        let surfaces_enabled = self.settings.can_render_to_separate_surface;
        let trees = &mut self.property_trees;
        if trees.transform_tree.needs_update() {
            trees.transform_tree.update(&scales);
            trees.clip_tree.set_needs_update(true);
            trees.effect_tree.set_needs_update(true);
        }
        if trees.effect_tree.needs_update() {
            trees
                .effect_tree
                .update(&trees.transform_tree, surfaces_enabled);
        }
        if trees.clip_tree.needs_update() {
            trees
                .clip_tree
                .update(&trees.transform_tree, viewport_rect(inputs));
        }
        // Scroll nodes have no derived outputs.
        trees.scroll_tree.set_needs_update(false);
    }

    /// Fills `draw_properties` for every attached layer and returns each
    /// slot's render-target slot.
    fn compute_layer_draw_properties(&mut self, inputs: &CalcDrawPropsInputs) -> Vec<u32> {
        let mut targets = vec![INVALID; self.len as usize];
        for dp in &mut self.draw_properties {
            *dp = DrawProperties::default();
        }
        if self.root == INVALID {
            return targets;
        }
        for idx in self.subtree_slots(self.root) {
            let i = idx as usize;
            let target = if self.owns_surface(idx) {
                idx
            } else {
                targets[self.parent[i] as usize]
            };
            targets[i] = target;
            self.draw_properties[i] = self.layer_draw_properties(idx, target, inputs);
        }
        targets
    }

    pub(crate) fn owns_surface(&self, idx: u32) -> bool {
        self.has_render_surface[idx as usize] && self.role[idx as usize] == LayerRole::Child
    }

    /// Transform node whose surface space the surface owned by `slot` is.
    pub(crate) fn surface_node(&self, slot: u32) -> NodeId {
        if slot == self.root {
            ROOT_NODE
        } else {
            self.tree_indices[slot as usize].transform
        }
    }

    fn layer_draw_properties(
        &self,
        idx: u32,
        target: u32,
        inputs: &CalcDrawPropsInputs,
    ) -> DrawProperties {
        let i = idx as usize;
        let p = &self.props[i];
        let anim = &self.animation[i];
        let indices = self.tree_indices[i];
        let transforms = &self.property_trees.transform_tree;
        let tnode = transforms.node(indices.transform);
        let t = &tnode.data;
        let c = &self.property_trees.clip_tree.node(indices.clip).data;
        let e = &self.property_trees.effect_tree.node(indices.effect).data;

        let target_node = self.surface_node(target);
        let owns_surface = target == idx;
        let offset = Transform3d::from_translation_2d(self.offset_to_transform_parent[i]);

        let mut dp = DrawProperties {
            screen_space_transform: t.to_screen * offset,
            opacity: e.content_opacity,
            blend_mode: if owns_surface && self.settings.can_render_to_separate_surface {
                BlendMode::SrcOver
            } else {
                p.blend_mode
            },
            render_target: Some(self.id[target as usize]),
            screen_space_transform_is_animating: t.to_screen_is_potentially_animated,
            ..DrawProperties::default()
        };
        dp.ideal_contents_scale = if self.settings.layer_transforms_should_scale_layer_contents {
            max_scale(&dp.screen_space_transform)
        } else if t.in_page_scale_subtree {
            inputs.device_scale_factor * inputs.page_scale_factor
        } else {
            inputs.device_scale_factor
        };
        if anim.transform_can_animate() && anim.maximum_target_scale > 0.0 {
            let parent_screen = transforms
                .parent(tnode.id)
                .map_or(Transform3d::IDENTITY, |n| n.data.to_screen);
            dp.maximum_animation_contents_scale =
                anim.maximum_target_scale * max_scale(&parent_screen);
        }

        let content_to_target = t.content_to_target();
        let to_target = if t.content_target_id == target_node {
            Some(content_to_target)
        } else {
            transforms
                .target_to_target(t.content_target_id, target_node)
                .map(|m| m * content_to_target)
        };
        let Some(to_target) = to_target else {
            return dp;
        };
        dp.draw_transform = to_target * offset;

        let invertible = t.is_invertible && t.ancestors_are_invertible;
        if !invertible && !t.to_screen_is_potentially_animated {
            return dp;
        }

        let clip = c
            .is_clipped
            .then(|| convert_clip_rect(transforms, c.clip_in_target_space, c.target_id, target_node))
            .flatten();
        dp.is_clipped = clip.is_some();
        dp.clip_rect = clip.map_or(Rect::ZERO, enclosing_rect);

        if !owns_surface && self.is_hidden_by_backface(idx, &dp.draw_transform) {
            return dp;
        }

        let bounds = p.bounds_rect();
        let mapped = map_enclosing_clipped_rect(&dp.draw_transform, bounds);
        dp.drawable_content_rect = if dp.is_clipped {
            intersect_or_empty(mapped, dp.clip_rect)
        } else {
            mapped
        };
        let combined = convert_clip_rect(
            transforms,
            c.combined_clip_in_target_space,
            c.target_id,
            target_node,
        );
        dp.visible_layer_rect = match combined {
            Some(combined) => {
                calculate_visible_rect(enclosing_rect(combined), bounds, &dp.draw_transform)
            }
            None => bounds,
        };
        dp.is_drawn = e.is_drawn;
        dp
    }

    /// Back-face test for layers that do not own a surface. Surfaces are
    /// tested by the effect tree.
    fn is_hidden_by_backface(&self, idx: u32, draw_transform: &Transform3d) -> bool {
        let i = idx as usize;
        let p = &self.props[i];
        if p.flags.double_sided || self.animation[i].transform_can_animate() {
            return false;
        }
        let t = &self.property_trees.transform_tree.node(self.tree_indices[i].transform).data;
        if t.to_screen_is_potentially_animated {
            return false;
        }
        let parent_context = if idx == self.root {
            0
        } else {
            self.props[self.parent[i] as usize].sorting_context_id
        };
        let in_context = p.sorting_context_id != 0 && parent_context == p.sorting_context_id;
        if in_context {
            draw_transform.is_back_face_visible()
        } else {
            p.transform
                .about_origin(p.transform_origin)
                .is_back_face_visible()
        }
    }
}

pub(crate) fn viewport_rect(inputs: &CalcDrawPropsInputs) -> Rect {
    Rect::from_origin_size(Point::ORIGIN, inputs.device_viewport_size)
}

fn max_scale(t: &Transform3d) -> f64 {
    let s = t.scale_2d_components().unwrap_or(Vec2::new(1.0, 1.0));
    let m = s.x.max(s.y);
    if m > 0.0 { m } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Size};

    use super::*;
    use crate::geometry::{map_clipped_rect, rect_contains, rect_is_empty};
    use crate::layer::Contributor;
    use crate::settings::LayerTreeSettings;

    fn container(tree: &mut LayerTree, parent: LayerId, w: f64, h: f64) -> LayerId {
        let id = tree.create_layer();
        tree.set_bounds(id, Size::new(w, h));
        tree.add_child(parent, id);
        id
    }

    fn drawing(tree: &mut LayerTree, parent: LayerId, w: f64, h: f64) -> LayerId {
        let id = container(tree, parent, w, h);
        tree.set_is_drawable(id, true);
        id
    }

    fn with_root(settings: LayerTreeSettings, w: f64, h: f64) -> (LayerTree, LayerId) {
        let mut tree = LayerTree::new(settings);
        let root = tree.create_layer();
        tree.set_bounds(root, Size::new(w, h));
        tree.set_root_layer(Some(root));
        (tree, root)
    }

    fn viewport(w: f64, h: f64) -> CalcDrawPropsInputs {
        CalcDrawPropsInputs::new(Size::new(w, h))
    }

    #[test]
    fn child_draw_transform_composes_parent_about_its_origin() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 100.0, 100.0);
        let parent = container(&mut tree, root, 10.0, 10.0);
        tree.set_transform(parent, Transform3d::from_scale(2.0, 2.0, 1.0));
        tree.set_transform_origin(parent, [5.0, 5.0, 0.0]);
        let child = drawing(&mut tree, parent, 10.0, 10.0);
        tree.calculate_draw_properties(&viewport(100.0, 100.0));

        let expected = Transform3d::from_translation(5.0, 5.0, 0.0)
            * Transform3d::from_scale(2.0, 2.0, 1.0)
            * Transform3d::from_translation(-5.0, -5.0, 0.0);
        let dp = tree.draw_properties(child);
        assert!(dp.draw_transform.approx_eq(&expected, 1e-9), "{dp:?}");
        assert!(dp.screen_space_transform.approx_eq(&expected, 1e-9), "{dp:?}");
        assert_eq!(dp.render_target, Some(root));
    }

    #[test]
    fn composition_without_origin_is_the_parent_transform() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 100.0, 100.0);
        let parent = container(&mut tree, root, 10.0, 10.0);
        tree.set_transform(parent, Transform3d::from_scale(2.0, 2.0, 1.0));
        let child = drawing(&mut tree, parent, 10.0, 10.0);
        tree.calculate_draw_properties(&viewport(100.0, 100.0));
        assert!(
            tree.draw_properties(child)
                .draw_transform
                .approx_eq(&Transform3d::from_scale(2.0, 2.0, 1.0), 1e-12),
            "child should inherit the parent scale"
        );
    }

    #[test]
    fn device_scale_reaches_root_draw_transform() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 1.0, 2.0);
        tree.set_is_drawable(root, true);
        tree.calculate_draw_properties(&viewport(1.0, 2.0).with_device_scale_factor(2.5));

        let expected = Transform3d::from_scale(2.5, 2.5, 1.0);
        let dp = tree.draw_properties(root);
        assert!(dp.draw_transform.approx_eq(&expected, 1e-12), "{dp:?}");
        assert!(dp.screen_space_transform.approx_eq(&expected, 1e-12), "{dp:?}");
        assert_eq!(dp.draw_transform.translation_2d(), Vec2::ZERO);
        assert_eq!(dp.ideal_contents_scale, 2.5);
    }

    #[test]
    fn single_sided_flipped_layer_is_culled() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 200.0, 200.0);
        let flip = Transform3d::from_translation(50.0, 50.0, 0.0)
            * Transform3d::from_rotation_y(core::f64::consts::PI)
            * Transform3d::from_translation(-50.0, -50.0, 0.0);
        let single = drawing(&mut tree, root, 100.0, 100.0);
        tree.set_transform(single, flip);
        tree.set_double_sided(single, false);
        let double = drawing(&mut tree, root, 100.0, 100.0);
        tree.set_transform(double, flip);

        tree.calculate_draw_properties(&viewport(200.0, 200.0));

        let s = tree.draw_properties(single);
        assert!(!s.is_drawn);
        assert!(rect_is_empty(s.visible_layer_rect));
        let d = tree.draw_properties(double);
        assert!(d.is_drawn);
        assert_eq!(d.visible_layer_rect, Rect::new(0.0, 0.0, 100.0, 100.0));

        let surface = tree.render_surface(root).expect("root surface");
        assert_eq!(surface.layer_list, vec![Contributor::Layer(double)]);
    }

    #[test]
    fn animating_transform_is_never_culled() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 200.0, 200.0);
        let layer = drawing(&mut tree, root, 100.0, 100.0);
        tree.set_transform(layer, Transform3d::from_rotation_y(core::f64::consts::PI));
        tree.set_position(layer, Point::new(100.0, 0.0));
        tree.set_double_sided(layer, false);
        tree.set_animation_state(
            layer,
            crate::layer::AnimationState {
                has_potential_transform_animation: true,
                ..crate::layer::AnimationState::default()
            },
        );
        tree.calculate_draw_properties(&viewport(200.0, 200.0));
        let dp = tree.draw_properties(layer);
        assert!(dp.is_drawn);
        assert!(dp.screen_space_transform_is_animating);
    }

    #[test]
    fn clipped_surfaces_are_culled_from_the_list() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 100.0, 100.0);
        tree.set_masks_to_bounds(root, true);
        let child = container(&mut tree, root, 20.0, 20.0);
        tree.set_opacity(child, 0.4);
        tree.set_force_render_surface(child, true);
        tree.set_masks_to_bounds(child, true);
        let grandchild = container(&mut tree, child, 10.0, 10.0);
        tree.set_position(grandchild, Point::new(45.0, 45.0));
        tree.set_opacity(grandchild, 0.5);
        let great = drawing(&mut tree, grandchild, 10.0, 10.0);
        let leaf = drawing(&mut tree, child, 20.0, 20.0);

        let stats = tree.calculate_draw_properties(&viewport(100.0, 100.0));

        assert!(tree.has_render_surface(grandchild), "grandchild is promoted");
        assert_eq!(tree.render_surface_layer_list(), &[child, root]);
        assert!(tree.render_surface(grandchild).is_none());
        assert!(rect_is_empty(tree.draw_properties(great).visible_layer_rect));
        assert_eq!(
            tree.render_surface(child).expect("child surface").layer_list,
            vec![Contributor::Layer(leaf)]
        );
        assert_eq!(
            tree.render_surface(root).expect("root surface").layer_list,
            vec![Contributor::Surface(child)]
        );
        assert_eq!(stats.render_surfaces, 2);
        assert_eq!(stats.pruned_surfaces, 1);
        assert_eq!(stats.drawn_layers, 1);
    }

    #[test]
    fn perspective_clips_in_homogeneous_space() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 200.0, 200.0);
        tree.set_masks_to_bounds(root, true);
        let child = drawing(&mut tree, root, 20.0, 2.0);
        tree.set_position(child, Point::new(100.0, 100.0));
        tree.set_transform(
            child,
            Transform3d::from_perspective(1.0)
                * Transform3d::from_translation(-2.0, 0.0, 1.0)
                * Transform3d::from_rotation_y(45.0_f64.to_radians())
                * Transform3d::from_translation(-10.0, -1.0, 0.0),
        );
        tree.calculate_draw_properties(&viewport(200.0, 200.0));

        let dp = tree.draw_properties(child);
        assert!(dp.is_clipped);
        assert_eq!(dp.clip_rect, Rect::new(0.0, 0.0, 200.0, 200.0));
        // Half the layer is behind the camera; only the front half shows.
        assert_eq!(dp.visible_layer_rect, Rect::new(10.0, 0.0, 20.0, 2.0));
        assert_eq!(dp.drawable_content_rect, Rect::new(0.0, 0.0, 101.0, 200.0));
        assert!(dp.draw_transform.is_finite());
    }

    #[test]
    fn layer_crossing_the_camera_plane_fills_the_target() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 200.0, 200.0);
        tree.set_masks_to_bounds(root, true);
        let child = drawing(&mut tree, root, 20.0, 2.0);
        // The front edge lands just past the right side of the target.
        tree.set_position(child, Point::new(200.0, 100.0));
        tree.set_transform(
            child,
            Transform3d::from_perspective(1.0)
                * Transform3d::from_translation(-2.0, 0.0, 1.0)
                * Transform3d::from_rotation_y(45.0_f64.to_radians())
                * Transform3d::from_translation(-10.0, -1.0, 0.0),
        );
        tree.calculate_draw_properties(&viewport(200.0, 200.0));

        let dp = tree.draw_properties(child);
        assert!(dp.is_drawn);
        // Near the w = 0 line the layer runs off to infinity in every
        // direction it can, so it covers the whole clipped target.
        assert_eq!(dp.drawable_content_rect, Rect::new(0.0, 0.0, 200.0, 200.0));
        // Only a narrow strip just in front of the camera plane (x = 10)
        // lands inside the target.
        assert_eq!(dp.visible_layer_rect, Rect::new(10.0, 0.0, 13.0, 2.0));
    }

    #[test]
    fn descendants_stay_inside_masking_ancestor() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 200.0, 200.0);
        let clipper = container(&mut tree, root, 50.0, 40.0);
        tree.set_position(clipper, Point::new(10.0, 10.0));
        tree.set_masks_to_bounds(clipper, true);
        let mut layers = Vec::new();
        for (x, y) in [(-20.0, -20.0), (30.0, 5.0), (45.0, 35.0), (100.0, 100.0), (0.0, 0.0)] {
            let wrapper = container(&mut tree, clipper, 1.0, 1.0);
            tree.set_position(wrapper, Point::new(x / 2.0, y / 2.0));
            let layer = drawing(&mut tree, wrapper, 30.0, 30.0);
            tree.set_position(layer, Point::new(x / 2.0, y / 2.0));
            layers.push(layer);
        }
        tree.calculate_draw_properties(&viewport(200.0, 200.0));

        let clip = Rect::new(10.0, 10.0, 60.0, 50.0);
        for layer in layers {
            let dp = tree.draw_properties(layer);
            assert!(dp.is_clipped, "{layer:?} should be clipped");
            assert_eq!(dp.clip_rect, clip);
            assert!(rect_contains(clip, dp.drawable_content_rect) || rect_is_empty(dp.drawable_content_rect));
            if !rect_is_empty(dp.visible_layer_rect) {
                let in_target = map_clipped_rect(&dp.draw_transform, dp.visible_layer_rect);
                assert!(
                    rect_contains(clip, in_target),
                    "{layer:?} visible {in_target:?} escapes {clip:?}"
                );
            }
        }
    }

    #[test]
    fn opacity_folds_into_content_without_surfaces() {
        for settings in [LayerTreeSettings::default(), LayerTreeSettings::single_surface()] {
            let (mut tree, root) = with_root(settings, 100.0, 100.0);
            let outer = container(&mut tree, root, 10.0, 10.0);
            tree.set_opacity(outer, 0.5);
            let inner = drawing(&mut tree, outer, 10.0, 10.0);
            tree.set_opacity(inner, 0.5);
            tree.calculate_draw_properties(&viewport(100.0, 100.0));

            let dp = tree.draw_properties(inner);
            if settings.can_render_to_separate_surface {
                assert_eq!(dp.opacity, 0.5);
                assert_eq!(dp.render_target, Some(outer));
                let surface = tree.render_surface(outer).expect("outer surface");
                assert_eq!(surface.draw_opacity, 0.5);
            } else {
                assert_eq!(dp.opacity, 0.25);
                assert_eq!(dp.render_target, Some(root));
                assert_eq!(tree.render_surface_layer_list(), &[root]);
            }
        }
    }

    #[test]
    fn page_scale_changes_update_in_place() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 100.0, 100.0);
        let page = container(&mut tree, root, 100.0, 100.0);
        let content = drawing(&mut tree, page, 10.0, 10.0);
        let first = tree.calculate_draw_properties(&viewport(100.0, 100.0).with_page_scale(page, 2.0));
        assert!(first.rebuilt_property_trees);
        assert!(
            tree.draw_properties(content)
                .draw_transform
                .approx_eq(&Transform3d::from_scale(2.0, 2.0, 1.0), 1e-12),
            "page scale applies below the page-scale layer"
        );

        let second = tree.calculate_draw_properties(&viewport(100.0, 100.0).with_page_scale(page, 3.0));
        assert!(!second.rebuilt_property_trees);
        let dp = tree.draw_properties(content);
        assert!(
            dp.draw_transform
                .approx_eq(&Transform3d::from_scale(3.0, 3.0, 1.0), 1e-12),
            "{dp:?}"
        );
        assert_eq!(dp.ideal_contents_scale, 3.0);
        assert_eq!(tree.draw_properties(root).ideal_contents_scale, 1.0);
    }

    #[test]
    fn continuous_changes_skip_the_rebuild() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 100.0, 100.0);
        let faded = drawing(&mut tree, root, 10.0, 10.0);
        tree.set_opacity(faded, 0.5);
        let scroller = container(&mut tree, root, 100.0, 300.0);
        tree.set_scroll_clip_layer(scroller, Some(root));
        let scrolled = drawing(&mut tree, scroller, 10.0, 10.0);
        tree.set_position(scrolled, Point::new(0.0, 50.0));
        let inputs = viewport(100.0, 100.0);
        tree.calculate_draw_properties(&inputs);

        tree.set_opacity(faded, 0.25);
        tree.set_scroll_offset(scroller, Vec2::new(0.0, 20.0));
        let stats = tree.calculate_draw_properties(&inputs);
        assert!(!stats.rebuilt_property_trees);
        assert_eq!(tree.draw_properties(faded).opacity, 0.25);
        assert_eq!(
            tree.draw_properties(scrolled).draw_transform.translation_2d(),
            Vec2::new(0.0, 30.0)
        );
    }

    #[test]
    fn singular_transform_is_not_drawn() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 100.0, 100.0);
        let flat = drawing(&mut tree, root, 10.0, 10.0);
        tree.set_transform(flat, Transform3d::from_scale(0.0, 1.0, 1.0));
        let below = drawing(&mut tree, flat, 10.0, 10.0);
        tree.calculate_draw_properties(&viewport(100.0, 100.0));
        assert!(!tree.draw_properties(flat).is_drawn);
        assert!(!tree.draw_properties(below).is_drawn);
        assert!(tree.draw_properties(below).draw_transform.is_finite());
        assert!(tree.render_surface(root).expect("root").layer_list.is_empty());
    }

    #[test]
    fn hidden_subtree_is_not_drawn() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 100.0, 100.0);
        let hidden = drawing(&mut tree, root, 10.0, 10.0);
        tree.set_hide_layer_and_subtree(hidden, true);
        let below = drawing(&mut tree, hidden, 10.0, 10.0);
        let shown = drawing(&mut tree, root, 10.0, 10.0);
        let stats = tree.calculate_draw_properties(&viewport(100.0, 100.0));
        assert!(!tree.draw_properties(hidden).is_drawn);
        assert!(!tree.draw_properties(below).is_drawn);
        assert_eq!(
            tree.render_surface(root).expect("root").layer_list,
            vec![Contributor::Layer(shown)]
        );
        assert_eq!(stats.drawn_layers, 1);
    }

    #[test]
    fn contents_scale_follows_screen_space_when_enabled() {
        let settings = LayerTreeSettings {
            layer_transforms_should_scale_layer_contents: true,
            ..LayerTreeSettings::default()
        };
        let (mut tree, root) = with_root(settings, 100.0, 100.0);
        let scaled = container(&mut tree, root, 10.0, 10.0);
        tree.set_transform(scaled, Transform3d::from_scale(2.0, 3.0, 1.0));
        let animated = drawing(&mut tree, scaled, 10.0, 10.0);
        tree.set_animation_state(
            animated,
            crate::layer::AnimationState {
                is_animating_transform: true,
                maximum_target_scale: 1.5,
                ..crate::layer::AnimationState::default()
            },
        );
        tree.calculate_draw_properties(&viewport(100.0, 100.0));
        let dp = tree.draw_properties(animated);
        assert_eq!(dp.ideal_contents_scale, 3.0);
        assert_eq!(dp.maximum_animation_contents_scale, 4.5);
    }

    #[test]
    fn detached_layers_report_defaults() {
        let (mut tree, root) = with_root(LayerTreeSettings::default(), 100.0, 100.0);
        let child = drawing(&mut tree, root, 10.0, 10.0);
        tree.calculate_draw_properties(&viewport(100.0, 100.0));
        assert!(tree.draw_properties(child).is_drawn);
        tree.remove_from_parent(child);
        tree.calculate_draw_properties(&viewport(100.0, 100.0));
        assert_eq!(*tree.draw_properties(child), DrawProperties::default());
    }
}
