// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect tree.

use super::transform::TransformTree;
use super::tree::{NodeId, PropertyTree, ROOT_NODE};
use crate::layer::BlendMode;
use crate::transform::Transform3d;

/// Effect tree node payload.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectNode {
    // -- Inputs --
    /// The owner's opacity. Animations may overwrite it in place.
    pub opacity: f32,
    /// The owner's blend mode.
    pub blend_mode: BlendMode,
    /// The owner has a render surface.
    pub has_render_surface: bool,
    /// The owner hides itself and its subtree.
    pub hide_layer_and_subtree: bool,
    /// An opacity animation is running on the owner.
    pub is_currently_animating_opacity: bool,
    /// An opacity animation may run on the owner.
    pub has_potential_opacity_animation: bool,
    /// Copy requests on the owner.
    pub num_copy_requests: usize,
    /// Copy requests on the owner and every descendant.
    pub num_copy_requests_in_subtree: usize,
    /// Transform node of the owner.
    pub transform_id: NodeId,
    /// The owner draws its back face.
    pub double_sided: bool,
    /// Test the accumulated transform for backface visibility instead of
    /// [`local_backface_transform`](Self::local_backface_transform).
    pub uses_accumulated_backface: bool,
    /// The owner's local transform about its origin.
    pub local_backface_transform: Transform3d,
    /// The owner's transform may animate, so its facing is not fixed.
    pub transform_can_animate: bool,

    // -- Outputs --
    /// Product of this and every ancestor opacity.
    pub screen_space_opacity: f32,
    /// Opacity applied to content drawn at this node, up to its target.
    pub content_opacity: f32,
    /// For surface nodes: opacity the surface is drawn into its target with.
    pub surface_draw_opacity: f32,
    /// The owner's back face is showing and it is not double-sided.
    pub hidden_by_backface_visibility: bool,
    /// Content attached to this node can be drawn.
    pub is_drawn: bool,
    /// An output changed since change tracking was last reset.
    pub effect_changed: bool,
}

impl Default for EffectNode {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blend_mode: BlendMode::SrcOver,
            has_render_surface: false,
            hide_layer_and_subtree: false,
            is_currently_animating_opacity: false,
            has_potential_opacity_animation: false,
            num_copy_requests: 0,
            num_copy_requests_in_subtree: 0,
            transform_id: ROOT_NODE,
            double_sided: true,
            uses_accumulated_backface: false,
            local_backface_transform: Transform3d::IDENTITY,
            transform_can_animate: false,
            screen_space_opacity: 1.0,
            content_opacity: 1.0,
            surface_draw_opacity: 1.0,
            hidden_by_backface_visibility: false,
            is_drawn: true,
            effect_changed: false,
        }
    }
}

impl EffectNode {
    /// Opacity may change without a rebuild.
    #[must_use]
    pub const fn opacity_can_animate(&self) -> bool {
        self.is_currently_animating_opacity || self.has_potential_opacity_animation
    }

    /// Sets the opacity in place.
    pub fn set_opacity(&mut self, opacity: f32) {
        if self.opacity != opacity {
            self.opacity = opacity;
            self.effect_changed = true;
        }
    }
}

/// The effect tree.
pub type EffectTree = PropertyTree<EffectNode>;

impl PropertyTree<EffectNode> {
    /// Recomputes every node's outputs, parents before children.
    ///
    /// With `surfaces_enabled` false, the only surface is the root's and its
    /// opacity folds into its content instead of the surface.
    pub fn update(&mut self, transforms: &TransformTree, surfaces_enabled: bool) {
        let nodes = self.nodes_mut();
        if let Some(sentinel) = nodes.first_mut() {
            let d = &mut sentinel.data;
            d.screen_space_opacity = 1.0;
            d.content_opacity = 1.0;
            d.surface_draw_opacity = 1.0;
            d.is_drawn = true;
            d.hidden_by_backface_visibility = false;
        }
        for i in 1..nodes.len() {
            let (before, rest) = nodes.split_at_mut(i);
            let node = &mut rest[0];
            let parent = &before[node.parent_id as usize].data;
            let data = &mut node.data;

            let screen_space_opacity = parent.screen_space_opacity * data.opacity;
            let (content_opacity, surface_draw_opacity) =
                if data.has_render_surface && surfaces_enabled {
                    (1.0, data.opacity * parent.content_opacity)
                } else {
                    (data.opacity * parent.content_opacity, 1.0)
                };

            let hidden_by_backface = data.has_render_surface
                && !data.double_sided
                && !data.transform_can_animate
                && {
                    let t = if data.uses_accumulated_backface {
                        transforms.node(data.transform_id).data.to_target
                    } else {
                        data.local_backface_transform
                    };
                    t.is_back_face_visible()
                };

            // Fully transparent content is kept while it can animate back in
            // or while something wants a copy of it.
            let transparent = data.opacity == 0.0
                && !data.opacity_can_animate()
                && data.num_copy_requests_in_subtree == 0;
            let is_drawn = parent.is_drawn
                && !data.hide_layer_and_subtree
                && !transparent
                && !hidden_by_backface;

            if data.screen_space_opacity != screen_space_opacity
                || data.content_opacity != content_opacity
                || data.surface_draw_opacity != surface_draw_opacity
                || data.is_drawn != is_drawn
                || data.hidden_by_backface_visibility != hidden_by_backface
            {
                data.effect_changed = true;
            }
            data.screen_space_opacity = screen_space_opacity;
            data.content_opacity = content_opacity;
            data.surface_draw_opacity = surface_draw_opacity;
            data.hidden_by_backface_visibility = hidden_by_backface;
            data.is_drawn = is_drawn;
        }
        self.set_needs_update(false);
    }

    /// Clears every node's [`effect_changed`](EffectNode::effect_changed).
    pub fn reset_change_tracking(&mut self) {
        for node in self.nodes_mut() {
            node.data.effect_changed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(opacity: f32, surface: bool) -> EffectNode {
        EffectNode {
            opacity,
            has_render_surface: surface,
            ..EffectNode::default()
        }
    }

    #[test]
    fn surface_applies_its_own_opacity() {
        let tt = TransformTree::new();
        let mut et = EffectTree::new();
        let root = et.insert(node(1.0, true), ROOT_NODE, None);
        let fade = et.insert(node(0.5, false), root, None);
        let surface = et.insert(node(0.4, true), fade, None);
        let inner = et.insert(node(0.5, false), surface, None);
        et.update(&tt, true);

        assert_eq!(et.node(fade).data.content_opacity, 0.5);
        assert_eq!(et.node(surface).data.surface_draw_opacity, 0.2);
        assert_eq!(et.node(surface).data.content_opacity, 1.0);
        assert_eq!(et.node(inner).data.content_opacity, 0.5);
        assert!((et.node(inner).data.screen_space_opacity - 0.1).abs() < 1e-6);
    }

    #[test]
    fn single_surface_mode_folds_everything() {
        let tt = TransformTree::new();
        let mut et = EffectTree::new();
        let root = et.insert(node(0.5, true), ROOT_NODE, None);
        let child = et.insert(node(0.5, false), root, None);
        et.update(&tt, false);
        assert_eq!(et.node(root).data.surface_draw_opacity, 1.0);
        assert_eq!(et.node(child).data.content_opacity, 0.25);
    }

    #[test]
    fn transparent_subtree_is_not_drawn_unless_animating() {
        let tt = TransformTree::new();
        let mut et = EffectTree::new();
        let root = et.insert(node(1.0, true), ROOT_NODE, None);
        let hidden = et.insert(node(0.0, false), root, None);
        let below = et.insert(node(1.0, false), hidden, None);
        let animated = et.insert(
            EffectNode {
                has_potential_opacity_animation: true,
                ..node(0.0, false)
            },
            root,
            None,
        );
        et.update(&tt, true);
        assert!(!et.node(hidden).data.is_drawn);
        assert!(!et.node(below).data.is_drawn);
        assert!(et.node(animated).data.is_drawn);
    }

    #[test]
    fn back_facing_single_sided_surface_is_hidden() {
        let tt = TransformTree::new();
        let mut et = EffectTree::new();
        let root = et.insert(node(1.0, true), ROOT_NODE, None);
        let flipped = et.insert(
            EffectNode {
                double_sided: false,
                local_backface_transform: Transform3d::from_rotation_y(core::f64::consts::PI),
                ..node(1.0, true)
            },
            root,
            None,
        );
        let animating = et.insert(
            EffectNode {
                double_sided: false,
                transform_can_animate: true,
                local_backface_transform: Transform3d::from_rotation_y(core::f64::consts::PI),
                ..node(1.0, true)
            },
            root,
            None,
        );
        et.update(&tt, true);
        assert!(et.node(flipped).data.hidden_by_backface_visibility);
        assert!(!et.node(flipped).data.is_drawn);
        assert!(et.node(animating).data.is_drawn);
    }
}
