// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform tree.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Vec2;

use super::tree::{NO_NODE, NodeId, PropertyTree, ROOT_NODE};
use crate::transform::Transform3d;

/// Transform tree node payload.
///
/// Inputs are written by the tree builder (or in place by setters that do
/// not need a rebuild); outputs are recomputed by [`TransformTree::update`].
#[derive(Clone, Debug, PartialEq)]
pub struct TransformNode {
    // -- Inputs --
    /// The owner layer's transform.
    pub local: Transform3d,
    /// Pivot for [`local`](Self::local).
    pub origin: [f64; 3],
    /// Translation applied after the local transform: the owner's position
    /// plus any offset inherited from layers without their own node.
    pub post_local_offset: Vec2,
    /// Uniform scale applied after the local transform (page scale).
    pub post_local_scale: f64,
    /// Transform applied above everything else (device transform and device
    /// scale). Identity except on the root layer's node.
    pub pre_transform: Transform3d,
    /// Content scroll offset; children move by its negation.
    pub scroll_offset: Vec2,
    /// Flatten the accumulated parent transform before composing.
    pub flattens_inherited_transform: bool,
    /// The owner layer has a render surface.
    pub has_render_surface: bool,
    /// This node applies the page scale factor.
    pub is_page_scale_node: bool,
    /// A transform animation is running on the owner.
    pub is_currently_animating: bool,
    /// A transform animation may run on the owner.
    pub has_potential_animation: bool,
    /// All transform animations on the owner are translations.
    pub has_only_translation_animations: bool,
    /// 3-D rendering context of the owner; 0 means none.
    pub sorting_context_id: i32,
    /// [`to_parent`](Self::to_parent) must be recomputed from the inputs.
    pub needs_local_transform_update: bool,

    // -- Outputs --
    /// Node space to parent node space.
    pub to_parent: Transform3d,
    /// Node space to the space of [`target_id`](Self::target_id)'s surface.
    pub to_target: Transform3d,
    /// Node space to screen space.
    pub to_screen: Transform3d,
    /// Node whose surface this node's owner draws into.
    pub target_id: NodeId,
    /// Node whose surface content attached to this node draws into. Equal to
    /// `id` for surface nodes and to [`target_id`](Self::target_id) otherwise.
    pub content_target_id: NodeId,
    /// Scale from node space to surface space for surface nodes.
    pub sublayer_scale: Vec2,
    /// Every ancestor's local transform is invertible.
    pub ancestors_are_invertible: bool,
    /// This node's own [`to_parent`](Self::to_parent) is invertible.
    pub is_invertible: bool,
    /// The node or an ancestor may animate its transform.
    pub to_screen_is_potentially_animated: bool,
    /// The node or an ancestor applies page scale.
    pub in_page_scale_subtree: bool,
    /// [`to_parent`](Self::to_parent) changed since change tracking was
    /// last reset.
    pub transform_changed: bool,
}

impl Default for TransformNode {
    fn default() -> Self {
        Self {
            local: Transform3d::IDENTITY,
            origin: [0.0; 3],
            post_local_offset: Vec2::ZERO,
            post_local_scale: 1.0,
            pre_transform: Transform3d::IDENTITY,
            scroll_offset: Vec2::ZERO,
            flattens_inherited_transform: true,
            has_render_surface: false,
            is_page_scale_node: false,
            is_currently_animating: false,
            has_potential_animation: false,
            has_only_translation_animations: false,
            sorting_context_id: 0,
            needs_local_transform_update: true,
            to_parent: Transform3d::IDENTITY,
            to_target: Transform3d::IDENTITY,
            to_screen: Transform3d::IDENTITY,
            target_id: ROOT_NODE,
            content_target_id: ROOT_NODE,
            sublayer_scale: Vec2::new(1.0, 1.0),
            ancestors_are_invertible: true,
            is_invertible: true,
            to_screen_is_potentially_animated: false,
            in_page_scale_subtree: false,
            transform_changed: false,
        }
    }
}

impl TransformNode {
    /// Recomputes [`to_parent`](Self::to_parent) from the inputs.
    fn update_to_parent(&mut self) {
        let to_parent = self.pre_transform
            * Transform3d::from_translation_2d(self.post_local_offset)
            * self.local.about_origin(self.origin)
            * Transform3d::from_scale(self.post_local_scale, self.post_local_scale, 1.0)
            * Transform3d::from_translation_2d(-self.scroll_offset);
        if to_parent != self.to_parent {
            self.transform_changed = true;
        }
        self.to_parent = to_parent;
        self.needs_local_transform_update = false;
    }

    /// Transform from this node's space into the surface space its content
    /// draws into.
    #[must_use]
    pub fn content_to_target(&self) -> Transform3d {
        if self.has_render_surface {
            Transform3d::from_scale(self.sublayer_scale.x, self.sublayer_scale.y, 1.0)
        } else {
            self.to_target
        }
    }

    /// Transform from this surface node's surface space to screen space.
    ///
    /// Only meaningful for surface nodes.
    #[must_use]
    pub fn surface_to_screen(&self) -> Transform3d {
        self.to_screen * inverse_scale(self.sublayer_scale)
    }

    /// Transform from this surface node's surface space into its target's
    /// surface space.
    ///
    /// Only meaningful for surface nodes.
    #[must_use]
    pub fn surface_to_target(&self) -> Transform3d {
        self.to_target * inverse_scale(self.sublayer_scale)
    }

    /// Sets the local transform and schedules recomputation.
    pub fn set_local(&mut self, local: Transform3d) {
        if self.local != local {
            self.local = local;
            self.needs_local_transform_update = true;
        }
    }

    /// Sets the scroll offset and schedules recomputation.
    pub fn set_scroll_offset(&mut self, offset: Vec2) {
        if self.scroll_offset != offset {
            self.scroll_offset = offset;
            self.needs_local_transform_update = true;
        }
    }
}

fn inverse_scale(scale: Vec2) -> Transform3d {
    Transform3d::from_scale(1.0 / scale.x, 1.0 / scale.y, 1.0)
}

/// How sublayer scales are chosen when updating the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceScaleInputs {
    /// Derive each surface's scale from its screen-space scale.
    pub scale_from_screen_space: bool,
    /// Device pixels per layout pixel.
    pub device_scale_factor: f64,
    /// Page scale factor.
    pub page_scale_factor: f64,
}

impl SurfaceScaleInputs {
    fn default_scale(&self, in_page_scale_subtree: bool) -> f64 {
        if in_page_scale_subtree {
            self.device_scale_factor * self.page_scale_factor
        } else {
            self.device_scale_factor
        }
    }
}

/// The transform tree.
pub type TransformTree = PropertyTree<TransformNode>;

impl PropertyTree<TransformNode> {
    /// Recomputes every node's outputs, parents before children.
    ///
    /// Non-finite accumulated transforms are replaced by the identity.
    pub fn update(&mut self, scales: &SurfaceScaleInputs) {
        let nodes = self.nodes_mut();
        if let Some(sentinel) = nodes.first_mut() {
            sentinel.data.has_render_surface = true;
            sentinel.data.to_parent = Transform3d::IDENTITY;
            sentinel.data.to_target = Transform3d::IDENTITY;
            sentinel.data.to_screen = Transform3d::IDENTITY;
            sentinel.data.target_id = ROOT_NODE;
            sentinel.data.content_target_id = ROOT_NODE;
            sentinel.data.sublayer_scale = Vec2::new(1.0, 1.0);
        }
        for i in 1..nodes.len() {
            let (before, rest) = nodes.split_at_mut(i);
            let node = &mut rest[0];
            let parent = &before[node.parent_id as usize].data;
            let data = &mut node.data;

            if data.needs_local_transform_update {
                data.update_to_parent();
            }

            let mut inherited_target = parent.content_to_target();
            let mut inherited_screen = parent.to_screen;
            if data.flattens_inherited_transform {
                inherited_target = inherited_target.flatten_to_2d();
                inherited_screen = inherited_screen.flatten_to_2d();
            }
            data.to_target = sanitize(inherited_target * data.to_parent);
            data.to_screen = sanitize(inherited_screen * data.to_parent);

            data.target_id = parent.content_target_id;
            data.content_target_id = if data.has_render_surface {
                node.id
            } else {
                data.target_id
            };

            data.is_invertible = data.to_parent.is_invertible();
            data.ancestors_are_invertible = parent.ancestors_are_invertible && parent.is_invertible;
            data.to_screen_is_potentially_animated = parent.to_screen_is_potentially_animated
                || data.is_currently_animating
                || data.has_potential_animation;
            data.in_page_scale_subtree = parent.in_page_scale_subtree || data.is_page_scale_node;

            data.sublayer_scale = if data.has_render_surface {
                let s = if scales.scale_from_screen_space {
                    data.to_screen
                        .scale_2d_components()
                        .unwrap_or(Vec2::new(1.0, 1.0))
                } else {
                    let s = scales.default_scale(data.in_page_scale_subtree);
                    Vec2::new(s, s)
                };
                Vec2::new(usable_scale(s.x), usable_scale(s.y))
            } else {
                Vec2::new(1.0, 1.0)
            };
        }
        self.set_needs_update(false);
    }

    /// Clears every node's [`transform_changed`](TransformNode::transform_changed).
    pub fn reset_change_tracking(&mut self) {
        for node in self.nodes_mut() {
            node.data.transform_changed = false;
        }
    }

    /// Transform from the surface space of target node `from` to the surface
    /// space of target node `to`.
    ///
    /// Returns `None` if `to`'s screen transform cannot be inverted.
    #[must_use]
    pub fn target_to_target(&self, from: NodeId, to: NodeId) -> Option<Transform3d> {
        if from == to {
            return Some(Transform3d::IDENTITY);
        }
        if from == NO_NODE || to == NO_NODE {
            return None;
        }
        let from_screen = self.node(from).data.surface_to_screen();
        let to_screen = self.node(to).data.surface_to_screen();
        let inv = to_screen.inverse()?;
        let m = inv * from_screen;
        m.is_finite().then_some(m)
    }
}

fn usable_scale(s: f64) -> f64 {
    if s.is_finite() && s.abs() > f64::EPSILON { s } else { 1.0 }
}

fn sanitize(t: Transform3d) -> Transform3d {
    if t.is_finite() { t } else { Transform3d::IDENTITY }
}
