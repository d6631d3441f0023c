// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render surfaces and the render surface layer list.

use alloc::vec::Vec;

use kurbo::Rect;

use super::blend::BlendMode;
use super::draw::{DrawPassStats, viewport_rect};
use super::id::{INVALID, LayerId};
use super::props::LayerRole;
use super::store::LayerTree;
use crate::geometry::{
    enclosing_rect, intersect_or_empty, map_enclosing_clipped_rect,
    project_enclosing_clipped_rect, rect_is_empty, union_non_empty,
};
use crate::property_trees::{ROOT_NODE, convert_clip_rect};
use crate::settings::CalcDrawPropsInputs;
use crate::transform::Transform3d;

/// Something drawn into a render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Contributor {
    /// A layer's own content.
    Layer(LayerId),
    /// The surface owned by the given layer, already composited.
    Surface(LayerId),
}

/// An intermediate target a layer's subtree is composited into.
///
/// Surface space is the owner's layer space scaled by its sublayer scale.
/// The root's surface is the screen.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSurface {
    /// Layer that owns the surface.
    pub owner: LayerId,
    /// Owner of the surface this one draws into; `None` for the root.
    pub render_target: Option<LayerId>,
    /// Surface space to target surface space.
    pub draw_transform: Transform3d,
    /// Surface space to screen space.
    pub screen_space_transform: Transform3d,
    /// Draw transform of the reflection, if the owner has a replica.
    pub replica_draw_transform: Option<Transform3d>,
    /// Screen-space transform of the reflection, if the owner has a replica.
    pub replica_screen_space_transform: Option<Transform3d>,
    /// Clip the surface is drawn with, in target space.
    pub clip_rect: Rect,
    /// Whether [`clip_rect`](Self::clip_rect) applies.
    pub is_clipped: bool,
    /// Union of what contributors draw, in surface space.
    pub content_rect: Rect,
    /// Content (with filter outsets and the replica) in target space.
    pub drawable_content_rect: Rect,
    /// Opacity the surface is composited with.
    pub draw_opacity: f32,
    /// Blend mode the surface is composited with.
    pub blend_mode: BlendMode,
    /// What draws into the surface, in paint order.
    pub layer_list: Vec<Contributor>,
    /// Mask applied to the surface.
    pub mask_layer: Option<LayerId>,
    /// Mask applied to the reflection.
    pub replica_mask_layer: Option<LayerId>,
}

impl LayerTree {
    /// The surface `id` owns as of the last draw pass, if any survived.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown.
    #[must_use]
    pub fn render_surface(&self, id: LayerId) -> Option<&RenderSurface> {
        self.render_surfaces[self.slot(id) as usize].as_ref()
    }

    /// Owners of every surface to draw, children before the target they draw
    /// into. The root's surface is last.
    #[must_use]
    pub fn render_surface_layer_list(&self) -> &[LayerId] {
        &self.render_surface_layer_list
    }

    /// Assembles surfaces bottom-up and drops the ones with nothing to draw.
    ///
    /// `targets` maps each attached slot to the slot of its render target.
    pub(crate) fn build_render_surface_layer_list(
        &mut self,
        inputs: &CalcDrawPropsInputs,
        targets: &[u32],
    ) -> DrawPassStats {
        self.render_surface_layer_list.clear();
        for surface in &mut self.render_surfaces {
            *surface = None;
        }
        let mut stats = DrawPassStats::default();
        if self.root == INVALID {
            return stats;
        }

        let mut list = Vec::new();
        let mut unused = Vec::new();
        let viewport = viewport_rect(inputs);
        self.assemble(self.root, targets, viewport, &mut unused, &mut list, &mut stats);

        stats.render_surfaces = list.len();
        stats.drawn_layers = list
            .iter()
            .filter_map(|&owner| self.render_surface(owner))
            .flat_map(|s| &s.layer_list)
            .filter(|c| matches!(c, Contributor::Layer(_)))
            .count();
        self.render_surface_layer_list = list;
        stats
    }

    fn assemble(
        &mut self,
        idx: u32,
        targets: &[u32],
        viewport: Rect,
        contributors: &mut Vec<Contributor>,
        list: &mut Vec<LayerId>,
        stats: &mut DrawPassStats,
    ) {
        let i = idx as usize;
        // Masks and replicas are drawn through their owner's surface.
        if self.role[i] != LayerRole::Child {
            return;
        }
        let id = self.id[i];
        if targets[i] != idx {
            if self.contributes(idx) {
                contributors.push(Contributor::Layer(id));
            }
            self.assemble_children(idx, targets, viewport, contributors, list, stats);
            return;
        }

        let start = list.len();
        let mut own = Vec::new();
        if self.contributes(idx) {
            own.push(Contributor::Layer(id));
        }
        self.assemble_children(idx, targets, viewport, &mut own, list, stats);

        if let Some(surface) = self.finish_surface(idx, targets, viewport, own) {
            self.render_surfaces[i] = Some(surface);
            list.push(id);
            if idx != self.root {
                contributors.push(Contributor::Surface(id));
            }
        } else {
            for dropped in list.drain(start..) {
                let s = self.slot(dropped) as usize;
                self.render_surfaces[s] = None;
            }
            stats.pruned_surfaces += 1;
        }
    }

    fn assemble_children(
        &mut self,
        idx: u32,
        targets: &[u32],
        viewport: Rect,
        contributors: &mut Vec<Contributor>,
        list: &mut Vec<LayerId>,
        stats: &mut DrawPassStats,
    ) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.assemble(child, targets, viewport, contributors, list, stats);
            child = self.next_sibling[child as usize];
        }
    }

    /// A layer draws into its target when it has content, is drawn, and
    /// some of it survives clipping.
    fn contributes(&self, idx: u32) -> bool {
        let dp = &self.draw_properties[idx as usize];
        self.draws_content_at(idx)
            && dp.is_drawn
            && !rect_is_empty(dp.drawable_content_rect)
            && !rect_is_empty(dp.visible_layer_rect)
    }

    fn contributor_rect(&self, contributor: Contributor) -> Rect {
        match contributor {
            Contributor::Layer(id) => self.draw_properties(id).drawable_content_rect,
            Contributor::Surface(id) => self
                .render_surface(id)
                .map_or(Rect::ZERO, |s| s.drawable_content_rect),
        }
    }

    /// Builds the surface owned by `idx`, or `None` if it should be pruned.
    fn finish_surface(
        &self,
        idx: u32,
        targets: &[u32],
        viewport: Rect,
        layer_list: Vec<Contributor>,
    ) -> Option<RenderSurface> {
        let i = idx as usize;
        let is_root = idx == self.root;
        let p = &self.props[i];
        let indices = self.tree_indices[i];
        let transforms = &self.property_trees.transform_tree;
        let effect = &self.property_trees.effect_tree.node(indices.effect).data;
        let clip = &self.property_trees.clip_tree.node(indices.clip).data;

        if !is_root && (layer_list.is_empty() || !effect.is_drawn) {
            return None;
        }

        let (render_target, target_node) = if is_root {
            (None, ROOT_NODE)
        } else {
            let t = targets[self.parent[i] as usize];
            (Some(self.id[t as usize]), self.surface_node(t))
        };

        let node = &transforms.node(indices.transform).data;
        let (draw_transform, screen_space_transform) = if is_root {
            (Transform3d::IDENTITY, Transform3d::IDENTITY)
        } else {
            let draw = if node.target_id == target_node {
                node.surface_to_target()
            } else {
                transforms.target_to_target(indices.transform, target_node)?
            };
            (draw, node.surface_to_screen())
        };

        let (clip_rect, is_clipped) = if is_root {
            (viewport, true)
        } else if clip.surface_is_clipped {
            match convert_clip_rect(transforms, clip.surface_clip, node.target_id, target_node) {
                Some(r) => (enclosing_rect(r), true),
                None => (Rect::ZERO, false),
            }
        } else {
            (Rect::ZERO, false)
        };

        let content_rect = if is_root {
            viewport
        } else {
            let mut content = layer_list
                .iter()
                .fold(Rect::ZERO, |acc, &c| union_non_empty(acc, self.contributor_rect(c)));
            // Surfaces holding clip children are never clipped here; their
            // content carries the ancestor clip per layer instead.
            if is_clipped && let Some(inverse) = draw_transform.inverse() {
                content =
                    intersect_or_empty(content, project_enclosing_clipped_rect(&inverse, clip_rect));
            }
            content
        };
        if !is_root && rect_is_empty(content_rect) {
            return None;
        }

        let replica = self.replica[i];
        let (replica_draw_transform, replica_screen_space_transform) =
            if replica != INVALID && !is_root {
                let r = &self.props[replica as usize];
                let sub = node.sublayer_scale;
                let local = Transform3d::from_scale(sub.x, sub.y, 1.0)
                    * Transform3d::from_translation_2d(r.position.to_vec2())
                    * r.transform.about_origin(r.transform_origin)
                    * Transform3d::from_scale(1.0 / sub.x, 1.0 / sub.y, 1.0);
                (
                    Some(draw_transform * local),
                    Some(screen_space_transform * local),
                )
            } else {
                (None, None)
            };

        let expanded = content_rect + p.filters.outsets();
        let mut drawable = map_enclosing_clipped_rect(&draw_transform, expanded);
        if let Some(replica_draw) = &replica_draw_transform {
            drawable = union_non_empty(drawable, map_enclosing_clipped_rect(replica_draw, expanded));
        }
        if is_clipped {
            drawable = intersect_or_empty(drawable, clip_rect);
        }

        let replica_mask_layer = (replica != INVALID)
            .then(|| self.id_at(self.mask[replica as usize]))
            .flatten();

        Some(RenderSurface {
            owner: self.id[i],
            render_target,
            draw_transform,
            screen_space_transform,
            replica_draw_transform,
            replica_screen_space_transform,
            clip_rect,
            is_clipped,
            content_rect,
            drawable_content_rect: drawable,
            draw_opacity: effect.surface_draw_opacity,
            blend_mode: p.blend_mode,
            layer_list,
            mask_layer: self.id_at(self.mask[i]),
            replica_mask_layer,
        })
    }
}
