// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip tree.
//!
//! Every clip rect stored here is expressed in the space of a render target
//! (a transform node that owns a render surface), never in screen space.

use kurbo::Rect;

use super::transform::TransformTree;
use super::tree::{NodeId, PropertyTree, ROOT_NODE};
use crate::geometry::{intersect_or_empty, map_clipped_rect, project_clipped_rect};

/// Clip tree node payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipNode {
    // -- Inputs --
    /// Clip in the space of [`transform_id`](Self::transform_id).
    pub clip: Rect,
    /// Transform node the clip rect is expressed in.
    pub transform_id: NodeId,
    /// The owner clips its subtree to [`clip`](Self::clip).
    pub applies_local_clip: bool,
    /// The owner has a render surface; content below starts a new clip.
    pub resets_clip: bool,
    /// The owner's surface holds content clipped by an ancestor above it.
    /// Such a surface is drawn unclipped and its content keeps the ancestor
    /// clip instead.
    pub has_unclipped_descendants: bool,

    // -- Outputs --
    /// Target node [`clip_in_target_space`](Self::clip_in_target_space) is in.
    pub target_id: NodeId,
    /// Clip for content attached to this node.
    pub clip_in_target_space: Rect,
    /// Whether [`clip_in_target_space`](Self::clip_in_target_space) applies.
    /// Tracked separately because a clip can be empty and still apply.
    pub is_clipped: bool,
    /// For resetting nodes: the clip the owner's surface is drawn with, in the
    /// space of the surface's own target.
    pub surface_clip: Rect,
    /// Whether [`surface_clip`](Self::surface_clip) applies.
    pub surface_is_clipped: bool,
    /// Everything that clips content at this node, including ancestor clips
    /// that reset at surfaces and the viewport.
    pub combined_clip_in_target_space: Rect,
}

impl Default for ClipNode {
    fn default() -> Self {
        Self {
            clip: Rect::ZERO,
            transform_id: ROOT_NODE,
            applies_local_clip: false,
            resets_clip: false,
            has_unclipped_descendants: false,
            target_id: ROOT_NODE,
            clip_in_target_space: Rect::ZERO,
            is_clipped: false,
            surface_clip: Rect::ZERO,
            surface_is_clipped: false,
            combined_clip_in_target_space: Rect::ZERO,
        }
    }
}

/// The clip tree.
pub type ClipTree = PropertyTree<ClipNode>;

impl PropertyTree<ClipNode> {
    /// Recomputes every node's outputs from the transform tree.
    ///
    /// `viewport` is in root target space and bounds the combined clip.
    /// The transform tree must be up to date.
    pub fn update(&mut self, transforms: &TransformTree, viewport: Rect) {
        let nodes = self.nodes_mut();
        if let Some(sentinel) = nodes.first_mut() {
            let d = &mut sentinel.data;
            d.transform_id = ROOT_NODE;
            d.target_id = ROOT_NODE;
            d.clip = viewport;
            d.clip_in_target_space = viewport;
            d.is_clipped = false;
            d.combined_clip_in_target_space = viewport;
        }
        for i in 1..nodes.len() {
            let (before, rest) = nodes.split_at_mut(i);
            let node = &mut rest[0];
            let parent = &before[node.parent_id as usize].data;
            let data = &mut node.data;

            let transform = &transforms.node(data.transform_id).data;
            data.target_id = transform.content_target_id;
            let local = if data.applies_local_clip {
                Some(map_clipped_rect(&transform.content_to_target(), data.clip))
            } else {
                None
            };

            let inherited = convert_clip_rect(
                transforms,
                parent.clip_in_target_space,
                parent.target_id,
                data.target_id,
            );
            let inherited_combined = convert_clip_rect(
                transforms,
                parent.combined_clip_in_target_space,
                parent.target_id,
                data.target_id,
            );

            if data.resets_clip && !data.has_unclipped_descendants {
                let surface_target = transform.target_id;
                let clip = convert_clip_rect(
                    transforms,
                    parent.clip_in_target_space,
                    parent.target_id,
                    surface_target,
                );
                data.surface_is_clipped = parent.is_clipped && clip.is_some();
                data.surface_clip = clip.unwrap_or(Rect::ZERO);
                data.is_clipped = local.is_some();
                data.clip_in_target_space = local.unwrap_or(Rect::ZERO);
            } else {
                match (local, inherited.filter(|_| parent.is_clipped)) {
                    (Some(l), Some(i)) => {
                        data.is_clipped = true;
                        data.clip_in_target_space = intersect_or_empty(l, i);
                    }
                    (Some(c), None) | (None, Some(c)) => {
                        data.is_clipped = true;
                        data.clip_in_target_space = c;
                    }
                    (None, None) => {
                        data.is_clipped = false;
                        data.clip_in_target_space = Rect::ZERO;
                    }
                }
                data.surface_is_clipped = false;
                data.surface_clip = Rect::ZERO;
            }

            // An ancestor clip that cannot be carried into this space is
            // dropped rather than guessed at.
            data.combined_clip_in_target_space = match (local, inherited_combined) {
                (Some(l), Some(i)) => intersect_or_empty(l, i),
                (Some(c), None) | (None, Some(c)) => c,
                (None, None) => UNBOUNDED,
            };
        }
        self.set_needs_update(false);
    }
}

const UNBOUNDED: Rect = Rect::new(-1.0e9, -1.0e9, 1.0e9, 1.0e9);

/// Moves a clip rect from the surface space of target `from` into the surface
/// space of target `to`.
///
/// Going down into a descendant surface unprojects through the inverse; going
/// up maps forward. Returns `None` if the spaces are not related by an
/// invertible transform.
pub(crate) fn convert_clip_rect(
    transforms: &TransformTree,
    rect: Rect,
    from: NodeId,
    to: NodeId,
) -> Option<Rect> {
    if from == to {
        return Some(rect);
    }
    if transforms.is_ancestor_or_self(from, to) {
        let to_from = transforms.target_to_target(to, from)?;
        let from_to = to_from.inverse()?;
        Some(project_clipped_rect(&from_to, rect))
    } else {
        let from_to = transforms.target_to_target(from, to)?;
        Some(map_clipped_rect(&from_to, rect))
    }
}
