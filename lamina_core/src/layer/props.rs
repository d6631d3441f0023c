// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer property records.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use super::blend::BlendMode;
use super::filter::FilterOperations;
use super::id::LayerId;
use super::region::Region;
use crate::property_trees::{NO_NODE, NodeId};
use crate::transform::Transform3d;

/// Per-layer boolean flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerFlags {
    /// Clip the subtree to the layer's bounds.
    pub masks_to_bounds: bool,
    /// The layer's content is fully opaque.
    pub contents_opaque: bool,
    /// Draw the layer even when its back faces the viewer.
    pub double_sided: bool,
    /// Flatten the transform children inherit onto the z = 0 plane.
    pub should_flatten_transform: bool,
    /// The layer has content of its own to draw.
    pub is_drawable: bool,
    /// Hide the layer and everything below it.
    pub hide_layer_and_subtree: bool,
    /// Always give the layer its own render surface.
    pub force_render_surface: bool,
    /// Fixed-position descendants are positioned relative to this layer.
    pub is_container_for_fixed_position_layers: bool,
    /// Position relative to the nearest fixed-position container instead of
    /// scrolling with intermediate ancestors.
    pub fixed_position: bool,
    /// The user may scroll horizontally.
    pub user_scrollable_horizontal: bool,
    /// The user may scroll vertically.
    pub user_scrollable_vertical: bool,
}

impl Default for LayerFlags {
    fn default() -> Self {
        Self {
            masks_to_bounds: false,
            contents_opaque: false,
            double_sided: true,
            should_flatten_transform: true,
            is_drawable: false,
            hide_layer_and_subtree: false,
            force_render_surface: false,
            is_container_for_fixed_position_layers: false,
            fixed_position: false,
            user_scrollable_horizontal: true,
            user_scrollable_vertical: true,
        }
    }
}

impl LayerFlags {
    /// Returns true if going from `self` to `other` changes which property
    /// tree nodes or render surfaces exist.
    #[must_use]
    pub fn structural_change(&self, other: &Self) -> bool {
        let a = Self {
            contents_opaque: false,
            user_scrollable_horizontal: false,
            user_scrollable_vertical: false,
            ..*self
        };
        let b = Self {
            contents_opaque: false,
            user_scrollable_horizontal: false,
            user_scrollable_vertical: false,
            ..*other
        };
        a != b
    }
}

/// The persisted, caller-set properties of a layer.
///
/// This is what is pushed to the impl side and what travels in a
/// [`LayerPropertiesMessage`](crate::wire::LayerPropertiesMessage).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerProperties {
    /// Size of the layer.
    pub bounds: Size,
    /// Offset of the layer's origin from its parent's origin.
    pub position: Point,
    /// Local transform, applied about [`transform_origin`](Self::transform_origin).
    pub transform: Transform3d,
    /// Pivot for [`transform`](Self::transform).
    pub transform_origin: [f64; 3],
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Blend mode used when compositing into the render target.
    pub blend_mode: BlendMode,
    /// Boolean flags.
    pub flags: LayerFlags,
    /// Shared 3-D rendering context; 0 means none.
    pub sorting_context_id: i32,
    /// Current scroll offset.
    pub scroll_offset: Vec2,
    /// The layer whose bounds clip this layer's scrolling; setting it makes
    /// the layer scrollable.
    pub scroll_clip_layer: Option<LayerId>,
    /// Reasons scrolling must happen on the main thread, as a bitmask.
    pub main_thread_scrolling_reasons: u32,
    /// Area where scrolling cannot be handled off the main thread.
    pub non_fast_scrollable_region: Region,
    /// Area with touch handlers.
    pub touch_event_handler_region: Region,
    /// Out-of-order scroll parent.
    pub scroll_parent: Option<LayerId>,
    /// Out-of-order clip parent.
    pub clip_parent: Option<LayerId>,
    /// Filters applied to the rendered subtree.
    pub filters: FilterOperations,
    /// Filters applied to what is behind the layer.
    pub background_filters: FilterOperations,
}

impl Default for LayerProperties {
    fn default() -> Self {
        Self {
            bounds: Size::ZERO,
            position: Point::ORIGIN,
            transform: Transform3d::IDENTITY,
            transform_origin: [0.0; 3],
            opacity: 1.0,
            blend_mode: BlendMode::SrcOver,
            flags: LayerFlags::default(),
            sorting_context_id: 0,
            scroll_offset: Vec2::ZERO,
            scroll_clip_layer: None,
            main_thread_scrolling_reasons: 0,
            non_fast_scrollable_region: Region::new(),
            touch_event_handler_region: Region::new(),
            scroll_parent: None,
            clip_parent: None,
            filters: FilterOperations::new(),
            background_filters: FilterOperations::new(),
        }
    }
}

impl LayerProperties {
    /// The layer's bounds as a rect at the origin.
    #[must_use]
    pub fn bounds_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.bounds)
    }

    /// Returns true if the layer can be scrolled.
    #[must_use]
    pub fn is_scrollable(&self) -> bool {
        self.scroll_clip_layer.is_some()
    }

    /// Returns true if the transform can be folded into a layer offset.
    #[must_use]
    pub fn transform_is_translation_only(&self) -> bool {
        self.transform.is_2d_translation()
    }

    /// Returns true if the origin is anywhere other than (0, 0, 0).
    #[must_use]
    pub fn has_transform_origin(&self) -> bool {
        self.transform_origin != [0.0; 3]
    }
}

/// Animation signals supplied by the animation system.
///
/// Curves are evaluated elsewhere; this is only what the draw-property
/// computation needs to know about them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationState {
    /// An opacity animation is running now.
    pub is_animating_opacity: bool,
    /// An opacity animation exists and may start running.
    pub has_potential_opacity_animation: bool,
    /// A transform animation is running now.
    pub is_animating_transform: bool,
    /// A transform animation exists and may start running.
    pub has_potential_transform_animation: bool,
    /// Every transform animation is a pure translation.
    pub has_only_translation_transform_animations: bool,
    /// Largest scale any running transform animation reaches.
    pub maximum_target_scale: f64,
}

impl AnimationState {
    /// Opacity may change without a commit.
    #[must_use]
    pub const fn opacity_can_animate(&self) -> bool {
        self.is_animating_opacity || self.has_potential_opacity_animation
    }

    /// Transform may change without a commit.
    #[must_use]
    pub const fn transform_can_animate(&self) -> bool {
        self.is_animating_transform || self.has_potential_transform_animation
    }
}

/// Which slot of its parent a layer occupies.
///
/// Masks and replicas have a parent pointer but are not in the child list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerRole {
    /// An ordinary child (or a detached layer).
    #[default]
    Child,
    /// The mask of its parent.
    Mask,
    /// The replica of its parent.
    Replica,
}

/// Cached property-tree indices for one layer.
///
/// Valid only while [`sequence_number`](Self::sequence_number) matches the
/// property trees'; see [`LayerTree::transform_tree_index`].
///
/// [`LayerTree::transform_tree_index`]: super::LayerTree::transform_tree_index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeIndices {
    /// Transform node.
    pub transform: NodeId,
    /// Clip node.
    pub clip: NodeId,
    /// Effect node.
    pub effect: NodeId,
    /// Scroll node.
    pub scroll: NodeId,
    /// Property-tree sequence number these indices were computed at.
    pub sequence_number: u64,
}

impl Default for TreeIndices {
    fn default() -> Self {
        Self {
            transform: NO_NODE,
            clip: NO_NODE,
            effect: NO_NODE,
            scroll: NO_NODE,
            sequence_number: 0,
        }
    }
}

/// Per-layer copy request queue.
pub(crate) type CopyQueue = Vec<super::copy::CopyOutputRequest>;
