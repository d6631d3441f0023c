// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree-wide settings and per-frame inputs to draw-property computation.

use kurbo::Size;

use crate::layer::LayerId;
use crate::transform::Transform3d;

/// Settings fixed for the lifetime of a [`LayerTree`](crate::layer::LayerTree).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerTreeSettings {
    /// Compute ideal contents scales from each layer's screen-space scale, and
    /// derive surface sublayer scales from the owner's screen-space scale.
    pub layer_transforms_should_scale_layer_contents: bool,
    /// When false, only the root owns a render surface and every other
    /// promotion rule is ignored.
    pub can_render_to_separate_surface: bool,
    /// Reject property changes made while the tree is painting.
    pub strict_layer_property_change_checking: bool,
}

impl LayerTreeSettings {
    /// The default settings: separate surfaces on, everything else off.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            layer_transforms_should_scale_layer_contents: false,
            can_render_to_separate_surface: true,
            strict_layer_property_change_checking: false,
        }
    }

    /// Settings for resource-constrained contexts that cannot allocate
    /// intermediate surfaces.
    #[must_use]
    pub const fn single_surface() -> Self {
        Self {
            can_render_to_separate_surface: false,
            ..Self::new()
        }
    }

    /// Settings used by tests that want mutation checks during paint.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            strict_layer_property_change_checking: true,
            ..Self::new()
        }
    }
}

impl Default for LayerTreeSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame inputs to [`LayerTree::calculate_draw_properties`].
///
/// [`LayerTree::calculate_draw_properties`]: crate::layer::LayerTree::calculate_draw_properties
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalcDrawPropsInputs {
    /// Size of the viewport in device pixels. Also the root surface's
    /// content rect.
    pub device_viewport_size: Size,
    /// Extra transform applied above the root, in device pixels.
    pub device_transform: Transform3d,
    /// Device pixels per layout pixel.
    pub device_scale_factor: f64,
    /// Pinch-zoom scale, applied at [`page_scale_layer`](Self::page_scale_layer).
    pub page_scale_factor: f64,
    /// Layer whose content is scaled by the page scale factor.
    pub page_scale_layer: Option<LayerId>,
}

impl CalcDrawPropsInputs {
    /// Inputs for a viewport of `device_viewport_size` with unit scales.
    #[must_use]
    pub const fn new(device_viewport_size: Size) -> Self {
        Self {
            device_viewport_size,
            device_transform: Transform3d::IDENTITY,
            device_scale_factor: 1.0,
            page_scale_factor: 1.0,
            page_scale_layer: None,
        }
    }

    /// Sets the device scale factor.
    #[must_use]
    pub const fn with_device_scale_factor(mut self, scale: f64) -> Self {
        self.device_scale_factor = scale;
        self
    }

    /// Sets the device transform.
    #[must_use]
    pub const fn with_device_transform(mut self, transform: Transform3d) -> Self {
        self.device_transform = transform;
        self
    }

    /// Sets the page scale factor and the layer it applies at.
    #[must_use]
    pub const fn with_page_scale(mut self, layer: LayerId, scale: f64) -> Self {
        self.page_scale_layer = Some(layer);
        self.page_scale_factor = scale;
        self
    }
}
