// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for commits and draw-property passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! tree builder, draw-properties calculator, and push step call at each stage.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`LayerChange`] events plus the
//!   corresponding `TraceSink` method.

#[cfg(feature = "trace-rich")]
use crate::layer::LayerId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a commit or draw pass is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Rebuilding the four property trees from the layer tree.
    BuildPropertyTrees,
    /// Recomputing cached transform-tree outputs.
    UpdateTransforms,
    /// Per-layer draw transforms, clips, visible rects, and opacities.
    ComputeDrawProperties,
    /// Assembling the render surface layer list.
    BuildSurfaceList,
    /// Copying dirty layers to the impl-side tree.
    PushProperties,
}

/// Which property of a layer changed.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerField {
    /// Bounds.
    Bounds,
    /// Position or transform origin.
    Position,
    /// Local transform.
    Transform,
    /// Opacity value.
    Opacity,
    /// Blend mode.
    BlendMode,
    /// Boolean flags (masks-to-bounds, double-sided, ...).
    Flags,
    /// Scroll offset or scroll configuration.
    Scroll,
    /// Clip or scroll parent relations.
    Relations,
    /// Filters or background filters.
    Filters,
    /// Copy requests.
    CopyRequests,
    /// Topology (children, mask, replica).
    Topology,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Source frame number of the tree when the phase started.
    pub frame: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Source frame number of the tree when the phase ended.
    pub frame: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted after the property trees were rebuilt.
#[derive(Clone, Copy, Debug)]
pub struct PropertyTreesBuiltEvent {
    /// The new sequence number.
    pub sequence_number: u64,
    /// Transform nodes, including the sentinel.
    pub transform_nodes: usize,
    /// Clip nodes, including the sentinel.
    pub clip_nodes: usize,
    /// Effect nodes, including the sentinel.
    pub effect_nodes: usize,
    /// Scroll nodes, including the sentinel.
    pub scroll_nodes: usize,
}

/// Summary of one draw-properties pass.
#[derive(Clone, Copy, Debug)]
pub struct DrawPropertiesEvent {
    /// Source frame number.
    pub frame: u64,
    /// Whether the property trees were rebuilt for this pass.
    pub rebuilt_property_trees: bool,
    /// Render surfaces in the final list.
    pub render_surfaces: usize,
    /// Layers drawn into some surface.
    pub drawn_layers: usize,
    /// Surfaces dropped because they had nothing to draw.
    pub pruned_surfaces: usize,
}

/// Summary of one push to the impl side.
#[derive(Clone, Copy, Debug)]
pub struct PushPropertiesEvent {
    /// Source frame number.
    pub frame: u64,
    /// Whether the impl tree structure was synced.
    pub full_tree_sync: bool,
    /// Layers whose properties were copied.
    pub layers_pushed: usize,
}

/// A per-layer change record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerChange {
    /// The layer that changed.
    pub layer: LayerId,
    /// Which field changed.
    pub field: LayerField,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after a property-tree rebuild.
    fn on_property_trees_built(&mut self, e: &PropertyTreesBuiltEvent) {
        _ = e;
    }

    /// Called after a draw-properties pass.
    fn on_draw_properties(&mut self, e: &DrawPropertiesEvent) {
        _ = e;
    }

    /// Called after a push to the impl side.
    fn on_push_properties(&mut self, e: &PushPropertiesEvent) {
        _ = e;
    }

    /// Called with the layer changes carried by a push (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_layer_changes(&mut self, frame: u64, changes: &[LayerChange]) {
        _ = (frame, changes);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, frame: u64, phase: PhaseKind) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(&PhaseBeginEvent { frame, phase });
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (frame, phase);
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, frame: u64, phase: PhaseKind) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(&PhaseEndEvent { frame, phase });
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (frame, phase);
        }
    }

    /// Emits a [`PropertyTreesBuiltEvent`].
    #[inline]
    pub fn property_trees_built(&mut self, e: &PropertyTreesBuiltEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_property_trees_built(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DrawPropertiesEvent`].
    #[inline]
    pub fn draw_properties(&mut self, e: &DrawPropertiesEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_draw_properties(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PushPropertiesEvent`].
    #[inline]
    pub fn push_properties(&mut self, e: &PushPropertiesEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_push_properties(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits layer changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn layer_changes(&mut self, frame: u64, changes: &[LayerChange]) {
        if let Some(s) = &mut self.sink {
            s.on_layer_changes(frame, changes);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
