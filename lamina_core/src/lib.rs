// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer trees, property trees, and draw-property computation for
//! compositing.
//!
//! `lamina_core` turns a tree of compositing layers into what a compositor
//! needs to draw them: a draw transform, clip, visible rect, and opacity per
//! layer, plus the ordered list of render surfaces to draw into. It is
//! `no_std` compatible (with `alloc`) and stores layers in struct-of-arrays
//! form addressed by stable [`LayerId`](layer::LayerId)s.
//!
//! # Architecture
//!
//! Mutations mark state dirty; derived state is rebuilt lazily:
//!
//! ```text
//!   LayerTree setters ──► dirty channels + needs_rebuild / needs_update
//!       │
//!       ▼
//!   build_property_trees() ──► PropertyTrees (transform, clip, effect, scroll)
//!       │
//!       ▼
//!   calculate_draw_properties() ──► DrawProperties per layer
//!       │                           RenderSurface per surface owner
//!       │                           render surface layer list
//!       ▼
//!   push_properties_to() ──► ImplLayerTree
//! ```
//!
//! **[`layer`]**: The [`LayerTree`](layer::LayerTree) host: layer creation,
//! topology, properties, the property-tree builder, and the draw pass.
//!
//! **[`property_trees`]**: Transform, clip, effect, and scroll trees with
//! their cached outputs and space conversions.
//!
//! **[`dirty`]**: Dirty channels via `understory_dirty`. Properties and
//! topology are local-only; host registration propagates child to parent.
//!
//! **[`commit`]**: The impl-side [`ImplLayerTree`](commit::ImplLayerTree) and
//! the push that copies dirty layers into it.
//!
//! **[`wire`]**: Message types for sending a tree across a boundary, with
//! validating decode.
//!
//! **[`settings`]**: Per-tree settings and per-frame inputs.
//!
//! **[`geometry`]**: Rect mapping and projection with homogeneous clipping.
//!
//! **[`transform`]**: 4x4 transform type.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! build, draw, and push instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `serde` (disabled by default): `Serialize`/`Deserialize` on layer
//!   properties and [`wire`] messages.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-layer
//!   change events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod commit;
pub mod dirty;
pub mod geometry;
pub mod layer;
pub mod property_trees;
pub mod settings;
pub mod trace;
pub mod transform;
pub mod wire;
