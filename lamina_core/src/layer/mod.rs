// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree data model and draw-property computation.
//!
//! A *layer* is a node in a compositing tree. Each layer has:
//!
//! - An identity ([`LayerId`]) drawn from a [`LayerIdAllocator`]. Ids are
//!   monotonic from 1 and never reused.
//! - A slot: an ordinary child, the [mask](LayerTree::set_mask_layer) of its
//!   parent, or the [replica](LayerTree::set_replica_layer) of its parent.
//!   Attaching a layer somewhere detaches it from wherever it was.
//! - Out-of-order relations: a [scroll parent](LayerTree::set_scroll_parent)
//!   and a [clip parent](LayerTree::set_clip_parent) that need not be
//!   ancestors. Both directions are kept in step.
//! - **Properties** set by the caller ([`LayerProperties`]) and animation
//!   state reported by an animation system ([`AnimationState`]).
//! - **Derived state** produced by
//!   [`calculate_draw_properties`](LayerTree::calculate_draw_properties):
//!   [`DrawProperties`] per layer and a [`RenderSurface`] per surface owner.
//!
//! Layers are stored in struct-of-arrays layout and addressed through a map
//! from id to slot.
//!
//! # Dirty tracking
//!
//! Setters compare against the stored value and do nothing on equality.
//! Otherwise they mark the layer on a dirty channel (see
//! [`dirty`](crate::dirty)) and decide how much derived state went stale:
//!
//! - changes that alter node membership of the property trees (crossing
//!   opacity 1.0, changing a transform's axis alignment, toggling
//!   masks-to-bounds, any topology change) schedule a rebuild;
//! - continuous changes (opacity between two non-1 values, scroll offsets,
//!   transforms of the same class) update the owned node in place.

mod blend;
mod copy;
mod draw;
mod filter;
mod id;
mod property_builder;
mod props;
mod region;
mod store;
mod surface;
mod traverse;

pub use blend::BlendMode;
pub use copy::{CopyOutputRequest, CopySource};
pub use draw::{DrawPassStats, DrawProperties};
pub use filter::{FilterOperation, FilterOperations};
pub use id::{INVALID, LayerId, LayerIdAllocator};
pub use props::{AnimationState, LayerFlags, LayerProperties, LayerRole, TreeIndices};
pub use region::Region;
pub use store::LayerTree;
pub use surface::{Contributor, RenderSurface};
pub use traverse::Children;
