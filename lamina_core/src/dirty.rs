// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The [`LayerTree`](crate::layer::LayerTree) keeps one
//! [`DirtyTracker`](understory_dirty::DirtyTracker) keyed by layer slot. It is
//! the explicit set of "layers with something to push" that replaces per-layer
//! ancestor notification counters.
//!
//! - [`PROPERTIES`] is local-only. A setter marks exactly the layer it
//!   changed; [`push_properties_to`](crate::layer::LayerTree::push_properties_to)
//!   drains it and copies those layers to the impl side.
//! - [`TOPOLOGY`] is local-only and marks the layer whose child list, mask, or
//!   replica slot changed. Any entry forces a full tree sync on the next push.
//! - [`HOST`] propagates eagerly along child → parent dependency edges.
//!   Attaching or detaching a subtree marks it, and the next drain refreshes
//!   every affected layer's host registration.

use understory_dirty::Channel;

/// Layer properties changed and must be pushed.
pub const PROPERTIES: Channel = Channel::new(0);

/// Child list, mask, or replica slot changed.
pub const TOPOLOGY: Channel = Channel::new(1);

/// Host registration must be recomputed for the subtree.
pub const HOST: Channel = Channel::new(2);
