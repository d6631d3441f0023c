// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pushing layer properties to the impl-side tree.
//!
//! The [`LayerTree`] is the authoritative copy that callers mutate. An
//! [`ImplLayerTree`] is the counterpart a compositor draws from. A push copies
//! what changed since the previous push:
//!
//! - After a structural change (anything that marked the topology channel, or
//!   a fresh tree) the impl tree's structure is resynced and every attached
//!   layer is copied.
//! - Otherwise only layers drained from the properties channel are copied.
//!
//! Values the impl side is animating on its own clock are never overwritten
//! by a push. Pending copy requests move to the impl side.
//!
//! Pushing twice in a row is harmless: the second push finds nothing dirty.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::dirty;
use crate::layer::{
    AnimationState, CopyOutputRequest, INVALID, LayerId, LayerProperties, LayerRole, LayerTree,
};
use crate::trace::{PhaseKind, PushPropertiesEvent, Tracer};
use crate::transform::Transform3d;

/// The impl-side counterpart of one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ImplLayer {
    id: LayerId,
    parent: Option<LayerId>,
    role: LayerRole,
    children: Vec<LayerId>,
    mask: Option<LayerId>,
    replica: Option<LayerId>,
    properties: LayerProperties,
    animation: AnimationState,
    copy_requests: Vec<CopyOutputRequest>,
    opacity_is_animating: bool,
    transform_is_animating: bool,
    pushed_frame: u64,
}

impl ImplLayer {
    fn new(id: LayerId) -> Self {
        Self {
            id,
            parent: None,
            role: LayerRole::Child,
            children: Vec::new(),
            mask: None,
            replica: None,
            properties: LayerProperties::default(),
            animation: AnimationState::default(),
            copy_requests: Vec::new(),
            opacity_is_animating: false,
            transform_is_animating: false,
            pushed_frame: 0,
        }
    }

    /// The layer's id, shared with its main-side layer.
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// The parent at the last structural sync.
    #[must_use]
    pub fn parent(&self) -> Option<LayerId> {
        self.parent
    }

    /// Which slot of its parent the layer occupies.
    #[must_use]
    pub fn role(&self) -> LayerRole {
        self.role
    }

    /// Children in paint order.
    #[must_use]
    pub fn children(&self) -> &[LayerId] {
        &self.children
    }

    /// Mask layer.
    #[must_use]
    pub fn mask_layer(&self) -> Option<LayerId> {
        self.mask
    }

    /// Replica layer.
    #[must_use]
    pub fn replica_layer(&self) -> Option<LayerId> {
        self.replica
    }

    /// Properties as of the last push (or as animated on the impl side).
    #[must_use]
    pub fn properties(&self) -> &LayerProperties {
        &self.properties
    }

    /// Animation signals as of the last push.
    #[must_use]
    pub fn animation_state(&self) -> AnimationState {
        self.animation
    }

    /// Copy requests handed over by pushes and not yet taken.
    #[must_use]
    pub fn copy_requests(&self) -> &[CopyOutputRequest] {
        &self.copy_requests
    }

    /// Removes and returns the pending copy requests.
    pub fn take_copy_requests(&mut self) -> Vec<CopyOutputRequest> {
        core::mem::take(&mut self.copy_requests)
    }

    /// Returns true if the impl side drives this layer's opacity.
    #[must_use]
    pub fn opacity_is_animating(&self) -> bool {
        self.opacity_is_animating
    }

    /// Returns true if the impl side drives this layer's transform.
    #[must_use]
    pub fn transform_is_animating(&self) -> bool {
        self.transform_is_animating
    }

    /// Source frame number of the push that last copied this layer.
    #[must_use]
    pub fn pushed_frame(&self) -> u64 {
        self.pushed_frame
    }
}

/// The impl-side tree a push writes into.
#[derive(Clone, Debug, Default)]
pub struct ImplLayerTree {
    layers: BTreeMap<LayerId, ImplLayer>,
    root: Option<LayerId>,
    source_frame_number: u64,
}

impl ImplLayerTree {
    /// Creates an empty impl tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the tree holds no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Root layer at the last structural sync.
    #[must_use]
    pub fn root_layer(&self) -> Option<LayerId> {
        self.root
    }

    /// Source frame number of the last push received.
    #[must_use]
    pub fn source_frame_number(&self) -> u64 {
        self.source_frame_number
    }

    /// The impl layer for `id`, if it exists.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&ImplLayer> {
        self.layers.get(&id)
    }

    /// Mutable access to the impl layer for `id`.
    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut ImplLayer> {
        self.layers.get_mut(&id)
    }

    /// Ids of every layer, in ascending order.
    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.keys().copied()
    }

    /// Marks whether the impl side drives the layer's opacity.
    ///
    /// # Panics
    ///
    /// Panics if the layer is unknown.
    pub fn set_opacity_animating(&mut self, id: LayerId, animating: bool) {
        self.expect_layer(id).opacity_is_animating = animating;
    }

    /// Marks whether the impl side drives the layer's transform.
    ///
    /// # Panics
    ///
    /// Panics if the layer is unknown.
    pub fn set_transform_animating(&mut self, id: LayerId, animating: bool) {
        self.expect_layer(id).transform_is_animating = animating;
    }

    /// Applies an impl-side animated opacity.
    ///
    /// # Panics
    ///
    /// Panics if the layer is unknown or `opacity` is outside `[0, 1]`.
    pub fn animate_opacity(&mut self, id: LayerId, opacity: f32) {
        assert!(
            (0.0..=1.0).contains(&opacity),
            "opacity {opacity} outside [0, 1]"
        );
        self.expect_layer(id).properties.opacity = opacity;
    }

    /// Applies an impl-side animated transform.
    ///
    /// # Panics
    ///
    /// Panics if the layer is unknown.
    pub fn animate_transform(&mut self, id: LayerId, transform: Transform3d) {
        self.expect_layer(id).properties.transform = transform;
    }

    fn expect_layer(&mut self, id: LayerId) -> &mut ImplLayer {
        match self.layers.get_mut(&id) {
            Some(layer) => layer,
            None => panic!("unknown impl LayerId: {id:?}"),
        }
    }
}

impl LayerTree {
    /// Copies pending changes into `target` and clears the commit flags.
    ///
    /// Returns a summary of what was pushed.
    pub fn push_properties_to(
        &mut self,
        target: &mut ImplLayerTree,
        tracer: &mut Tracer<'_>,
    ) -> PushPropertiesEvent {
        let frame = self.source_frame_number + 1;
        tracer.phase_begin(frame, PhaseKind::PushProperties);
        self.sync_host_registration();

        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        let dirty_props: Vec<u32> = self
            .dirty
            .drain(dirty::PROPERTIES)
            .deterministic()
            .run()
            .collect();
        let full_tree_sync = self.needs_full_tree_sync || !topology.is_empty();

        let order = if self.root == INVALID {
            Vec::new()
        } else {
            self.subtree_slots(self.root)
        };

        let to_push: Vec<u32> = if full_tree_sync {
            self.sync_structure(target, &order);
            order
        } else {
            dirty_props
                .into_iter()
                .filter(|&idx| self.live[idx as usize] && self.attached[idx as usize])
                .collect()
        };

        let mut moved_copy_requests = false;
        for &idx in &to_push {
            moved_copy_requests |= self.push_layer(idx, target, frame);
        }
        if moved_copy_requests {
            // Surfaces forced by the requests are no longer needed here.
            self.property_trees.set_needs_rebuild(true);
        }

        self.needs_commit = false;
        self.needs_full_tree_sync = false;
        self.source_frame_number = frame;
        target.source_frame_number = frame;

        #[cfg(feature = "trace-rich")]
        {
            let changes = core::mem::take(&mut self.pending_changes);
            tracer.layer_changes(frame, &changes);
        }

        let event = PushPropertiesEvent {
            frame,
            full_tree_sync,
            layers_pushed: to_push.len(),
        };
        tracer.push_properties(&event);
        tracer.phase_end(frame, PhaseKind::PushProperties);
        event
    }

    /// Makes `target`'s structure match the attached layers in `order`.
    fn sync_structure(&self, target: &mut ImplLayerTree, order: &[u32]) {
        let keep: BTreeSet<LayerId> = order.iter().map(|&idx| self.id[idx as usize]).collect();
        target.layers.retain(|id, _| keep.contains(id));
        target.root = self.id_at(self.root);

        for &idx in order {
            let i = idx as usize;
            let id = self.id[i];
            let parent = self.id_at(self.parent[i]).filter(|_| idx != self.root);
            let children = self.children(id).collect();
            let layer = target.layers.entry(id).or_insert_with(|| ImplLayer::new(id));
            layer.parent = parent;
            layer.role = self.role[i];
            layer.children = children;
            layer.mask = self.id_at(self.mask[i]);
            layer.replica = self.id_at(self.replica[i]);
        }
    }

    /// Copies one layer. Returns true if copy requests moved.
    fn push_layer(&mut self, idx: u32, target: &mut ImplLayerTree, frame: u64) -> bool {
        let i = idx as usize;
        let id = self.id[i];
        let Some(layer) = target.layers.get_mut(&id) else {
            return false;
        };

        let opacity = layer.properties.opacity;
        let transform = layer.properties.transform;
        layer.properties.clone_from(&self.props[i]);
        if layer.opacity_is_animating {
            layer.properties.opacity = opacity;
        }
        if layer.transform_is_animating {
            layer.properties.transform = transform;
        }
        layer.animation = self.animation[i];
        layer.pushed_frame = frame;

        if self.copy_requests[i].is_empty() {
            return false;
        }
        layer.copy_requests.append(&mut self.copy_requests[i]);
        true
    }
}
