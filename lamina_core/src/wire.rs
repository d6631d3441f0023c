// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wire messages for moving a layer tree across a process or thread boundary.
//!
//! A [`LayerTreeMessage`] carries two parts:
//!
//! - the structure, as a nested [`LayerNodeMessage`] tree with parent ids and
//!   mask/replica sub-messages;
//! - a flat list of [`LayerPropertiesMessage`]s keyed by layer id, one full
//!   property record per layer.
//!
//! Messages replace state rather than describe a diff. Decoding validates the
//! whole message before touching any tree, so a malformed message never leaves
//! a half-applied result.
//!
//! With the `serde` feature the message types implement `Serialize` and
//! `Deserialize`.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::layer::{BlendMode, CopyOutputRequest, INVALID, LayerId, LayerProperties, LayerTree};
use crate::settings::LayerTreeSettings;

/// One node of the structural part of a message.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerNodeMessage {
    /// The layer.
    pub id: LayerId,
    /// The parent the sender had; `None` for the root.
    pub parent_id: Option<LayerId>,
    /// Children in paint order.
    pub children: Vec<LayerNodeMessage>,
    /// Mask layer subtree.
    pub mask: Option<Box<LayerNodeMessage>>,
    /// Replica layer subtree.
    pub replica: Option<Box<LayerNodeMessage>>,
}

/// The full property record of one layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerPropertiesMessage {
    /// The layer these properties belong to.
    pub id: LayerId,
    /// Persisted properties.
    pub properties: LayerProperties,
    /// Copy requests not yet handed to the impl side.
    pub copy_requests: Vec<CopyOutputRequest>,
}

/// A whole layer tree.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerTreeMessage {
    /// Structure, or `None` for a tree without a root.
    pub root: Option<LayerNodeMessage>,
    /// Properties of every layer in [`root`](Self::root).
    pub properties: Vec<LayerPropertiesMessage>,
}

/// Why a message was rejected.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum WireError {
    /// A layer appears twice in the structure or the property list.
    #[error("layer {0} appears more than once")]
    DuplicateId(LayerId),
    /// A layer in the structure has no property record.
    #[error("layer {0} has no properties message")]
    MissingProperties(LayerId),
    /// A property record names a layer the receiver does not know.
    #[error("properties for unknown layer {0}")]
    UnknownLayer(LayerId),
    /// A relation points at a layer outside the tree, or a layer is its own
    /// scroll or clip parent.
    #[error("layer {layer} refers to unknown layer {target}")]
    DanglingReference {
        /// The layer holding the reference.
        layer: LayerId,
        /// The missing layer.
        target: LayerId,
    },
    /// A layer uses a blend mode layers may not use.
    #[error("layer {layer} uses blend mode {mode:?}, which is not allowed on layers")]
    DisallowedBlendMode {
        /// The offending layer.
        layer: LayerId,
        /// Its blend mode.
        mode: BlendMode,
    },
    /// Opacity outside `[0, 1]`, or not a number.
    #[error("layer {layer} has opacity {opacity} outside [0, 1]")]
    OpacityOutOfRange {
        /// The offending layer.
        layer: LayerId,
        /// Its opacity.
        opacity: f32,
    },
    /// A node's parent id disagrees with where it sits in the structure.
    #[error("layer {layer} claims parent {claimed:?} but is nested under {actual:?}")]
    ParentMismatch {
        /// The offending layer.
        layer: LayerId,
        /// Parent id carried by the node.
        claimed: Option<LayerId>,
        /// Parent implied by the nesting.
        actual: Option<LayerId>,
    },
}

impl LayerTree {
    /// Encodes the attached part of the tree.
    ///
    /// Scroll and clip relations that point at detached layers are left out.
    #[must_use]
    pub fn to_message(&self) -> LayerTreeMessage {
        if self.root == INVALID {
            return LayerTreeMessage::default();
        }
        let order = self.subtree_slots(self.root);
        let present: BTreeSet<LayerId> = order.iter().map(|&idx| self.id[idx as usize]).collect();
        let inside = |id: Option<LayerId>| id.filter(|id| present.contains(id));

        let properties = order
            .iter()
            .map(|&idx| {
                let i = idx as usize;
                let mut properties = self.props[i].clone();
                properties.scroll_parent = inside(properties.scroll_parent);
                properties.clip_parent = inside(properties.clip_parent);
                properties.scroll_clip_layer = inside(properties.scroll_clip_layer);
                LayerPropertiesMessage {
                    id: self.id[i],
                    properties,
                    copy_requests: self.copy_requests[i].clone(),
                }
            })
            .collect();

        LayerTreeMessage {
            root: Some(self.node_message(self.root, None)),
            properties,
        }
    }

    fn node_message(&self, idx: u32, parent_id: Option<LayerId>) -> LayerNodeMessage {
        let i = idx as usize;
        let id = self.id[i];
        let sub = |slot: u32| {
            (slot != INVALID).then(|| Box::new(self.node_message(slot, Some(id))))
        };
        let mut children = Vec::new();
        let mut child = self.first_child[i];
        while child != INVALID {
            children.push(self.node_message(child, Some(id)));
            child = self.next_sibling[child as usize];
        }
        LayerNodeMessage {
            id,
            parent_id,
            children,
            mask: sub(self.mask[i]),
            replica: sub(self.replica[i]),
        }
    }

    /// Decodes a message into a new tree.
    ///
    /// The tree keeps the message's layer ids; its allocator continues after
    /// the largest one.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] if the message is inconsistent. Nothing is
    /// built in that case.
    pub fn from_message(
        settings: LayerTreeSettings,
        message: &LayerTreeMessage,
    ) -> Result<Self, WireError> {
        let mut nodes = Vec::new();
        if let Some(root) = &message.root {
            collect_nodes(root, None, &mut nodes)?;
        }
        let known: BTreeSet<LayerId> = nodes.iter().map(|n| n.id).collect();

        let mut by_id = BTreeMap::new();
        for p in &message.properties {
            if !known.contains(&p.id) {
                return Err(WireError::UnknownLayer(p.id));
            }
            if by_id.insert(p.id, p).is_some() {
                return Err(WireError::DuplicateId(p.id));
            }
            validate_properties(p, |id| known.contains(&id))?;
        }
        if let Some(missing) = nodes.iter().find(|n| !by_id.contains_key(&n.id)) {
            return Err(WireError::MissingProperties(missing.id));
        }

        let mut tree = Self::new(settings);
        for node in &nodes {
            tree.create_layer_with_id(node.id);
        }
        if let Some(root) = &message.root {
            tree.set_root_layer(Some(root.id));
        }
        for node in &nodes {
            for child in &node.children {
                tree.add_child(node.id, child.id);
            }
            if let Some(mask) = &node.mask {
                tree.set_mask_layer(node.id, Some(mask.id));
            }
            if let Some(replica) = &node.replica {
                tree.set_replica_layer(node.id, Some(replica.id));
            }
        }
        for node in &nodes {
            if let Some(p) = by_id.get(&node.id) {
                tree.write_properties(p);
            }
        }
        Ok(tree)
    }

    /// Applies one property record to an existing layer.
    ///
    /// Goes through the ordinary setters, so dirty tracking and rebuild
    /// decisions are the same as for local changes.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] if the layer or a layer it refers to is
    /// unknown, or a value is out of range. The tree is unchanged then.
    pub fn apply_properties(&mut self, message: &LayerPropertiesMessage) -> Result<(), WireError> {
        if !self.contains(message.id) {
            return Err(WireError::UnknownLayer(message.id));
        }
        validate_properties(message, |id| self.contains(id))?;
        self.write_properties(message);
        Ok(())
    }

    fn write_properties(&mut self, message: &LayerPropertiesMessage) {
        let id = message.id;
        let p = &message.properties;
        self.set_bounds(id, p.bounds);
        self.set_position(id, p.position);
        self.set_transform(id, p.transform);
        self.set_transform_origin(id, p.transform_origin);
        self.set_opacity(id, p.opacity);
        self.set_blend_mode(id, p.blend_mode);
        self.set_flags(id, p.flags);
        self.set_sorting_context_id(id, p.sorting_context_id);
        self.set_scroll_clip_layer(id, p.scroll_clip_layer);
        self.set_scroll_offset(id, p.scroll_offset);
        self.set_main_thread_scrolling_reasons(id, p.main_thread_scrolling_reasons);
        self.set_non_fast_scrollable_region(id, p.non_fast_scrollable_region.clone());
        self.set_touch_event_handler_region(id, p.touch_event_handler_region.clone());
        self.set_scroll_parent(id, p.scroll_parent);
        self.set_clip_parent(id, p.clip_parent);
        self.set_filters(id, p.filters.clone());
        self.set_background_filters(id, p.background_filters.clone());
        for request in &message.copy_requests {
            self.request_copy_of_output(id, *request);
        }
    }
}

/// Flattens `node` in pre-order, checking ids and parent links.
fn collect_nodes<'a>(
    node: &'a LayerNodeMessage,
    actual: Option<LayerId>,
    out: &mut Vec<&'a LayerNodeMessage>,
) -> Result<(), WireError> {
    if node.parent_id != actual {
        return Err(WireError::ParentMismatch {
            layer: node.id,
            claimed: node.parent_id,
            actual,
        });
    }
    if out.iter().any(|n| n.id == node.id) {
        return Err(WireError::DuplicateId(node.id));
    }
    out.push(node);
    for sub in [&node.mask, &node.replica].into_iter().flatten() {
        collect_nodes(sub, Some(node.id), out)?;
    }
    for child in &node.children {
        collect_nodes(child, Some(node.id), out)?;
    }
    Ok(())
}

fn validate_properties(
    message: &LayerPropertiesMessage,
    known: impl Fn(LayerId) -> bool,
) -> Result<(), WireError> {
    let layer = message.id;
    let p = &message.properties;
    if !(0.0..=1.0).contains(&p.opacity) {
        return Err(WireError::OpacityOutOfRange {
            layer,
            opacity: p.opacity,
        });
    }
    if !p.blend_mode.is_allowed_for_layers() {
        return Err(WireError::DisallowedBlendMode {
            layer,
            mode: p.blend_mode,
        });
    }
    let self_relation = [p.scroll_parent, p.clip_parent].contains(&Some(layer));
    let relations = [p.scroll_parent, p.clip_parent, p.scroll_clip_layer];
    if let Some(target) = relations
        .into_iter()
        .flatten()
        .find(|&target| !known(target) || self_relation && target == layer)
    {
        return Err(WireError::DanglingReference { layer, target });
    }
    Ok(())
}
