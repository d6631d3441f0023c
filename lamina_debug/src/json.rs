// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of layer trees.
//!
//! [`export_tree`] and [`import_tree`] move a whole tree through its
//! [`LayerTreeMessage`] in JSON form. [`draw_snapshot`] dumps what the last
//! draw-properties pass computed, for diffing in tests and bug reports.

use std::io::{Read, Write};

use kurbo::Rect;
use serde_json::{Value, json};

use lamina_core::layer::{Contributor, LayerTree};
use lamina_core::settings::LayerTreeSettings;
use lamina_core::transform::Transform3d;
use lamina_core::wire::{LayerTreeMessage, WireError};

/// Why a JSON snapshot could not be imported.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The input is not a valid message.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The message is well-formed but inconsistent.
    #[error("invalid layer tree: {0}")]
    Wire(#[from] WireError),
}

/// Writes the attached part of `tree` as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn export_tree(tree: &LayerTree, writer: &mut dyn Write) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, &tree.to_message())
}

/// Reads a tree written by [`export_tree`].
///
/// # Errors
///
/// Returns [`ImportError::Json`] for malformed input and
/// [`ImportError::Wire`] if the message fails validation.
pub fn import_tree(settings: LayerTreeSettings, reader: impl Read) -> Result<LayerTree, ImportError> {
    let message: LayerTreeMessage = serde_json::from_reader(reader)?;
    Ok(LayerTree::from_message(settings, &message)?)
}

/// Draw properties of every attached layer and the render surface list, as
/// computed by the last draw-properties pass.
#[must_use]
pub fn draw_snapshot(tree: &LayerTree) -> Value {
    let layers: Vec<Value> = tree
        .layer_ids()
        .filter(|&id| tree.is_attached(id))
        .map(|id| {
            let d = tree.draw_properties(id);
            json!({
                "id": id.get(),
                "is_drawn": d.is_drawn,
                "render_target": d.render_target.map(|t| t.get()),
                "draw_transform": matrix(&d.draw_transform),
                "screen_space_transform": matrix(&d.screen_space_transform),
                "clip_rect": rect(d.clip_rect),
                "is_clipped": d.is_clipped,
                "visible_layer_rect": rect(d.visible_layer_rect),
                "drawable_content_rect": rect(d.drawable_content_rect),
                "opacity": d.opacity,
                "blend_mode": format!("{:?}", d.blend_mode),
            })
        })
        .collect();

    let surfaces: Vec<Value> = tree
        .render_surface_layer_list()
        .iter()
        .filter_map(|&owner| tree.render_surface(owner))
        .map(|s| {
            let contributors: Vec<Value> = s
                .layer_list
                .iter()
                .map(|c| match c {
                    Contributor::Layer(id) => json!({ "layer": id.get() }),
                    Contributor::Surface(id) => json!({ "surface": id.get() }),
                })
                .collect();
            json!({
                "owner": s.owner.get(),
                "render_target": s.render_target.map(|t| t.get()),
                "draw_transform": matrix(&s.draw_transform),
                "content_rect": rect(s.content_rect),
                "drawable_content_rect": rect(s.drawable_content_rect),
                "clip_rect": rect(s.clip_rect),
                "is_clipped": s.is_clipped,
                "draw_opacity": s.draw_opacity,
                "layer_list": contributors,
            })
        })
        .collect();

    json!({
        "source_frame_number": tree.source_frame_number(),
        "layers": layers,
        "render_surfaces": surfaces,
    })
}

fn rect(r: Rect) -> Value {
    json!([r.x0, r.y0, r.x1, r.y1])
}

fn matrix(t: &Transform3d) -> Value {
    json!(t.to_cols_array_2d())
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Size};
    use lamina_core::settings::CalcDrawPropsInputs;

    use super::*;

    fn small_tree() -> LayerTree {
        let mut tree = LayerTree::default();
        let root = tree.create_layer();
        let child = tree.create_layer();
        tree.set_root_layer(Some(root));
        tree.add_child(root, child);
        tree.set_bounds(root, Size::new(100.0, 100.0));
        tree.set_bounds(child, Size::new(20.0, 10.0));
        tree.set_position(child, Point::new(5.0, 5.0));
        tree.set_is_drawable(child, true);
        tree.set_opacity(child, 0.5);
        tree
    }

    #[test]
    fn export_then_import_keeps_properties() {
        let tree = small_tree();
        let mut out = Vec::new();
        export_tree(&tree, &mut out).unwrap();

        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert!(parsed["root"].is_object(), "got: {parsed}");
        assert_eq!(parsed["properties"].as_array().map(Vec::len), Some(2));

        let imported = import_tree(LayerTreeSettings::default(), out.as_slice()).unwrap();
        for id in tree.layer_ids() {
            assert_eq!(imported.properties(id), tree.properties(id));
            assert_eq!(imported.parent(id), tree.parent(id));
        }
    }

    #[test]
    fn import_reports_malformed_json() {
        let err = import_tree(LayerTreeSettings::default(), &b"{ not json"[..]).unwrap_err();
        assert!(matches!(err, ImportError::Json(_)), "got: {err}");
    }

    #[test]
    fn import_reports_invalid_messages() {
        let tree = small_tree();
        let mut message = tree.to_message();
        message.properties.pop();
        let bytes = serde_json::to_vec(&message).unwrap();
        let err = import_tree(LayerTreeSettings::default(), bytes.as_slice()).unwrap_err();
        assert!(
            matches!(err, ImportError::Wire(WireError::MissingProperties(_))),
            "got: {err}"
        );
    }

    #[test]
    fn snapshot_lists_layers_and_surfaces() {
        let mut tree = small_tree();
        tree.calculate_draw_properties(&CalcDrawPropsInputs::new(Size::new(100.0, 100.0)));
        let snapshot = draw_snapshot(&tree);

        let layers = snapshot["layers"].as_array().unwrap();
        assert_eq!(layers.len(), 2);
        let child = &layers[1];
        assert_eq!(child["is_drawn"], json!(true));
        assert_eq!(child["opacity"], json!(0.5));
        assert_eq!(child["drawable_content_rect"], json!([5.0, 5.0, 25.0, 15.0]));

        let surfaces = snapshot["render_surfaces"].as_array().unwrap();
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces[0]["layer_list"], json!([{ "layer": child["id"] }]));
    }
}
