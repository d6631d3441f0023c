// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::trace::{
    DrawPropertiesEvent, LayerChange, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    PropertyTreesBuiltEvent, PushPropertiesEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::BuildPropertyTrees => "build",
        PhaseKind::UpdateTransforms => "transforms",
        PhaseKind::ComputeDrawProperties => "draw-props",
        PhaseKind::BuildSurfaceList => "surfaces",
        PhaseKind::PushProperties => "push",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame,
            phase_name(e.phase),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {}",
            e.frame,
            phase_name(e.phase),
        );
    }

    fn on_property_trees_built(&mut self, e: &PropertyTreesBuiltEvent) {
        let _ = writeln!(
            self.writer,
            "[trees] seq={} transform={} clip={} effect={} scroll={}",
            e.sequence_number, e.transform_nodes, e.clip_nodes, e.effect_nodes, e.scroll_nodes,
        );
    }

    fn on_draw_properties(&mut self, e: &DrawPropertiesEvent) {
        let rebuilt = if e.rebuilt_property_trees {
            "rebuilt"
        } else {
            "reused"
        };
        let _ = writeln!(
            self.writer,
            "[draw] frame={} trees={rebuilt} surfaces={} drawn={} pruned={}",
            e.frame, e.render_surfaces, e.drawn_layers, e.pruned_surfaces,
        );
    }

    fn on_push_properties(&mut self, e: &PushPropertiesEvent) {
        let sync = if e.full_tree_sync { "full" } else { "props" };
        let _ = writeln!(
            self.writer,
            "[push] frame={} sync={sync} layers={}",
            e.frame, e.layers_pushed,
        );
    }

    fn on_layer_changes(&mut self, frame: u64, changes: &[LayerChange]) {
        let _ = writeln!(
            self.writer,
            "[layers] frame={frame} changes={}",
            changes.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;
    use lamina_core::commit::ImplLayerTree;
    use lamina_core::layer::LayerTree;
    use lamina_core::settings::CalcDrawPropsInputs;
    use lamina_core::trace::Tracer;

    use super::*;

    #[test]
    fn pretty_print_phase() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            frame: 3,
            phase: PhaseKind::BuildSurfaceList,
        });
        let output = String::from_utf8(sink.into_writer()).unwrap();
        assert!(output.contains("[phase:begin]"), "got: {output}");
        assert!(output.contains("frame=3 surfaces"), "got: {output}");
    }

    #[test]
    fn draw_and_push_events_are_printed() {
        let mut tree = LayerTree::default();
        let root = tree.create_layer();
        tree.set_root_layer(Some(root));
        tree.set_bounds(root, Size::new(10.0, 10.0));

        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let mut impl_tree = ImplLayerTree::new();
        tree.push_properties_to(&mut impl_tree, &mut Tracer::new(&mut sink));
        tree.calculate_draw_properties_traced(
            &CalcDrawPropsInputs::new(Size::new(10.0, 10.0)),
            &mut Tracer::new(&mut sink),
        );

        let output = String::from_utf8(sink.into_writer()).unwrap();
        assert!(output.contains("[push] frame=1 sync=full layers=1"), "got: {output}");
        assert!(output.contains("[layers] frame=1"), "got: {output}");
        assert!(output.contains("[trees] seq="), "got: {output}");
        assert!(output.contains("[draw] frame=1 trees=rebuilt surfaces=1"), "got: {output}");
        assert!(output.contains("[phase:end] frame=1 draw-props"), "got: {output}");
    }
}
