// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON snapshots for lamina diagnostics.
//!
//! This crate provides development aids on top of `lamina_core`:
//!
//! - [`pretty::PrettyPrintSink`]: a [`TraceSink`](lamina_core::trace::TraceSink)
//!   that writes one human-readable line per event.
//! - [`json`]: JSON export and import of
//!   [`LayerTreeMessage`](lamina_core::wire::LayerTreeMessage)s, and a JSON
//!   dump of computed draw properties and render surfaces.

pub mod json;
pub mod pretty;
