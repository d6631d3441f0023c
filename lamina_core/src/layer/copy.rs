// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Copy-of-output requests.

use kurbo::Rect;

use crate::geometry::rect_is_empty;

/// Identifies who asked for a copy, so a newer request can supersede an
/// older one from the same place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CopySource(pub u64);

/// A request to read back the rendered output of a layer's subtree.
///
/// The result delivery path lives outside this crate; here a request only
/// forces the layer to own a render surface until it is pushed.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CopyOutputRequest {
    /// Where the request came from, if it should supersede earlier ones.
    pub source: Option<CopySource>,
    /// Sub-area to copy in layer space; `None` copies everything.
    pub area: Option<Rect>,
}

impl CopyOutputRequest {
    /// A request for the whole output.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            source: None,
            area: None,
        }
    }

    /// Tags the request with a source.
    #[must_use]
    pub const fn with_source(mut self, source: CopySource) -> Self {
        self.source = Some(source);
        self
    }

    /// Restricts the request to `area`.
    #[must_use]
    pub const fn with_area(mut self, area: Rect) -> Self {
        self.area = Some(area);
        self
    }

    /// Returns true if the request covers nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.area.is_some_and(rect_is_empty)
    }
}

impl Default for CopyOutputRequest {
    fn default() -> Self {
        Self::new()
    }
}
