// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer identity and id allocation.

use core::cell::Cell;
use core::fmt;

/// Sentinel value indicating "no layer" in slot index fields.
pub const INVALID: u32 = u32::MAX;

/// Stable identity of a layer.
///
/// Ids are handed out by a [`LayerIdAllocator`], start at 1, and are never
/// reused, so an id that outlives its layer simply stops resolving.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LayerId(pub(crate) u32);

impl LayerId {
    /// Wraps a raw id, e.g. one read back from a wire message.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self.0)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of [`LayerId`]s.
///
/// Shared by reference (typically `Rc<LayerIdAllocator>`) between every tree
/// that must not hand out colliding ids.
#[derive(Debug)]
pub struct LayerIdAllocator {
    next: Cell<u32>,
}

impl Default for LayerIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerIdAllocator {
    /// Creates an allocator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: Cell::new(1) }
    }

    /// Returns the next id.
    ///
    /// # Panics
    ///
    /// Panics if the id space is exhausted.
    pub fn allocate(&self) -> LayerId {
        let id = self.next.get();
        assert!(id != INVALID, "layer id space exhausted");
        self.next.set(id + 1);
        LayerId(id)
    }

    /// Ensures future ids are greater than `id`.
    pub fn reserve_through(&self, id: LayerId) {
        if id.0 >= self.next.get() {
            self.next.set(id.0.saturating_add(1));
        }
    }

    /// Returns the id the next [`allocate`](Self::allocate) call will produce.
    #[must_use]
    pub fn peek(&self) -> LayerId {
        LayerId(self.next.get())
    }
}
