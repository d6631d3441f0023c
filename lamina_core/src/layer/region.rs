// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A set of rects, used for hit-testing regions.

use alloc::vec::Vec;

use kurbo::{Point, Rect};

use crate::geometry::{rect_is_empty, union_non_empty};

/// A union of axis-aligned rects in layer space.
///
/// Rects are kept as given; no coalescing is attempted.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// The empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// Adds `rect` to the region. Empty rects are ignored.
    pub fn union_rect(&mut self, rect: Rect) {
        if !rect_is_empty(rect) && !self.rects.contains(&rect) {
            self.rects.push(rect);
        }
    }

    /// Returns true if the region covers nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The rects making up the region.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Bounding box of the region.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::ZERO, |acc, r| union_non_empty(acc, *r))
    }

    /// Returns true if `p` lies inside any rect of the region.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        self.rects.iter().any(|r| r.contains(p))
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rects_are_dropped() {
        let mut r = Region::new();
        r.union_rect(Rect::new(0.0, 0.0, 0.0, 10.0));
        assert!(r.is_empty());
    }

    #[test]
    fn bounds_and_contains() {
        let mut r = Region::from(Rect::new(0.0, 0.0, 10.0, 10.0));
        r.union_rect(Rect::new(20.0, 20.0, 30.0, 30.0));
        assert_eq!(r.bounds(), Rect::new(0.0, 0.0, 30.0, 30.0));
        assert!(r.contains(Point::new(25.0, 25.0)));
        assert!(!r.contains(Point::new(15.0, 15.0)));
    }
}
