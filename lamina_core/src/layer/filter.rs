// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter operations applied to a layer's rendered subtree.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Insets, Vec2};

/// A single filter step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterOperation {
    /// Grayscale by the given amount.
    Grayscale(f32),
    /// Sepia by the given amount.
    Sepia(f32),
    /// Saturation multiplier.
    Saturate(f32),
    /// Hue rotation in degrees.
    HueRotate(f32),
    /// Inversion by the given amount.
    Invert(f32),
    /// Brightness multiplier.
    Brightness(f32),
    /// Contrast multiplier.
    Contrast(f32),
    /// Opacity multiplier.
    Opacity(f32),
    /// Gaussian blur with the given standard deviation.
    Blur(f32),
    /// Drop shadow.
    DropShadow {
        /// Shadow offset.
        offset: Vec2,
        /// Blur standard deviation.
        std_deviation: f32,
    },
}

impl FilterOperation {
    fn moves_pixels(self) -> bool {
        matches!(self, Self::Blur(_) | Self::DropShadow { .. })
    }
}

/// An ordered list of filter operations.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterOperations(pub Vec<FilterOperation>);

impl FilterOperations {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an operation.
    pub fn push(&mut self, op: FilterOperation) {
        self.0.push(op);
    }

    /// Returns true if there are no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if any operation can spread pixels beyond the input
    /// bounds.
    #[must_use]
    pub fn has_filter_that_moves_pixels(&self) -> bool {
        self.0.iter().any(|op| op.moves_pixels())
    }

    /// How far the filter output can extend past the input on each side.
    #[must_use]
    pub fn outsets(&self) -> Insets {
        let mut out = Insets::ZERO;
        for op in &self.0 {
            match *op {
                FilterOperation::Blur(sigma) => {
                    let spread = f64::from(sigma.abs()) * 3.0;
                    out.x0 += spread;
                    out.y0 += spread;
                    out.x1 += spread;
                    out.y1 += spread;
                }
                FilterOperation::DropShadow {
                    offset,
                    std_deviation,
                } => {
                    let spread = f64::from(std_deviation.abs()) * 3.0;
                    out.x0 += (spread - offset.x).max(0.0);
                    out.y0 += (spread - offset.y).max(0.0);
                    out.x1 += (spread + offset.x).max(0.0);
                    out.y1 += (spread + offset.y).max(0.0);
                }
                _ => {}
            }
        }
        out
    }
}

impl From<Vec<FilterOperation>> for FilterOperations {
    fn from(ops: Vec<FilterOperation>) -> Self {
        Self(ops)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn color_filters_do_not_move_pixels() {
        let f = FilterOperations::from(vec![
            FilterOperation::Grayscale(1.0),
            FilterOperation::Opacity(0.5),
        ]);
        assert!(!f.is_empty());
        assert!(!f.has_filter_that_moves_pixels());
        assert_eq!(f.outsets(), Insets::ZERO);
    }

    #[test]
    fn blur_outsets_are_three_sigma() {
        let f = FilterOperations::from(vec![FilterOperation::Blur(2.0)]);
        assert!(f.has_filter_that_moves_pixels());
        assert_eq!(f.outsets(), Insets::uniform(6.0));
    }

    #[test]
    fn drop_shadow_outsets_follow_offset() {
        let f = FilterOperations::from(vec![FilterOperation::DropShadow {
            offset: Vec2::new(10.0, 0.0),
            std_deviation: 1.0,
        }]);
        let o = f.outsets();
        assert_eq!(o.x0, 0.0);
        assert_eq!(o.x1, 13.0);
        assert_eq!(o.y0, 3.0);
        assert_eq!(o.y1, 3.0);
    }
}
