// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rect mapping through 3-D transforms with homogeneous w-clipping.
//!
//! Points that land behind the camera (w ≤ 0) are clipped against a plane just
//! in front of it *before* the divide by w. Dividing first flips signs and
//! produces rects on the wrong side of the viewer.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};

use crate::transform::Transform3d;

/// w value used when interpolating an edge that crosses the w = 0 plane.
const CLIP_W: f64 = 0.00001;

/// Coordinates are clamped to this magnitude so nothing non-finite escapes.
const MAX_COORD: f64 = 1.0e9;

#[derive(Clone, Copy, Debug)]
struct Homogeneous {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl Homogeneous {
    fn should_be_clipped(self) -> bool {
        self.w <= 0.0
    }

    fn cartesian(self) -> Point {
        if self.w == 1.0 {
            return Point::new(self.x, self.y);
        }
        let inv_w = 1.0 / self.w;
        Point::new(self.x * inv_w, self.y * inv_w)
    }

    /// Finds the point on the edge `self → other` where w equals [`CLIP_W`].
    ///
    /// Exactly one endpoint must be clipped.
    fn clipped_point_on_edge(self, other: Self) -> Point {
        let t = (CLIP_W - self.w) / (other.w - self.w);
        let lerp = |a: f64, b: f64| (1.0 - t) * a + t * b;
        Self {
            x: lerp(self.x, other.x),
            y: lerp(self.y, other.y),
            z: lerp(self.z, other.z),
            w: CLIP_W,
        }
        .cartesian()
    }
}

fn map_homogeneous(transform: &Transform3d, p: Point) -> Homogeneous {
    let [x, y, z, w] = transform.map_homogeneous(p.x, p.y, 0.0);
    Homogeneous { x, y, z, w }
}

/// Maps `p` onto the plane the transform's z = 0 plane lands on, by
/// solving for the z that makes the mapped point flat.
fn project_homogeneous(transform: &Transform3d, p: Point) -> Homogeneous {
    let m22 = transform.get(2, 2);
    if m22 == 0.0 {
        // The plane is edge-on to the ray; nothing sensible to project.
        return Homogeneous {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        };
    }
    let z = -(transform.get(2, 0) * p.x + transform.get(2, 1) * p.y + transform.get(2, 3)) / m22;
    if !z.is_finite() {
        return Homogeneous {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        };
    }
    let [x, y, z, w] = transform.map_homogeneous(p.x, p.y, z);
    Homogeneous { x, y, z, w }
}

fn corners(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

/// Bounds of a quad given in homogeneous coordinates, clipped to w > 0.
fn enclosing_clipped_bounds(quad: [Homogeneous; 4]) -> Rect {
    let clipped = quad.map(Homogeneous::should_be_clipped);
    if clipped.iter().all(|c| *c) {
        return Rect::ZERO;
    }

    let mut bounds: Option<Rect> = None;
    let mut include = |p: Point| {
        let p = Point::new(clamp_coord(p.x), clamp_coord(p.y));
        bounds = Some(match bounds {
            Some(b) => b.union_pt(p),
            None => Rect::from_points(p, p),
        });
    };

    for i in 0..4 {
        let j = (i + 1) % 4;
        if !clipped[i] {
            include(quad[i].cartesian());
        }
        if clipped[i] != clipped[j] {
            include(quad[i].clipped_point_on_edge(quad[j]));
        }
    }
    bounds.unwrap_or(Rect::ZERO)
}

fn clamp_coord(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-MAX_COORD, MAX_COORD)
    }
}

/// Returns true if `rect` covers no area.
#[inline]
#[must_use]
pub fn rect_is_empty(rect: Rect) -> bool {
    !(rect.width() > 0.0 && rect.height() > 0.0)
}

/// Returns the smallest integer rect containing `rect`, or an empty rect if
/// `rect` is empty.
#[must_use]
pub fn enclosing_rect(rect: Rect) -> Rect {
    if rect_is_empty(rect) {
        return Rect::ZERO;
    }
    let r = rect.abs();
    Rect::new(r.x0.floor(), r.y0.floor(), r.x1.ceil(), r.y1.ceil())
}

/// Returns true if `outer` fully covers `inner`.
#[inline]
#[must_use]
pub fn rect_contains(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// Intersection that returns [`Rect::ZERO`] when the rects do not overlap.
#[must_use]
pub fn intersect_or_empty(a: Rect, b: Rect) -> Rect {
    let r = a.intersect(b);
    if rect_is_empty(r) { Rect::ZERO } else { r }
}

/// Union that ignores empty operands.
#[must_use]
pub fn union_non_empty(a: Rect, b: Rect) -> Rect {
    match (rect_is_empty(a), rect_is_empty(b)) {
        (true, true) => Rect::ZERO,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a.union(b),
    }
}

/// Maps `rect` forward through `transform` and returns the bounds of the
/// result, clipping against w = 0.
///
/// Returns an empty rect if the whole rect lands behind the camera.
#[must_use]
pub fn map_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_translation() {
        let t = transform.translation_2d();
        return rect + t;
    }
    enclosing_clipped_bounds(corners(rect).map(|p| map_homogeneous(transform, p)))
}

/// Like [`map_clipped_rect`], rounded outward to integers.
#[must_use]
pub fn map_enclosing_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    enclosing_rect(map_clipped_rect(transform, rect))
}

/// Projects `rect` through `transform` onto the z = 0 plane of the
/// destination, clipping against w = 0.
///
/// This is the operation used to take a rect from a surface back into a
/// layer's space through an inverted draw transform.
#[must_use]
pub fn project_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_translation() {
        let t = transform.translation_2d();
        return rect + t;
    }
    enclosing_clipped_bounds(corners(rect).map(|p| project_homogeneous(transform, p)))
}

/// Like [`project_clipped_rect`], rounded outward to integers.
#[must_use]
pub fn project_enclosing_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    enclosing_rect(project_clipped_rect(transform, rect))
}

/// Computes which part of `layer_rect` (in layer space) can be seen through
/// `target_rect` (in target space), given the layer → target transform.
///
/// The result is rounded outward. A non-invertible transform whose forward
/// mapping still touches the target yields the whole layer rect.
#[must_use]
pub fn calculate_visible_rect(target_rect: Rect, layer_rect: Rect, transform: &Transform3d) -> Rect {
    let layer_in_target = map_enclosing_clipped_rect(transform, layer_rect);
    if rect_is_empty(layer_in_target) {
        return Rect::ZERO;
    }
    if rect_contains(target_rect, layer_in_target) {
        return layer_rect;
    }

    // Only the part of the target the layer could cover is worth projecting;
    // it keeps the projected points in front of the camera.
    let minimal = intersect_or_empty(target_rect, layer_in_target);
    if rect_is_empty(minimal) {
        return Rect::ZERO;
    }

    let Some(target_to_layer) = transform.inverse() else {
        return layer_rect;
    };
    let projected = project_enclosing_clipped_rect(&target_to_layer, minimal);
    intersect_or_empty(projected, layer_rect)
}
