// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform with the operations draw-property computation
//! needs: composition, inversion, flattening, axis-alignment classification,
//! and backface detection.

use core::ops::Mul;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Point, Vec2};

/// Tolerance used when classifying matrix entries as zero or one.
const EPSILON: f64 = 1e-9;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix. Points are column vectors,
/// so `a * b` applies `b` first.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Creates a transform from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Returns the columns as a 2-D array.
    #[inline]
    #[must_use]
    pub const fn to_cols_array_2d(self) -> [[f64; 4]; 4] {
        self.cols
    }

    /// Returns the entry at `row`, `col`.
    #[inline]
    #[must_use]
    pub const fn get(&self, row: usize, col: usize) -> f64 {
        self.cols[col][row]
    }

    /// Sets the entry at `row`, `col`.
    #[inline]
    pub const fn set(&mut self, row: usize, col: usize, value: f64) {
        self.cols[col][row] = value;
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a 2-D translation by `v`.
    #[inline]
    #[must_use]
    pub const fn from_translation_2d(v: Vec2) -> Self {
        Self::from_translation(v.x, v.y, 0.0)
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the X axis (radians).
    #[must_use]
    pub fn from_rotation_x(radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Y axis (radians).
    #[must_use]
    pub fn from_rotation_y(radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a perspective projection with the eye at distance `depth`
    /// from the z = 0 plane.
    ///
    /// A non-positive depth yields the identity.
    #[must_use]
    pub fn from_perspective(depth: f64) -> Self {
        let mut m = Self::IDENTITY;
        if depth > 0.0 {
            m.set(3, 2, -1.0 / depth);
        }
        m
    }

    /// Creates a 3-D transform equivalent to the 2-D affine `a`.
    #[must_use]
    pub fn from_affine(a: Affine) -> Self {
        let [xx, yx, xy, yy, tx, ty] = a.as_coeffs();
        Self {
            cols: [
                [xx, yx, 0.0, 0.0],
                [xy, yy, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [tx, ty, 0.0, 1.0],
            ],
        }
    }

    /// Returns the 2-D affine this transform reduces to, if it is flat and
    /// has no perspective.
    #[must_use]
    pub fn to_affine(&self) -> Option<Affine> {
        if !self.is_flat() || self.has_perspective() {
            return None;
        }
        Some(Affine::new([
            self.get(0, 0),
            self.get(1, 0),
            self.get(0, 1),
            self.get(1, 1),
            self.get(0, 3),
            self.get(1, 3),
        ]))
    }

    /// Returns `translate(origin) * self * translate(-origin)`.
    #[must_use]
    pub fn about_origin(self, origin: [f64; 3]) -> Self {
        if self.is_identity() {
            return self;
        }
        Self::from_translation(origin[0], origin[1], origin[2])
            * self
            * Self::from_translation(-origin[0], -origin[1], -origin[2])
    }

    /// Is this exactly the identity?
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Is this a pure translation (possibly the identity)?
    #[must_use]
    pub fn is_identity_or_translation(&self) -> bool {
        let c = &self.cols;
        c[0] == [1.0, 0.0, 0.0, 0.0]
            && c[1] == [0.0, 1.0, 0.0, 0.0]
            && c[2] == [0.0, 0.0, 1.0, 0.0]
            && c[3][3] == 1.0
    }

    /// Is this a translation in x and y only?
    #[must_use]
    pub fn is_2d_translation(&self) -> bool {
        self.is_identity_or_translation() && self.get(2, 3) == 0.0
    }

    /// Returns the x/y translation components.
    #[inline]
    #[must_use]
    pub const fn translation_2d(&self) -> Vec2 {
        Vec2::new(self.cols[3][0], self.cols[3][1])
    }

    /// Does the bottom row differ from `[0, 0, 0, 1]`?
    #[must_use]
    pub fn has_perspective(&self) -> bool {
        self.get(3, 0) != 0.0 || self.get(3, 1) != 0.0 || self.get(3, 2) != 0.0 || self.get(3, 3) != 1.0
    }

    /// Does this transform leave z untouched and keep x/y independent of z?
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.get(2, 0) == 0.0
            && self.get(2, 1) == 0.0
            && self.get(0, 2) == 0.0
            && self.get(1, 2) == 0.0
            && self.get(2, 2) == 1.0
            && self.get(3, 2) == 0.0
            && self.get(2, 3) == 0.0
    }

    /// Projects this transform onto the z = 0 plane, dropping all
    /// contributions to and from z.
    #[must_use]
    pub fn flatten_to_2d(mut self) -> Self {
        self.set(2, 0, 0.0);
        self.set(2, 1, 0.0);
        self.set(0, 2, 0.0);
        self.set(1, 2, 0.0);
        self.set(2, 2, 1.0);
        self.set(3, 2, 0.0);
        self.set(2, 3, 0.0);
        self
    }

    /// Does this transform map axis-aligned rects to axis-aligned rects?
    ///
    /// True when the upper-left 2×2 block has exactly one non-zero entry per
    /// row and column and there is no perspective in x or y.
    #[must_use]
    pub fn preserves_2d_axis_alignment(&self) -> bool {
        if self.get(3, 0).abs() > EPSILON || self.get(3, 1).abs() > EPSILON {
            return false;
        }
        let nz = |v: f64| v.abs() > EPSILON;
        let (a, b, c, d) = (
            nz(self.get(0, 0)),
            nz(self.get(0, 1)),
            nz(self.get(1, 0)),
            nz(self.get(1, 1)),
        );
        (a && d && !b && !c) || (b && c && !a && !d)
    }

    /// Computes the determinant.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let mut m = self.to_row_major();
        let mut det = 1.0;
        for col in 0..4 {
            let pivot = pivot_row(&m, col);
            if m[pivot][col] == 0.0 {
                return 0.0;
            }
            if pivot != col {
                m.swap(pivot, col);
                det = -det;
            }
            det *= m[col][col];
            for row in col + 1..4 {
                let f = m[row][col] / m[col][col];
                for k in col..4 {
                    m[row][k] -= f * m[col][k];
                }
            }
        }
        det
    }

    /// Returns the inverse, or `None` if the matrix is singular or the
    /// result is not finite.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        if self.is_identity_or_translation() {
            return Some(Self::from_translation(
                -self.cols[3][0],
                -self.cols[3][1],
                -self.cols[3][2],
            ));
        }
        let mut m = self.to_row_major();
        let mut inv = Self::IDENTITY.to_row_major();
        for col in 0..4 {
            let pivot = pivot_row(&m, col);
            if m[pivot][col].abs() < f64::MIN_POSITIVE {
                return None;
            }
            m.swap(pivot, col);
            inv.swap(pivot, col);
            let p = m[col][col];
            for k in 0..4 {
                m[col][k] /= p;
                inv[col][k] /= p;
            }
            for row in 0..4 {
                if row == col {
                    continue;
                }
                let f = m[row][col];
                if f == 0.0 {
                    continue;
                }
                for k in 0..4 {
                    m[row][k] -= f * m[col][k];
                    inv[row][k] -= f * inv[col][k];
                }
            }
        }
        let out = Self::from_row_major(inv);
        out.is_finite().then_some(out)
    }

    /// Is this matrix invertible?
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        self.inverse().is_some()
    }

    /// Would the back face of a layer drawn with this transform face the
    /// viewer?
    ///
    /// This is the sign of the z component of the transformed surface normal,
    /// which is the (2, 2) entry of the inverse. Singular matrices are never
    /// considered back-facing.
    #[must_use]
    pub fn is_back_face_visible(&self) -> bool {
        self.inverse().is_some_and(|inv| inv.get(2, 2) < 0.0)
    }

    /// Returns the x/y scale factors of the upper-left 2×2 block.
    ///
    /// Returns `None` when the transform has perspective or a non-finite
    /// result, so callers can fall back to a neutral scale.
    #[must_use]
    pub fn scale_2d_components(&self) -> Option<Vec2> {
        if self.has_perspective() {
            return None;
        }
        let sx = self.get(0, 0).hypot(self.get(1, 0));
        let sy = self.get(0, 1).hypot(self.get(1, 1));
        let s = Vec2::new(sx, sy);
        s.is_finite().then_some(s)
    }

    /// Maps `(x, y, z, 1)` and returns the homogeneous result.
    #[inline]
    #[must_use]
    pub fn map_homogeneous(&self, x: f64, y: f64, z: f64) -> [f64; 4] {
        let c = &self.cols;
        [
            c[0][0] * x + c[1][0] * y + c[2][0] * z + c[3][0],
            c[0][1] * x + c[1][1] * y + c[2][1] * z + c[3][1],
            c[0][2] * x + c[1][2] * y + c[2][2] * z + c[3][2],
            c[0][3] * x + c[1][3] * y + c[2][3] * z + c[3][3],
        ]
    }

    /// Maps a 2-D point, dividing by w.
    ///
    /// Callers that may hit w ≤ 0 should use the clipped mapping helpers in
    /// [`geometry`](crate::geometry) instead.
    #[must_use]
    pub fn map_point(&self, p: Point) -> Point {
        let [x, y, _, w] = self.map_homogeneous(p.x, p.y, 0.0);
        if w == 1.0 || w == 0.0 {
            Point::new(x, y)
        } else {
            Point::new(x / w, y / w)
        }
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Is this transform [NaN]?
    ///
    /// [NaN]: f64::is_nan
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.cols.iter().flatten().any(|v| v.is_nan())
    }

    /// Returns approximate equality within `eps` per entry.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    fn to_row_major(self) -> [[f64; 4]; 4] {
        let mut m = [[0.0; 4]; 4];
        for (row, out) in m.iter_mut().enumerate() {
            for (col, v) in out.iter_mut().enumerate() {
                *v = self.get(row, col);
            }
        }
        m
    }

    fn from_row_major(m: [[f64; 4]; 4]) -> Self {
        let mut out = Self::IDENTITY;
        for (row, r) in m.iter().enumerate() {
            for (col, v) in r.iter().enumerate() {
                out.set(row, col, *v);
            }
        }
        out
    }
}

/// Returns the row at or below `col` with the largest magnitude in `col`.
fn pivot_row(m: &[[f64; 4]; 4], col: usize) -> usize {
    let mut best = col;
    for row in col + 1..4 {
        if m[row][col].abs() > m[best][col].abs() {
            best = row;
        }
    }
    best
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
    }

    #[test]
    fn identity_multiply() {
        let t = Transform3d::from_translation(1.0, 2.0, 3.0);
        assert_eq!(Transform3d::IDENTITY * t, t);
        assert_eq!(t * Transform3d::IDENTITY, t);
    }

    #[test]
    fn scale_then_translate() {
        let s = Transform3d::from_scale(2.0, 2.0, 2.0);
        let t = Transform3d::from_translation(3.0, 4.0, 0.0);
        let combined = t * s;
        assert_eq!(combined.cols[0], [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(combined.cols[3], [3.0, 4.0, 0.0, 1.0]);
        assert_eq!(combined.map_point(Point::new(1.0, 1.0)), Point::new(5.0, 6.0));
    }

    #[test]
    fn inverse_of_general_transform() {
        let t = Transform3d::from_translation(5.0, -3.0, 2.0)
            * Transform3d::from_rotation_y(0.4)
            * Transform3d::from_rotation_z(1.1)
            * Transform3d::from_scale(2.0, 3.0, 1.0);
        let inv = t.inverse().expect("transform is invertible");
        assert!((t * inv).approx_eq(&Transform3d::IDENTITY, EPS));
        assert!((inv * t).approx_eq(&Transform3d::IDENTITY, EPS));
    }

    #[test]
    fn singular_has_no_inverse() {
        let t = Transform3d::from_scale(1.0, 0.0, 1.0);
        assert!(t.inverse().is_none());
        assert_eq!(t.determinant(), 0.0);
    }

    #[test]
    fn determinant_of_scale() {
        let t = Transform3d::from_scale(2.0, 3.0, 4.0);
        assert!((t.determinant() - 24.0).abs() < EPS);
    }

    #[test]
    fn flip_about_y_is_back_facing() {
        let flip = Transform3d::from_rotation_y(core::f64::consts::PI).about_origin([50.0, 50.0, 0.0]);
        assert!(flip.is_back_face_visible());
        assert!(!Transform3d::from_rotation_y(0.3).is_back_face_visible());
        assert!(!Transform3d::IDENTITY.is_back_face_visible());
    }

    #[test]
    fn axis_alignment_classification() {
        assert!(Transform3d::IDENTITY.preserves_2d_axis_alignment());
        assert!(Transform3d::from_scale(2.0, 0.5, 1.0).preserves_2d_axis_alignment());
        assert!(
            Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_2).preserves_2d_axis_alignment()
        );
        assert!(!Transform3d::from_rotation_z(0.3).preserves_2d_axis_alignment());
        let tilted = Transform3d::from_perspective(10.0) * Transform3d::from_rotation_y(0.5);
        assert!(!tilted.preserves_2d_axis_alignment());
    }

    #[test]
    fn flatten_drops_z() {
        let t = Transform3d::from_rotation_y(0.5) * Transform3d::from_translation(0.0, 0.0, 7.0);
        let flat = t.flatten_to_2d();
        assert!(flat.is_flat());
        assert!(!t.is_flat());
    }

    #[test]
    fn affine_round_trip() {
        let a = Affine::translate((3.0, 4.0)) * Affine::scale(2.0);
        let t = Transform3d::from_affine(a);
        assert_eq!(t.to_affine(), Some(a));
        assert!(Transform3d::from_rotation_y(0.2).to_affine().is_none());
    }

    #[test]
    fn scale_components() {
        let t = Transform3d::from_rotation_z(0.7) * Transform3d::from_scale(3.0, 2.0, 1.0);
        let s = t.scale_2d_components().expect("affine transform has scale");
        assert!((s.x - 3.0).abs() < EPS);
        assert!((s.y - 2.0).abs() < EPS);
    }

    #[test]
    fn nan_detected() {
        let mut t = Transform3d::IDENTITY;
        t.cols[2][1] = f64::NAN;
        assert!(!t.is_finite());
        assert!(t.is_nan());
    }
}
