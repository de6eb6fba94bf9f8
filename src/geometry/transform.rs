// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use serde::{Deserialize, Serialize};

use crate::geometry::{aabb::Aabb, point::Point3};

/// Affine map `p' = M p + t` between the meter frame and project units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub matrix: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Transform {
    pub const fn identity() -> Self {
        Transform {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }

    /// Uniform scale, e.g. meters to feet.
    pub const fn from_scale(s: f64) -> Self {
        Transform {
            matrix: [[s, 0.0, 0.0], [0.0, s, 0.0], [0.0, 0.0, s]],
            translation: [0.0; 3],
        }
    }

    pub const fn from_scale_translation(s: f64, t: [f64; 3]) -> Self {
        let mut out = Transform::from_scale(s);
        out.translation = t;
        out
    }

    pub fn is_identity(&self) -> bool {
        *self == Transform::identity()
    }

    pub fn apply(&self, p: &Point3) -> Point3 {
        let m = &self.matrix;
        let t = &self.translation;
        Point3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + t[0],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + t[1],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + t[2],
        )
    }

    pub fn apply_all(&self, points: &[Point3]) -> Vec<Point3> {
        if self.is_identity() {
            return points.to_vec();
        }
        points.iter().map(|p| self.apply(p)).collect()
    }

    /// Axis-aligned hull of the eight transformed corners.
    pub fn apply_range(&self, range: &Aabb) -> Aabb {
        if range.is_empty() {
            return *range;
        }
        let mut out = Aabb::empty();
        for c in range.corners() {
            out.extend(&self.apply(&c));
        }
        out
    }

    /// Scale of the linear part along x, used to convert plain lengths.
    pub fn x_scale(&self) -> f64 {
        let m = &self.matrix;
        (m[0][0] * m[0][0] + m[1][0] * m[1][0] + m[2][0] * m[2][0]).sqrt()
    }

    /// Inverse map, `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Transform> {
        let m = &self.matrix;
        let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let inv = [
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ];
        let t = &self.translation;
        let translation = std::array::from_fn(|i| {
            -(inv[i][0] * t[0] + inv[i][1] * t[1] + inv[i][2] * t[2])
        });
        Some(Transform {
            matrix: inv,
            translation,
        })
    }

    /// `self ∘ other`: applies `other` first.
    pub fn compose(&self, other: &Transform) -> Transform {
        let a = &self.matrix;
        let b = &other.matrix;
        let matrix = std::array::from_fn(|r| {
            std::array::from_fn(|c| a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c])
        });
        let t = self.apply(&Point3::from_vals(other.translation));
        Transform {
            matrix,
            translation: t.coords(),
        }
    }
}
