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

use crate::geometry::{
    aabb::Aabb,
    plane::Plane,
    point::Point3,
    util::TOLERANCE_FACTOR,
    vector::VectorOps,
};

/// A TIN face with its derived centroid, upward plane and footprint range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    points: [Point3; 3],
    centroid: Point3,
    plane: Plane,
    range: Aabb,
}

impl Triangle {
    pub fn new(p0: Point3, p1: Point3, p2: Point3) -> Self {
        let centroid = Point3::new(
            (p0.x + p1.x + p2.x) / 3.0,
            (p0.y + p1.y + p2.y) / 3.0,
            (p0.z + p1.z + p2.z) / 3.0,
        );
        let plane = Plane::from_points_upward(&p0, &p1, &p2);
        let range = Aabb::from_point_iter([&p0, &p1, &p2]);
        Triangle {
            points: [p0, p1, p2],
            centroid,
            plane,
            range,
        }
    }

    pub fn from_array(pts: [Point3; 3]) -> Self {
        Triangle::new(pts[0], pts[1], pts[2])
    }

    #[inline]
    pub fn points(&self) -> &[Point3; 3] {
        &self.points
    }

    #[inline]
    pub fn point(&self, i: usize) -> &Point3 {
        &self.points[i]
    }

    #[inline]
    pub fn centroid(&self) -> &Point3 {
        &self.centroid
    }

    /// Plane through the vertices, normal facing +z, not normalized.
    #[inline]
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Unit-normal plane; `None` for a degenerate (collinear) triangle.
    #[inline]
    pub fn unit_plane(&self) -> Option<Plane> {
        self.plane.normalized()
    }

    #[inline]
    pub fn range(&self) -> &Aabb {
        &self.range
    }

    /// Signed distance to the upward plane, `None` when degenerate.
    pub fn signed_distance(&self, p: &Point3) -> Option<f64> {
        self.unit_plane().map(|pl| pl.evaluate(p))
    }

    /// Barycentric inside test for a point already lying on the plane.
    ///
    /// With `v0 = P2 - P0`, `v1 = P1 - P0`, `v2 = Q - P0` the weights `u`
    /// (along `v0`) and `v` (along `v1`) are solved from dot products.
    /// Strict mode needs `u > 0`, `v > 0`, `u + v < 1`. Non-strict mode
    /// relaxes only the first two, so edges P0P1 and P0P2 count as inside
    /// while edge P1P2 does not.
    pub fn is_point_on_plane_inside(&self, q: &Point3, strict: bool) -> bool {
        let [p0, p1, p2] = &self.points;
        let v0 = p0.vector_to(p2);
        let v1 = p0.vector_to(p1);
        let v2 = p0.vector_to(q);

        let dot00 = v0.dot(&v0);
        let dot01 = v0.dot(&v1);
        let dot02 = v0.dot(&v2);
        let dot11 = v1.dot(&v1);
        let dot12 = v1.dot(&v2);

        let denom = dot00 * dot11 - dot01 * dot01;
        if denom == 0.0 || !denom.is_finite() {
            return false;
        }
        let inv = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv;
        let v = (dot00 * dot12 - dot01 * dot02) * inv;

        if strict {
            u > 0.0 && v > 0.0 && u + v < 1.0
        } else {
            u >= 0.0 && v >= 0.0 && u + v < 1.0
        }
    }

    /// Index of the vertex equal to `p` within the vertex tolerance.
    pub fn vertex_index_of(&self, p: &Point3) -> Option<usize> {
        self.points
            .iter()
            .position(|v| v.is_equal_tol(p, TOLERANCE_FACTOR))
    }

    #[inline]
    pub fn is_equal_to_one_vertex(&self, p: &Point3) -> bool {
        self.vertex_index_of(p).is_some()
    }

    /// Lengths of `|p0p2|`, `|p0p1|`, `|p1p2|`.
    pub fn edge_lengths(&self) -> [f64; 3] {
        let [p0, p1, p2] = &self.points;
        [p0.distance_to(p2), p0.distance_to(p1), p1.distance_to(p2)]
    }

    /// Every vertex at minimal 3D distance from `p` (two or three on ties).
    pub fn nearest_vertices(&self, p: &Point3) -> smallvec::SmallVec<[Point3; 3]> {
        let d: [f64; 3] = std::array::from_fn(|i| self.points[i].distance_to(p));
        let best = d[0].min(d[1]).min(d[2]);
        self.points
            .iter()
            .zip(d)
            .filter(|(_, di)| *di == best)
            .map(|(v, _)| *v)
            .collect()
    }
}
