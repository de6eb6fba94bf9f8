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
    point::Point3,
    vector::{Vector3, VectorOps},
};

/// Plane `normal · p + d = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub d: f64,
}

impl Plane {
    pub fn new(normal: Vector3, d: f64) -> Self {
        Plane { normal, d }
    }

    /// Plane through three points with the normal turned to face +z.
    ///
    /// The normal is not normalized; degenerate (collinear) input gives a
    /// zero normal, which `normalized` reports.
    pub fn from_points_upward(p1: &Point3, p2: &Point3, p3: &Point3) -> Self {
        let v1 = p1.vector_to(p2);
        let v2 = p1.vector_to(p3);
        let mut normal = v1.cross(&v2);
        if normal.z < 0.0 {
            normal = -normal;
        }
        let d = -normal.dot(&p1.as_vector());
        Plane::new(normal, d)
    }

    /// Unit-normal copy of this plane, `None` if the normal has zero length.
    pub fn normalized(&self) -> Option<Plane> {
        let n = self.normal.norm();
        if n == 0.0 || !n.is_finite() {
            return None;
        }
        Some(Plane::new(self.normal.scale(1.0 / n), self.d / n))
    }

    /// `normal · p + d`. For a unit normal this is the signed distance,
    /// positive on the side the normal points to.
    #[inline]
    pub fn evaluate(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.as_vector()) + self.d
    }

    /// Orthogonal projection of `p` onto the plane.
    pub fn project_point(&self, p: &Point3) -> Option<Point3> {
        let nn = self.normal.magnitude_squared();
        if nn == 0.0 {
            return None;
        }
        let t = self.evaluate(p) / nn;
        Some(p.add_vector(&self.normal.scale(-t)))
    }
}

/// Signed distance from `p` to a unit-normal plane; `None` for a degenerate
/// plane.
pub fn signed_distance_to_plane(plane: &Plane, p: &Point3) -> Option<f64> {
    plane.normalized().map(|unit| unit.evaluate(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upward_normal_regardless_of_winding() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        assert!(Plane::from_points_upward(&a, &b, &c).normal.z > 0.0);
        assert!(Plane::from_points_upward(&a, &c, &b).normal.z > 0.0);
    }

    #[test]
    fn distance_sign_follows_z() {
        let plane = Plane::from_points_upward(
            &Point3::new(0.0, 0.0, 1.0),
            &Point3::new(0.0, 1.0, 1.0),
            &Point3::new(1.0, 0.0, 1.0),
        );
        assert_eq!(signed_distance_to_plane(&plane, &Point3::new(0.2, 0.2, 3.0)), Some(2.0));
        assert_eq!(signed_distance_to_plane(&plane, &Point3::new(0.2, 0.2, 0.5)), Some(-0.5));
    }

    #[test]
    fn collinear_points_have_no_distance() {
        let plane = Plane::from_points_upward(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 1.0),
            &Point3::new(2.0, 2.0, 2.0),
        );
        assert!(signed_distance_to_plane(&plane, &Point3::new(0.0, 0.0, 5.0)).is_none());
        assert!(plane.project_point(&Point3::default()).is_none());
    }
}
