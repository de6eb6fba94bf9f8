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

use approx::assert_abs_diff_eq;
use groundtin::geometry::{
    Aabb, Plane, Point3, Transform, Triangle, Vector3, VectorOps,
    plane::signed_distance_to_plane,
};

fn flat() -> Triangle {
    Triangle::new(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(0.0, 10.0, 0.0),
    )
}

#[test]
fn test_triangle_derived_values() {
    let t = Triangle::new(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(3.0, 0.0, 3.0),
        Point3::new(0.0, 3.0, 0.0),
    );
    assert_eq!(*t.centroid(), Point3::new(1.0, 1.0, 1.0));
    assert!(t.plane().normal.z > 0.0);
    assert_eq!(t.range().min, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(t.range().max, Point3::new(3.0, 3.0, 3.0));
}

#[test]
fn test_normal_faces_up_for_both_windings() {
    let a = Point3::new(0.0, 0.0, 0.0);
    let b = Point3::new(1.0, 0.0, 0.5);
    let c = Point3::new(0.0, 1.0, 0.0);
    let ccw = Triangle::new(a, b, c);
    let cw = Triangle::new(a, c, b);
    assert!(ccw.plane().normal.z > 0.0);
    assert!(cw.plane().normal.z > 0.0);
    let above = Point3::new(0.2, 0.2, 5.0);
    assert!(ccw.signed_distance(&above).unwrap() > 0.0);
    assert!(cw.signed_distance(&above).unwrap() > 0.0);
}

#[test]
fn test_signed_distance_to_unit_plane() {
    let t = flat();
    let plane = t.unit_plane().unwrap();
    assert_abs_diff_eq!(signed_distance_to_plane(&plane, &Point3::new(2.0, 2.0, 1.5)).unwrap(), 1.5);
    assert_abs_diff_eq!(signed_distance_to_plane(&plane, &Point3::new(2.0, 2.0, -0.5)).unwrap(), -0.5);
}

#[test]
fn test_degenerate_triangle_has_no_plane() {
    let t = Triangle::new(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(2.0, 2.0, 2.0),
    );
    assert!(t.unit_plane().is_none());
    assert!(t.signed_distance(&Point3::new(0.0, 0.0, 1.0)).is_none());
    assert!(signed_distance_to_plane(&Plane::new(Vector3::new(0.0, 0.0, 0.0), 1.0), &Point3::default()).is_none());
}

#[test]
fn test_inside_test_strict_and_relaxed() {
    let t = flat();
    let interior = Point3::new(2.0, 2.0, 0.0);
    assert!(t.is_point_on_plane_inside(&interior, true));
    assert!(t.is_point_on_plane_inside(&interior, false));

    // on p0p1 and p0p2: relaxed only
    let on_p0p1 = Point3::new(5.0, 0.0, 0.0);
    let on_p0p2 = Point3::new(0.0, 5.0, 0.0);
    assert!(!t.is_point_on_plane_inside(&on_p0p1, true));
    assert!(t.is_point_on_plane_inside(&on_p0p1, false));
    assert!(t.is_point_on_plane_inside(&on_p0p2, false));

    // p1p2 stays excluded
    let on_p1p2 = Point3::new(5.0, 5.0, 0.0);
    assert!(!t.is_point_on_plane_inside(&on_p1p2, false));

    assert!(!t.is_point_on_plane_inside(&Point3::new(-1.0, 2.0, 0.0), false));
}

#[test]
fn test_edge_lengths_order() {
    let t = Triangle::new(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(3.0, 0.0, 0.0),
        Point3::new(0.0, 4.0, 0.0),
    );
    let [p0p2, p0p1, p1p2] = t.edge_lengths();
    assert_abs_diff_eq!(p0p2, 4.0);
    assert_abs_diff_eq!(p0p1, 3.0);
    assert_abs_diff_eq!(p1p2, 5.0);
}

#[test]
fn test_vertex_match_tolerance() {
    let t = flat();
    assert!(t.is_equal_to_one_vertex(&Point3::new(10.0005, 0.0, -0.0005)));
    assert!(!t.is_equal_to_one_vertex(&Point3::new(10.002, 0.0, 0.0)));
}

#[test]
fn test_vector_angle() {
    let a = Vector3::new(1.0, 0.0, 0.0);
    let b = Vector3::new(1.0, 1.0, 0.0);
    assert_abs_diff_eq!(a.angle_to(&b), std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
    assert_abs_diff_eq!(a.cross(&b).z, 1.0);
    assert_abs_diff_eq!(Vector3::new(0.0, 0.0, 0.0).angle_to(&a), 0.0);
}

#[test]
fn test_aabb_sweep_and_contains() {
    let b = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0));
    let swept = b.swept(&Vector3::new(0.0, 0.0, 0.5));
    assert_abs_diff_eq!(swept.min.z, -0.5);
    assert_abs_diff_eq!(swept.max.z, 0.5);
    assert!(swept.contains(&Point3::new(0.5, 0.5, 0.5)));
    assert!(!swept.contains(&Point3::new(0.5, 0.5, 0.6)));
    assert!(Aabb::empty().is_empty());
    assert_eq!(Aabb::empty().extent(0), 0.0);
}

#[test]
fn test_transform_range_and_inverse() {
    let feet = Transform::from_scale_translation(3.28084, [100.0, 200.0, 0.0]);
    let back = feet.inverse().unwrap();
    let p = Point3::new(12.0, -3.0, 7.5);
    let q = back.apply(&feet.apply(&p));
    assert_abs_diff_eq!(q.x, p.x, epsilon = 1e-9);
    assert_abs_diff_eq!(q.y, p.y, epsilon = 1e-9);
    assert_abs_diff_eq!(q.z, p.z, epsilon = 1e-9);

    let r = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
    let rr = feet.apply_range(&r);
    assert_abs_diff_eq!(rr.min.x, 100.0);
    assert_abs_diff_eq!(rr.max.y, 200.0 + 2.0 * 3.28084, epsilon = 1e-9);
    assert_abs_diff_eq!(feet.x_scale(), 3.28084, epsilon = 1e-12);
}
