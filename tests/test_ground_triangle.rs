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
use groundtin::geometry::{Aabb, Point3, Transform, Triangle};
use groundtin::ground::AdaptiveThresholds;
use groundtin::ground::ground_triangle::{
    GroundTriangle, TinView, compare_candidates, compute_query_slab, is_densification_required,
    mirror_point,
};
use groundtin::operations::triangulation::{DelaunayTin, TriangulationProvider};
use groundtin::InMemoryPointCloud;

const A: Point3 = Point3::new(0.0, 0.0, 0.0);
const B: Point3 = Point3::new(10.0, 0.0, 0.0);
const C: Point3 = Point3::new(0.0, 10.0, 0.0);

fn thresholds(angle_deg: f64) -> AdaptiveThresholds {
    AdaptiveThresholds {
        angle: angle_deg.to_radians(),
        height: 0.5,
        classification_tolerance: 0.05,
    }
}

fn ground_triangle(cloud: &[Point3], points_to_add: usize, tin: &DelaunayTin) -> GroundTriangle {
    let creator = InMemoryPointCloud::new(cloud.to_vec(), Transform::identity());
    GroundTriangle::new(
        Triangle::new(A, B, C),
        0.5,
        &tin.range(),
        &creator,
        &Transform::identity(),
        false,
        points_to_add,
    )
}

#[test]
fn test_acceptance_on_flat_face() {
    let tin = DelaunayTin::build(&[A, B, C]);
    let view = TinView {
        thresholds: thresholds(10.0),
        tin: &tin,
        tin_range: tin.range(),
    };
    let t = ground_triangle(&[], 1, &tin);

    assert!(t.is_accepted_for_densification(&view, &Point3::new(2.0, 2.0, 0.3)));
    // too high, and its mirror is as far from the TIN
    assert!(!t.is_accepted_for_densification(&view, &Point3::new(2.0, 2.0, 1.0)));
    // steep as seen from the first vertex
    assert!(!t.is_accepted_for_densification(&view, &Point3::new(0.5, 0.5, 0.2)));
    // outside the footprint
    assert!(!t.is_accepted_for_densification(&view, &Point3::new(8.0, 8.0, 0.1)));
    // vertices are never re-added
    assert!(!t.is_accepted_for_densification(&view, &Point3::new(10.0005, 0.0, 0.0)));
}

#[test]
fn test_points_below_surface() {
    let tin = DelaunayTin::build(&[A, B, C]);
    let view = TinView {
        thresholds: thresholds(10.0),
        tin: &tin,
        tin_range: tin.range(),
    };
    let t = ground_triangle(&[], 1, &tin);
    let deep = Point3::new(2.0, 2.0, -3.0);
    assert!(!t.is_accepted_for_densification(&view, &deep));
    assert!(t.is_accepted_for_classification(&view, &deep));

    // above the classification tolerance: no rescue in classification
    assert!(t.is_accepted_for_classification(&view, &Point3::new(2.0, 2.0, 0.04)));
    assert!(!t.is_accepted_for_classification(&view, &Point3::new(2.0, 2.0, 0.3)));
}

#[test]
fn test_cutting_edge_rescues_point_above_ridge() {
    let h = Point3::new(20.0, 0.0, 5.0);
    let i = Point3::new(15.0, -10.0, 1.0);
    let tin = DelaunayTin::build(&[A, B, C, h, i]);
    let view = TinView {
        thresholds: thresholds(45.0),
        tin: &tin,
        tin_range: tin.range(),
    };
    let t = ground_triangle(&[], 1, &tin);
    let p = Point3::new(8.0, 1.0, 1.0);

    let mirror = mirror_point(&p, &B);
    assert_eq!(mirror, Point3::new(12.0, -1.0, 1.0));
    let hit = tin.find_nearest_triangle(&mirror).unwrap();
    assert_abs_diff_eq!(hit.distance, 15.0 / 12725f64.sqrt(), epsilon = 1e-9);

    assert!(t.is_accepted_for_densification(&view, &p));
    assert!(!t.is_accepted_for_classification(&view, &p));
}

#[test]
fn test_cutting_edge_rejects_when_mirror_is_far() {
    let h = Point3::new(20.0, 0.0, 2.0);
    let i = Point3::new(15.0, -10.0, 1.0);
    let tin = DelaunayTin::build(&[A, B, C, h, i]);
    let view = TinView {
        thresholds: thresholds(45.0),
        tin: &tin,
        tin_range: tin.range(),
    };
    let t = ground_triangle(&[], 1, &tin);
    let hit = tin
        .find_nearest_triangle(&Point3::new(12.0, -1.0, 1.0))
        .unwrap();
    assert!(hit.distance > 0.5);
    assert!(!t.is_accepted_for_densification(&view, &Point3::new(8.0, 1.0, 1.0)));
}

#[test]
fn test_query_slab_reaches_survey_floor() {
    let floor = Aabb::new(Point3::new(-5.0, -5.0, -2.0), Point3::new(20.0, 20.0, 3.0));
    let slab = compute_query_slab(&Triangle::new(A, B, C), 0.5, &floor);
    assert_abs_diff_eq!(slab.min.z, -2.0);
    assert_abs_diff_eq!(slab.max.z, 0.5);
    assert_abs_diff_eq!(slab.min.x, 0.0);
    assert_abs_diff_eq!(slab.max.y, 10.0);
}

#[test]
fn test_best_points_closest_to_centroid_first() {
    let tin = DelaunayTin::build(&[A, B, C]);
    let view = TinView {
        thresholds: thresholds(10.0),
        tin: &tin,
        tin_range: tin.range(),
    };
    let cloud = [
        A,
        B,
        C,
        Point3::new(5.0, 2.0, 0.0),
        Point3::new(3.0, 3.0, 0.1),
        Point3::new(2.0, 2.0, 0.45),
    ];

    let single = ground_triangle(&cloud, 1, &tin);
    single.prefetch_points().unwrap();
    assert!(single.memory_size() > 0);
    assert_eq!(single.query_points_to_add(&view), vec![Point3::new(3.0, 3.0, 0.1)]);
    assert_eq!(single.memory_size(), 0);

    let pair = ground_triangle(&cloud, 2, &tin);
    pair.prefetch_points().unwrap();
    assert_eq!(
        pair.query_points_to_add(&view),
        vec![Point3::new(3.0, 3.0, 0.1), Point3::new(2.0, 2.0, 0.45)]
    );
}

#[test]
fn test_try_point_to_add_reports_accepted_points() {
    let tin = DelaunayTin::build(&[A, B, C]);
    let view = TinView {
        thresholds: thresholds(10.0),
        tin: &tin,
        tin_range: tin.range(),
    };
    let t = ground_triangle(&[], 1, &tin);
    assert!(!t.try_point_to_add(&view, &Point3::new(2.0, 2.0, 3.0)));
    assert!(t.try_point_to_add(&view, &Point3::new(2.0, 2.0, 0.1)));
}

#[test]
fn test_candidate_order_ties_on_elevation() {
    let centroid = Point3::new(0.0, 0.0, 0.0);
    let near = Point3::new(1.0, 0.0, 0.0);
    let far = Point3::new(2.0, 0.0, -1.0);
    assert!(compare_candidates(&near, &far, &centroid).is_lt());
    // same distance within a millimeter: the lower one wins
    let low = Point3::new(0.0, 1.0, -0.0002);
    assert!(compare_candidates(&low, &near, &centroid).is_lt());
}

#[test]
fn test_edge_threshold() {
    let tiny = Triangle::new(A, Point3::new(0.1, 0.0, 0.0), Point3::new(0.0, 0.1, 0.0));
    assert!(!is_densification_required(&tiny, 0.5));
    let sliver = Triangle::new(A, Point3::new(0.3, 0.0, 0.0), C);
    assert!(is_densification_required(&sliver, 0.5));
    assert!(is_densification_required(&Triangle::new(A, B, C), 0.5));
}
