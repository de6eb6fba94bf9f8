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

//! A TIN face under densification and its candidate acceptance rules.

use std::{
    cmp::Ordering,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
};

use crate::{
    error::Result,
    geometry::{
        aabb::Aabb,
        point::Point3,
        transform::Transform,
        triangle::Triangle,
        util::TOLERANCE_FACTOR,
        vector::Vector3,
    },
    ground::{estimator::AdaptiveThresholds, seed::CONTAINER_MAX_SIZE},
    operations::triangulation::TriangulationProvider,
    provider::{PointsProvider, PointsProviderCreator},
};

/// Read-only state of the current iteration shared by every ground
/// triangle.
#[derive(Clone, Copy)]
pub struct TinView<'a> {
    pub thresholds: AdaptiveThresholds,
    pub tin: &'a dyn TriangulationProvider,
    /// Range of the survey, in meters.
    pub tin_range: Aabb,
}

/// Query volume of a face: the footprint swept by the normal scaled to
/// `height` in both directions, extended down to the survey floor.
pub fn compute_query_slab(triangle: &Triangle, height: f64, tin_range: &Aabb) -> Aabb {
    let sweep = triangle
        .plane()
        .normal
        .scale_to_length(height)
        .unwrap_or(Vector3::new(0.0, 0.0, 0.0));
    let mut slab = triangle.range().swept(&sweep);
    if !tin_range.is_empty() {
        slab.extend(&Point3::new(slab.min.x, slab.min.y, tin_range.min.z));
    }
    slab
}

/// `p` reflected through `node`, keeping the elevation of `p`.
#[inline]
pub fn mirror_point(p: &Point3, node: &Point3) -> Point3 {
    Point3::new(2.0 * node.x - p.x, 2.0 * node.y - p.y, p.z)
}

/// Best-point order: closer to the centroid first; within 1 mm of the same
/// distance, lower first.
pub fn compare_candidates(a: &Point3, b: &Point3, centroid: &Point3) -> Ordering {
    let da = a.distance_to(centroid);
    let db = b.distance_to(centroid);
    if (da - db).abs() <= TOLERANCE_FACTOR {
        a.cmp_zxy(b)
    } else if da < db {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Best candidates seen by one triangle.
#[derive(Clone, Debug, Default)]
pub struct TinPointContainer {
    capacity: usize,
    points: Vec<Point3>,
}

impl TinPointContainer {
    pub fn new(capacity: usize) -> Self {
        TinPointContainer {
            capacity: capacity.max(1),
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points = Vec::new();
    }

    fn add_point(&mut self, p: Point3, triangle: &GroundTriangle, view: &TinView<'_>) {
        if self.capacity == 1 {
            if !triangle.is_accepted_for_densification(view, &p) {
                return;
            }
            match self.points.first_mut() {
                None => self.points.push(p),
                Some(best) => {
                    if compare_candidates(&p, best, triangle.triangle.centroid()).is_lt() {
                        *best = p;
                    }
                }
            }
            return;
        }

        self.points.push(p);
        if self.points.len() > CONTAINER_MAX_SIZE {
            self.points
                .retain(|q| triangle.is_accepted_for_densification(view, q));
            if self.points.len() > self.capacity {
                self.points
                    .select_nth_unstable_by(self.capacity - 1, |a, b| a.cmp_zxy(b));
                self.points.truncate(self.capacity);
            }
        }
    }

    /// Accepted candidates, best first.
    fn best_points(&self, triangle: &GroundTriangle, view: &TinView<'_>) -> Vec<Point3> {
        if self.capacity == 1 {
            return self.points.clone();
        }
        let mut accepted: Vec<Point3> = self
            .points
            .iter()
            .copied()
            .filter(|q| triangle.is_accepted_for_densification(view, q))
            .collect();
        let centroid = triangle.triangle.centroid();
        // selection keeps the tolerance comparator away from sort's total
        // order requirement
        let mut out = Vec::with_capacity(self.capacity.min(accepted.len()));
        while out.len() < self.capacity && !accepted.is_empty() {
            let mut best = 0;
            for i in 1..accepted.len() {
                if compare_candidates(&accepted[i], &accepted[best], centroid).is_lt() {
                    best = i;
                }
            }
            out.push(accepted.swap_remove(best));
        }
        out
    }
}

/// A TIN face scheduled for densification.
pub struct GroundTriangle {
    triangle: Triangle,
    slab_meters: Aabb,
    slab_project: Aabb,
    points_to_add: usize,
    provider: Mutex<Box<dyn PointsProvider>>,
    container: Mutex<TinPointContainer>,
    memory_size: AtomicUsize,
}

impl std::fmt::Debug for GroundTriangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundTriangle")
            .field("triangle", &self.triangle)
            .field("slab_meters", &self.slab_meters)
            .field("points_to_add", &self.points_to_add)
            .finish()
    }
}

impl GroundTriangle {
    /// Binds `triangle` to a provider over its query slab.
    pub fn new(
        triangle: Triangle,
        height: f64,
        tin_range: &Aabb,
        creator: &dyn PointsProviderCreator,
        meters_to_project: &Transform,
        use_multi_thread: bool,
        points_to_add: usize,
    ) -> Self {
        let slab_meters = compute_query_slab(&triangle, height, tin_range);
        let slab_project = meters_to_project.apply_range(&slab_meters);
        let mut provider = creator.create(&slab_project);
        provider.set_use_meter_unit(true);
        provider.set_use_multi_thread(use_multi_thread);
        GroundTriangle {
            triangle,
            slab_meters,
            slab_project,
            points_to_add: points_to_add.max(1),
            provider: Mutex::new(provider),
            container: Mutex::new(TinPointContainer::new(points_to_add)),
            memory_size: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn triangle(&self) -> &Triangle {
        &self.triangle
    }

    #[inline]
    pub fn slab_meters(&self) -> &Aabb {
        &self.slab_meters
    }

    #[inline]
    pub fn slab_project(&self) -> &Aabb {
        &self.slab_project
    }

    #[inline]
    pub fn points_to_add(&self) -> usize {
        self.points_to_add
    }

    pub fn memory_size(&self) -> usize {
        self.memory_size.load(AtomicOrdering::Relaxed)
    }

    /// `true` unless at least two edges are shorter than `edge_threshold`.
    pub fn is_densification_required(&self, edge_threshold: f64) -> bool {
        is_densification_required(&self.triangle, edge_threshold)
    }

    pub fn prefetch_points(&self) -> Result<()> {
        let mut provider = self.provider.lock().unwrap_or_else(|e| e.into_inner());
        provider.prefetch_points()?;
        self.memory_size
            .store(provider.memory_size(), AtomicOrdering::Relaxed);
        Ok(())
    }

    /// Runs every prefetched point through the container, releases the
    /// prefetch and returns the best accepted points, best first.
    pub fn query_points_to_add(&self, view: &TinView<'_>) -> Vec<Point3> {
        let mut provider = self.provider.lock().unwrap_or_else(|e| e.into_inner());
        let mut container = self.container.lock().unwrap_or_else(|e| e.into_inner());
        for p in provider.points() {
            container.add_point(*p, self, view);
        }
        provider.clear_prefetched_points();
        self.memory_size.store(0, AtomicOrdering::Relaxed);
        container.best_points(self, view)
    }

    /// Offers a single candidate; `true` once the triangle holds at least
    /// one accepted point.
    pub fn try_point_to_add(&self, view: &TinView<'_>, p: &Point3) -> bool {
        let mut container = self.container.lock().unwrap_or_else(|e| e.into_inner());
        container.add_point(*p, self, view);
        !container.is_empty()
    }

    pub fn is_accepted_for_densification(&self, view: &TinView<'_>, p: &Point3) -> bool {
        if self.triangle.is_equal_to_one_vertex(p) {
            return false;
        }
        self.is_accepted(view, p, false)
    }

    pub fn is_accepted_for_classification(&self, view: &TinView<'_>, p: &Point3) -> bool {
        self.is_accepted(view, p, true)
    }

    /// Distance test, cutting-edge rescue (densification only), then
    /// footprint and angle tests. The last two are skipped for points below
    /// the surface in a classification pass.
    pub fn is_accepted(&self, view: &TinView<'_>, p: &Point3, classification: bool) -> bool {
        let thresholds = &view.thresholds;
        let threshold = if classification {
            thresholds.classification_tolerance
        } else {
            thresholds.height
        };

        let Some(plane) = self.triangle.unit_plane() else {
            return false;
        };
        let distance = plane.evaluate(p);

        if distance > 0.0 && distance > threshold {
            if classification || !self.is_accepted_by_cutting_edge(view, p, threshold) {
                return false;
            }
        }

        let below = distance <= 0.0;
        if !classification || !below {
            let Some(projected) = plane.project_point(p) else {
                return false;
            };
            if !self.triangle.is_point_on_plane_inside(&projected, false) {
                return false;
            }
            for v in self.triangle.points() {
                let alpha = v.vector_to(&projected).angle_to(&v.vector_to(p));
                if alpha > thresholds.angle {
                    return false;
                }
            }
        }
        true
    }

    /// Reflects `p` through its nearest vertices and accepts it when a
    /// mirror lies within `threshold` of the TIN.
    fn is_accepted_by_cutting_edge(&self, view: &TinView<'_>, p: &Point3, threshold: f64) -> bool {
        self.triangle.nearest_vertices(p).iter().any(|node| {
            view.tin
                .find_nearest_triangle(&mirror_point(p, node))
                .is_some_and(|n| n.distance <= threshold)
        })
    }
}

/// `true` unless at least two of the triangle's edges are shorter than
/// `edge_threshold`.
pub fn is_densification_required(triangle: &Triangle, edge_threshold: f64) -> bool {
    let short = triangle
        .edge_lengths()
        .iter()
        .filter(|&&l| l < edge_threshold)
        .count();
    short < 2
}
