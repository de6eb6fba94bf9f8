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

use std::sync::Arc;

use ahash::AHashMap;

use crate::{
    error::{GroundDetectionError, Result},
    geometry::{aabb::Aabb, point::Point3, transform::Transform, util::floor_sat_i64},
};

/// Points of one bounding volume, loaded on demand.
///
/// The range is given in project units. With `set_use_meter_unit(true)` the
/// prefetched points are reported in meters.
pub trait PointsProvider: Send {
    fn set_use_meter_unit(&mut self, on: bool);

    fn set_use_multi_thread(&mut self, on: bool);

    /// Loads every point of the range into memory.
    fn prefetch_points(&mut self) -> Result<()>;

    /// Releases the prefetched points.
    fn clear_prefetched_points(&mut self);

    /// Prefetched points; empty before `prefetch_points`.
    fn points(&self) -> &[Point3];

    /// Range this provider covers, in project units.
    fn range(&self) -> Aabb;

    /// Bytes held by the prefetched points.
    fn memory_size(&self) -> usize {
        std::mem::size_of_val(self.points())
    }
}

/// Factory of range-scoped points providers.
pub trait PointsProviderCreator: Send + Sync {
    /// Extent of the whole cloud, in project units.
    fn bounding_box(&self) -> Aabb;

    fn create(&self, range: &Aabb) -> Box<dyn PointsProvider>;
}

struct SharedCloud {
    points: Vec<Point3>,
    range: Aabb,
    cell: f64,
    hash_inv: f64,
    buckets: AHashMap<(i64, i64), Vec<u32>>,
    to_meters: Option<Transform>,
}

impl SharedCloud {
    #[inline(always)]
    fn key_of(&self, x: f64, y: f64) -> (i64, i64) {
        (
            floor_sat_i64((x - self.range.min.x) * self.hash_inv),
            floor_sat_i64((y - self.range.min.y) * self.hash_inv),
        )
    }

    fn query(&self, range: &Aabb, out: &mut Vec<Point3>) {
        if self.points.is_empty() || range.is_empty() || !range.intersects(&self.range) {
            return;
        }
        let (x0, y0) = self.key_of(range.min.x.max(self.range.min.x), range.min.y.max(self.range.min.y));
        let (x1, y1) = self.key_of(range.max.x.min(self.range.max.x), range.max.y.min(self.range.max.y));
        for kx in x0..=x1 {
            for ky in y0..=y1 {
                if let Some(ids) = self.buckets.get(&(kx, ky)) {
                    out.extend(
                        ids.iter()
                            .map(|&i| self.points[i as usize])
                            .filter(|p| range.contains(p)),
                    );
                }
            }
        }
    }
}

/// Immutable in-memory point cloud, shared by every provider it creates.
///
/// Points are stored in project units and bucketed on a uniform xy grid.
#[derive(Clone)]
pub struct InMemoryPointCloud {
    shared: Arc<SharedCloud>,
}

impl InMemoryPointCloud {
    /// `points` are in project units; `meters_to_project` maps meters to
    /// those units and must match the detector's parameters.
    pub fn new(points: Vec<Point3>, meters_to_project: Transform) -> Self {
        let points: Vec<Point3> = points
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
            .collect();
        let range = Aabb::from_point_iter(&points);

        // about 64 points per bucket
        let area = range.extent(0) * range.extent(1);
        let mut cell = (64.0 * area / points.len().max(1) as f64).sqrt();
        if !cell.is_finite() || cell <= 0.0 {
            cell = range.extent(0).max(range.extent(1)).max(1.0);
        }

        let mut shared = SharedCloud {
            points,
            range,
            cell,
            hash_inv: 1.0 / cell,
            buckets: AHashMap::default(),
            to_meters: meters_to_project.inverse(),
        };
        let mut buckets: AHashMap<(i64, i64), Vec<u32>> = AHashMap::default();
        for (i, p) in shared.points.iter().enumerate() {
            buckets.entry(shared.key_of(p.x, p.y)).or_default().push(i as u32);
        }
        shared.buckets = buckets;

        InMemoryPointCloud {
            shared: Arc::new(shared),
        }
    }

    pub fn len(&self) -> usize {
        self.shared.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.points.is_empty()
    }

    pub fn points(&self) -> &[Point3] {
        &self.shared.points
    }

    pub fn bucket_size(&self) -> f64 {
        self.shared.cell
    }
}

impl PointsProviderCreator for InMemoryPointCloud {
    fn bounding_box(&self) -> Aabb {
        self.shared.range
    }

    fn create(&self, range: &Aabb) -> Box<dyn PointsProvider> {
        Box::new(InMemoryPointsProvider {
            cloud: Arc::clone(&self.shared),
            range: *range,
            use_meters: false,
            multi_thread: false,
            prefetched: Vec::new(),
        })
    }
}

/// Range-scoped view over an [`InMemoryPointCloud`].
pub struct InMemoryPointsProvider {
    cloud: Arc<SharedCloud>,
    range: Aabb,
    use_meters: bool,
    multi_thread: bool,
    prefetched: Vec<Point3>,
}

impl InMemoryPointsProvider {
    pub fn uses_multi_thread(&self) -> bool {
        self.multi_thread
    }
}

impl PointsProvider for InMemoryPointsProvider {
    fn set_use_meter_unit(&mut self, on: bool) {
        self.use_meters = on;
    }

    fn set_use_multi_thread(&mut self, on: bool) {
        self.multi_thread = on;
    }

    fn prefetch_points(&mut self) -> Result<()> {
        self.prefetched.clear();
        self.cloud.query(&self.range, &mut self.prefetched);
        if self.use_meters {
            let to_meters = self.cloud.to_meters.ok_or_else(|| {
                GroundDetectionError::PointsProvider(
                    "meters-to-project transform is not invertible".into(),
                )
            })?;
            if !to_meters.is_identity() {
                for p in &mut self.prefetched {
                    *p = to_meters.apply(p);
                }
            }
        }
        Ok(())
    }

    fn clear_prefetched_points(&mut self) {
        self.prefetched = Vec::new();
    }

    fn points(&self) -> &[Point3] {
        &self.prefetched
    }

    fn range(&self) -> Aabb {
        self.range
    }
}
