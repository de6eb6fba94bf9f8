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

use crate::geometry::{aabb::Aabb, point::Point3, triangle::Triangle};

pub mod delaunay;
pub mod face_index;

pub use delaunay::DelaunayTin;

/// Result of a nearest-triangle query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestTriangle {
    pub triangle: Triangle,
    /// Signed distance from the query point to the triangle's upward plane.
    pub distance: f64,
}

/// Incremental 2.5D triangulation the ground detector grows.
///
/// Writers (`add_point`, `triangulate`, `clear`) run on one thread; every
/// `&self` query must be safe to call from many threads at once.
pub trait TriangulationProvider: Send + Sync {
    /// Queues a point. Returns `false` when a point with the same xy is
    /// already present, in which case nothing changes.
    fn add_point(&mut self, p: Point3) -> bool;

    /// Inserts the queued points and returns the triangle count. Calling it
    /// again without new points returns the same count.
    fn triangulate(&mut self) -> usize;

    /// Triangle count as of the last `triangulate`.
    fn triangle_count(&self) -> usize;

    /// Number of points added so far, triangulated or not.
    fn point_count(&self) -> usize;

    fn all_points(&self) -> Vec<Point3>;

    /// Faces as of the last `triangulate`, counter-clockwise in xy.
    fn faces(&self) -> Vec<[Point3; 3]>;

    /// Face containing `p` in xy, or the face nearest to it.
    fn find_nearest_triangle(&self, p: &Point3) -> Option<NearestTriangle>;

    /// Bounding box of all added points.
    fn range(&self) -> Aabb;

    /// Drops every point and face.
    fn clear(&mut self);

    /// Independent copy, used for throwaway preview meshes.
    fn snapshot(&self) -> Box<dyn TriangulationProvider>;

    fn memory_size(&self) -> usize {
        0
    }
}
