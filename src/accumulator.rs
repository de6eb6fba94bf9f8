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

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use crate::geometry::{point::Point3, transform::Transform};

/// Throwaway mesh handed to preview consumers, in preview coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreviewMesh {
    pub points: Vec<Point3>,
    pub triangles: Vec<[Point3; 3]>,
}

/// Caller-supplied consumer of the ground points found by a run.
pub trait GroundPointsAccumulator: Send + Sync {
    /// Points just inserted in the TIN, in project units.
    fn add_points(&self, _points: &[Point3]) {}

    /// Checked between iterations; `false` stops densification.
    fn should_continue(&self) -> bool {
        true
    }

    /// Maps meters to the preview's coordinates.
    fn preview_transform(&self) -> Transform {
        Transform::identity()
    }

    fn output_preview(&self, _mesh: &PreviewMesh) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullAccumulator;

impl GroundPointsAccumulator for NullAccumulator {}

/// Collects ground points, optionally stopping the run once `limit` points
/// have arrived.
#[derive(Debug, Default)]
pub struct CollectingAccumulator {
    points: Mutex<Vec<Point3>>,
    limit: Option<usize>,
    preview_transform: Transform,
    previews: AtomicUsize,
    last_preview: Mutex<Option<PreviewMesh>>,
}

impl CollectingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        CollectingAccumulator {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_preview_transform(mut self, t: Transform) -> Self {
        self.preview_transform = t;
        self
    }

    pub fn points(&self) -> Vec<Point3> {
        self.points.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.points.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn preview_count(&self) -> usize {
        self.previews.load(Ordering::Relaxed)
    }

    pub fn last_preview(&self) -> Option<PreviewMesh> {
        self.last_preview
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl GroundPointsAccumulator for CollectingAccumulator {
    fn add_points(&self, points: &[Point3]) {
        self.points
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(points);
    }

    fn should_continue(&self) -> bool {
        self.limit.is_none_or(|limit| self.len() < limit)
    }

    fn preview_transform(&self) -> Transform {
        self.preview_transform
    }

    fn output_preview(&self, mesh: &PreviewMesh) {
        self.previews.fetch_add(1, Ordering::Relaxed);
        *self.last_preview.lock().unwrap_or_else(|e| e.into_inner()) = Some(mesh.clone());
    }
}
