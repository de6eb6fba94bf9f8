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

use std::collections::BTreeSet;

use ahash::AHashSet;

use crate::geometry::point::{Point3, PointKey, ZOrderedPoint};

/// Candidate ground points waiting for the next triangulation.
///
/// A true set under full (x, y, z) equality, iterated in z, x, y order.
#[derive(Clone, Debug, Default)]
pub struct PendingPointSet {
    points: BTreeSet<ZOrderedPoint>,
}

impl PendingPointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the point was already pending.
    pub fn insert(&mut self, p: Point3) -> bool {
        self.points.insert(ZOrderedPoint(p))
    }

    pub fn extend<I: IntoIterator<Item = Point3>>(&mut self, points: I) {
        self.points.extend(points.into_iter().map(ZOrderedPoint));
    }

    pub fn contains(&self, p: &Point3) -> bool {
        self.points.contains(&ZOrderedPoint(*p))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point3> + '_ {
        self.points.iter().map(|p| &p.0)
    }

    pub fn to_vec(&self) -> Vec<Point3> {
        self.iter().copied().collect()
    }

    /// Hash keys of every pending point, for face lookups.
    pub fn keys(&self) -> AHashSet<PointKey> {
        self.iter().map(PointKey::from).collect()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
