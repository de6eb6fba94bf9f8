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

use crate::geometry::point::Point3;

/// Above this many buffered candidates the set is compacted back to its
/// capacity.
pub const CONTAINER_MAX_SIZE: usize = 400_000;

/// Keeps the `capacity` lowest points of a grid cell.
///
/// Order is z, then x, then y, so two points of equal z are ranked the same
/// way on every run.
#[derive(Clone, Debug)]
pub struct SeedPointCandidateSet {
    capacity: usize,
    points: Vec<Point3>,
}

impl SeedPointCandidateSet {
    pub fn new(capacity: usize) -> Self {
        SeedPointCandidateSet {
            capacity: capacity.max(1),
            points: Vec::new(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len().min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn add_point(&mut self, p: Point3) {
        if self.capacity == 1 {
            match self.points.first_mut() {
                Some(best) if p.cmp_zxy(best).is_lt() => *best = p,
                Some(_) => {}
                None => self.points.push(p),
            }
            return;
        }
        self.points.push(p);
        if self.points.len() > CONTAINER_MAX_SIZE {
            self.compact();
        }
    }

    pub fn extend_from_slice(&mut self, points: &[Point3]) {
        for p in points {
            self.add_point(*p);
        }
    }

    fn compact(&mut self) {
        if self.points.len() > self.capacity {
            self.points
                .select_nth_unstable_by(self.capacity - 1, |a, b| a.cmp_zxy(b));
            self.points.truncate(self.capacity);
        }
    }

    /// The retained points, lowest first.
    pub fn into_lowest(mut self) -> Vec<Point3> {
        self.compact();
        self.points.sort_unstable_by(|a, b| a.cmp_zxy(b));
        self.points
    }
}

/// Lowest `n` points of `points`, lowest first.
pub fn lowest_points(points: &[Point3], n: usize) -> Vec<Point3> {
    let mut set = SeedPointCandidateSet::new(n);
    set.extend_from_slice(points);
    set.into_lowest()
}
