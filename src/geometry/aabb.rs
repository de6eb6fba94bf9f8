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

use serde::{Deserialize, Serialize};

use crate::geometry::{point::Point3, vector::Vector3};

/// Axis-aligned box. An empty box has `min > max` on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::empty()
    }
}

impl Aabb {
    pub fn new(min: Point3, max: Point3) -> Self {
        Aabb { min, max }
    }

    pub fn empty() -> Self {
        Aabb {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing two points, in any corner order.
    pub fn from_points(a: &Point3, b: &Point3) -> Self {
        let mins = std::array::from_fn(|i| a[i].min(b[i]));
        let maxs = std::array::from_fn(|i| a[i].max(b[i]));
        Aabb::new(Point3::from_vals(mins), Point3::from_vals(maxs))
    }

    pub fn from_point_iter<'a, I: IntoIterator<Item = &'a Point3>>(points: I) -> Self {
        let mut b = Aabb::empty();
        for p in points {
            b.extend(p);
        }
        b
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn extend(&mut self, p: &Point3) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        if !other.is_empty() {
            out.extend(&other.min);
            out.extend(&other.max);
        }
        out
    }

    /// Box swept by translating `self` by `+v` and `-v`.
    pub fn swept(&self, v: &Vector3) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = *self;
        for corner in [self.min, self.max] {
            out.extend(&corner.add_vector(v));
            out.extend(&corner.add_vector(&-*v));
        }
        out
    }

    /// Inclusive containment on all three axes.
    #[inline]
    pub fn contains(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    #[inline]
    pub fn contains_xy(&self, p: &Point3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        for i in 0..3 {
            if self.max[i] < other.min[i] || other.max[i] < self.min[i] {
                return false;
            }
        }
        true
    }

    /// Length along axis `i`; zero for an empty box.
    #[inline]
    pub fn extent(&self, i: usize) -> f64 {
        if self.is_empty() { 0.0 } else { self.max[i] - self.min[i] }
    }

    pub fn center(&self) -> Point3 {
        Point3::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
            0.5 * (self.min.z + self.max.z),
        )
    }

    /// The eight corners, `min` first and `max` last.
    pub fn corners(&self) -> [Point3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// Grows the box by `margin` on both sides of x and y.
    pub fn expanded_xy(&self, margin: f64) -> Aabb {
        Aabb::new(
            Point3::new(self.min.x - margin, self.min.y - margin, self.min.z),
            Point3::new(self.max.x + margin, self.max.y + margin, self.max.z),
        )
    }
}
