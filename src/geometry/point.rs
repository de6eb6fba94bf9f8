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

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
    ops::{Add, Index, Sub},
};

use serde::{Deserialize, Serialize};

use crate::geometry::vector::{Vector3, VectorOps};

/// A point of the cloud, in meters unless stated otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn from_vals(vals: [f64; 3]) -> Self {
        Self::new(vals[0], vals[1], vals[2])
    }

    #[inline]
    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn vector_to(&self, other: &Point3) -> Vector3 {
        Vector3::new(other.x - self.x, other.y - self.y, other.z - self.z)
    }

    #[inline]
    pub fn as_vector(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn add_vector(&self, v: &Vector3) -> Point3 {
        Point3::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    #[inline]
    pub fn distance_to(&self, other: &Point3) -> f64 {
        self.vector_to(other).norm()
    }

    #[inline]
    pub fn distance_xy_to(&self, other: &Point3) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Component-wise equality with an absolute tolerance.
    #[inline]
    pub fn is_equal_tol(&self, other: &Point3, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol
            && (self.y - other.y).abs() <= tol
            && (self.z - other.z).abs() <= tol
    }

    /// Total order on z, then x, then y. `-0.0` and `0.0` compare equal,
    /// as they do for [`PointKey`].
    #[inline]
    pub fn cmp_zxy(&self, other: &Point3) -> Ordering {
        #[inline(always)]
        fn cmp(a: f64, b: f64) -> Ordering {
            unsigned_zero(a).total_cmp(&unsigned_zero(b))
        }
        cmp(self.z, other.z)
            .then_with(|| cmp(self.x, other.x))
            .then_with(|| cmp(self.y, other.y))
    }

    #[inline]
    pub fn key(&self) -> PointKey {
        PointKey::from(self)
    }
}

impl Index<usize> for Point3 {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("axis index out of range: the len is 3 but the index is {i}"),
        }
    }
}

impl<'a, 'b> Sub<&'b Point3> for &'a Point3 {
    type Output = Vector3;
    fn sub(self, rhs: &'b Point3) -> Vector3 {
        rhs.vector_to(self)
    }
}

impl<'a, 'b> Add<&'b Vector3> for &'a Point3 {
    type Output = Point3;
    fn add(self, rhs: &'b Vector3) -> Point3 {
        self.add_vector(rhs)
    }
}

/// Bit-exact identity of a point, usable as a hash key.
///
/// `-0.0` is folded onto `0.0` so both spellings of the origin hash alike.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey([u64; 3]);

impl From<&Point3> for PointKey {
    fn from(p: &Point3) -> Self {
        PointKey([
            unsigned_zero(p.x).to_bits(),
            unsigned_zero(p.y).to_bits(),
            unsigned_zero(p.z).to_bits(),
        ])
    }
}

#[inline(always)]
fn unsigned_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

/// A point ordered by z, then x, then y.
///
/// This is the ordering of the pending-point set: iteration visits the
/// lowest candidates first and is reproducible for a given input.
#[derive(Clone, Copy, Debug)]
pub struct ZOrderedPoint(pub Point3);

impl PartialEq for ZOrderedPoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ZOrderedPoint {}

impl PartialOrd for ZOrderedPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ZOrderedPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_zxy(&other.0)
    }
}

impl Hash for ZOrderedPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key().hash(state);
    }
}
