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

use std::ops::{Add, Mul, Neg, Sub};

use num_traits::Zero;

pub trait VectorOps<T, C>: Sized {
    fn dot(&self, other: &Self) -> T;
    fn cross(&self, other: &Self) -> C;
    fn norm(&self) -> T;
    fn normalized(&self) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn scale(&self, s: f64) -> Vector3 {
        Vector3::new(self.x * s, self.y * s, self.z * s)
    }

    /// Same direction, magnitude `length`. `None` for the zero vector.
    pub fn scale_to_length(&self, length: f64) -> Option<Vector3> {
        self.normalized().map(|n| n.scale(length))
    }

    /// Angle in radians between `self` and `other`, in `[0, π]`.
    ///
    /// Uses `atan2(|a×b|, a·b)`, which stays accurate near 0 and π. A zero
    /// vector yields 0.
    pub fn angle_to(&self, other: &Vector3) -> f64 {
        let c = self.cross(other).norm();
        let d = self.dot(other);
        c.atan2(d)
    }

    #[inline]
    pub fn magnitude_squared(&self) -> f64 {
        self.dot(self)
    }
}

impl VectorOps<f64, Vector3> for Vector3 {
    #[inline]
    fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    #[inline]
    fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    fn normalized(&self) -> Option<Vector3> {
        let n = self.norm();
        if n.is_zero() || !n.is_finite() {
            return None;
        }
        Some(self.scale(1.0 / n))
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;
    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;
    fn mul(self, s: f64) -> Vector3 {
        self.scale(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn angle_between_axes() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::new(0.0, 0.0, 3.0);
        assert!((a.angle_to(&b) - FRAC_PI_2).abs() < 1e-12);
        assert_eq!(a.angle_to(&a), 0.0);
    }

    #[test]
    fn zero_vector_does_not_normalize() {
        assert!(Vector3::default().normalized().is_none());
        assert!(Vector3::default().scale_to_length(2.0).is_none());
    }
}
