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

use std::cmp::Ordering;

use groundtin::geometry::Point3;
use groundtin::kernel::{incircle, orient2d};

fn p(x: f64, y: f64) -> Point3 {
    Point3::new(x, y, 0.0)
}

#[test]
fn test_orient2d_signs() {
    assert_eq!(orient2d(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.0, 1.0)), Ordering::Greater);
    assert_eq!(orient2d(&p(0.0, 0.0), &p(0.0, 1.0), &p(1.0, 0.0)), Ordering::Less);
    assert_eq!(orient2d(&p(0.0, 0.0), &p(1.0, 1.0), &p(3.0, 3.0)), Ordering::Equal);
}

#[test]
fn test_orient2d_ignores_z() {
    let a = Point3::new(0.0, 0.0, 5.0);
    let b = Point3::new(1.0, 0.0, -2.0);
    let c = Point3::new(0.0, 1.0, 100.0);
    assert_eq!(orient2d(&a, &b, &c), Ordering::Greater);
}

#[test]
fn test_orient2d_nearly_collinear_is_exact() {
    // c sits one ulp off the line through a and b
    let a = p(0.5, 0.5);
    let b = p(12.0, 12.0);
    let c = p(24.0, f64::from_bits(24.0f64.to_bits() + 1));
    assert_eq!(orient2d(&a, &b, &c), Ordering::Greater);
    let c_on = p(24.0, 24.0);
    assert_eq!(orient2d(&a, &b, &c_on), Ordering::Equal);
}

#[test]
fn test_incircle_unit_square() {
    let a = p(0.0, 0.0);
    let b = p(1.0, 0.0);
    let c = p(1.0, 1.0);
    assert_eq!(incircle(&a, &b, &c, &p(0.0, 1.0)), Ordering::Equal);
    assert_eq!(incircle(&a, &b, &c, &p(0.5, 0.5)), Ordering::Greater);
    assert_eq!(incircle(&a, &b, &c, &p(3.0, 3.0)), Ordering::Less);
}
