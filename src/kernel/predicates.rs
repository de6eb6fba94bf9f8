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

use crate::{geometry::point::Point3, numeric::exact::ExactRational};

const EPSILON: f64 = f64::EPSILON * 0.5;
const CCW_ERRBOUND_A: f64 = (3.0 + 16.0 * EPSILON) * EPSILON;
const ICC_ERRBOUND_A: f64 = (10.0 + 96.0 * EPSILON) * EPSILON;

/// Orientation of `c` relative to the directed line `a -> b` in xy.
///
/// `Greater` for counter-clockwise, `Less` for clockwise, `Equal` when
/// collinear. Falls back to exact rationals when the filter cannot decide.
pub fn orient2d(a: &Point3, b: &Point3, c: &Point3) -> Ordering {
    let left = (a.x - c.x) * (b.y - c.y);
    let right = (a.y - c.y) * (b.x - c.x);
    let det = left - right;

    let detsum = left.abs() + right.abs();
    let bound = CCW_ERRBOUND_A * detsum;
    if det.is_finite() && (det > bound || -det > bound) {
        return det.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
    }
    orient2d_exact(a, b, c)
}

fn orient2d_exact(a: &Point3, b: &Point3, c: &Point3) -> Ordering {
    let q = |v: f64| ExactRational::from_f64(v);
    let (ax, ay) = (q(a.x), q(a.y));
    let (bx, by) = (q(b.x), q(b.y));
    let (cx, cy) = (q(c.x), q(c.y));

    let acx = &ax - &cx;
    let acy = &ay - &cy;
    let bcx = &bx - &cx;
    let bcy = &by - &cy;
    (&(&acx * &bcy) - &(&acy * &bcx)).sign()
}

/// Side of `p` relative to the line through `a` with direction `dir`, both
/// in xy: `Greater` on the left, `Less` on the right, `Equal` on the line.
pub fn orient2d_direction(a: &Point3, dir: &Point3, p: &Point3) -> Ordering {
    let left = dir.x * (p.y - a.y);
    let right = dir.y * (p.x - a.x);
    let det = left - right;

    let bound = CCW_ERRBOUND_A * (left.abs() + right.abs());
    if det.is_finite() && (det > bound || -det > bound) {
        return det.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
    }

    let q = |v: f64| ExactRational::from_f64(v);
    let left = &q(dir.x) * &(&q(p.y) - &q(a.y));
    let right = &q(dir.y) * &(&q(p.x) - &q(a.x));
    (&left - &right).sign()
}

/// Compares the xy distances from `c` to `p` and to `q`.
pub fn cmp_distance_xy(c: &Point3, p: &Point3, q: &Point3) -> Ordering {
    let lift = |v: &Point3| {
        let dx = v.x - c.x;
        let dy = v.y - c.y;
        dx * dx + dy * dy
    };
    let (lp, lq) = (lift(p), lift(q));
    let det = lp - lq;

    let bound = 8.0 * EPSILON * (lp + lq);
    if det.is_finite() && (det > bound || -det > bound) {
        return det.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
    }

    let r = |v: f64| ExactRational::from_f64(v);
    let (cx, cy) = (r(c.x), r(c.y));
    let exact_lift = |v: &Point3| {
        let dx = &r(v.x) - &cx;
        let dy = &r(v.y) - &cy;
        &(&dx * &dx) + &(&dy * &dy)
    };
    (&exact_lift(p) - &exact_lift(q)).sign()
}

/// Whether `d` lies inside the circumcircle of the counter-clockwise
/// triangle `a, b, c` (`Greater`), on it (`Equal`) or outside (`Less`).
pub fn incircle(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> Ordering {
    let adx = a.x - d.x;
    let ady = a.y - d.y;
    let bdx = b.x - d.x;
    let bdy = b.y - d.y;
    let cdx = c.x - d.x;
    let cdy = c.y - d.y;

    let bdxcdy = bdx * cdy;
    let cdxbdy = cdx * bdy;
    let alift = adx * adx + ady * ady;

    let cdxady = cdx * ady;
    let adxcdy = adx * cdy;
    let blift = bdx * bdx + bdy * bdy;

    let adxbdy = adx * bdy;
    let bdxady = bdx * ady;
    let clift = cdx * cdx + cdy * cdy;

    let det = alift * (bdxcdy - cdxbdy) + blift * (cdxady - adxcdy) + clift * (adxbdy - bdxady);

    let permanent = (bdxcdy.abs() + cdxbdy.abs()) * alift
        + (cdxady.abs() + adxcdy.abs()) * blift
        + (adxbdy.abs() + bdxady.abs()) * clift;
    let bound = ICC_ERRBOUND_A * permanent;
    if det.is_finite() && (det > bound || -det > bound) {
        return det.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
    }
    incircle_exact(a, b, c, d)
}

fn incircle_exact(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> Ordering {
    let q = |v: f64| ExactRational::from_f64(v);
    let (dx, dy) = (q(d.x), q(d.y));
    let adx = &q(a.x) - &dx;
    let ady = &q(a.y) - &dy;
    let bdx = &q(b.x) - &dx;
    let bdy = &q(b.y) - &dy;
    let cdx = &q(c.x) - &dx;
    let cdy = &q(c.y) - &dy;

    let alift = &(&adx * &adx) + &(&ady * &ady);
    let blift = &(&bdx * &bdx) + &(&bdy * &bdy);
    let clift = &(&cdx * &cdx) + &(&cdy * &cdy);

    let t1 = &alift * &(&(&bdx * &cdy) - &(&cdx * &bdy));
    let t2 = &blift * &(&(&cdx * &ady) - &(&adx * &cdy));
    let t3 = &clift * &(&(&adx * &bdy) - &(&bdx * &ady));
    (&(&t1 + &t2) + &t3).sign()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccw_test() {
        let a = Point3::new(0.0, 0.0, 5.0);
        let b = Point3::new(1.0, 0.0, -2.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        assert_eq!(orient2d(&a, &b, &c), Ordering::Greater);
        assert_eq!(orient2d(&a, &c, &b), Ordering::Less);
    }

    #[test]
    fn nearly_collinear_is_decided_exactly() {
        let a = Point3::new(0.5, 0.5, 0.0);
        let b = Point3::new(12.0, 12.0, 0.0);
        let c = Point3::new(24.0, 24.0, 0.0);
        assert_eq!(orient2d(&a, &b, &c), Ordering::Equal);
        let c2 = Point3::new(24.0, 24.000000000000004, 0.0);
        assert_eq!(orient2d(&a, &b, &c2), Ordering::Greater);
    }

    #[test]
    fn direction_sides() {
        let a = Point3::new(1.0, 1.0, 0.0);
        let up = Point3::new(0.0, 5.0, 0.0);
        assert_eq!(orient2d_direction(&a, &up, &Point3::new(0.0, 7.0, 0.0)), Ordering::Greater);
        assert_eq!(orient2d_direction(&a, &up, &Point3::new(2.0, -7.0, 0.0)), Ordering::Less);
        assert_eq!(orient2d_direction(&a, &up, &Point3::new(1.0, -40.0, 0.0)), Ordering::Equal);
        let diagonal = Point3::new(-4.0, -3.0, 0.0);
        assert_eq!(orient2d_direction(&a, &diagonal, &Point3::new(-7.0, -5.0, 0.0)), Ordering::Equal);
        assert_eq!(orient2d_direction(&a, &diagonal, &Point3::new(-7.0, -5.000000000000001, 0.0)), Ordering::Greater);
    }

    #[test]
    fn distance_comparison_is_exact() {
        let c = Point3::new(0.5, 0.5, 0.0);
        let p = Point3::new(1.5, 0.5, 3.0);
        let q = Point3::new(0.5, -0.5, -1.0);
        assert_eq!(cmp_distance_xy(&c, &p, &q), Ordering::Equal);
        assert_eq!(cmp_distance_xy(&c, &p, &Point3::new(0.5, 0.5000000000000001, 0.0)), Ordering::Greater);
        assert_eq!(cmp_distance_xy(&c, &Point3::new(0.5, 2.0, 0.0), &q), Ordering::Greater);
    }

    #[test]
    fn cocircular_point_is_on_circle() {
        let a = Point3::new(1.0, 0.0, 0.0);
        let b = Point3::new(0.0, 1.0, 0.0);
        let c = Point3::new(-1.0, 0.0, 0.0);
        assert_eq!(incircle(&a, &b, &c, &Point3::new(0.0, -1.0, 0.0)), Ordering::Equal);
        assert_eq!(incircle(&a, &b, &c, &Point3::new(0.0, 0.0, 0.0)), Ordering::Greater);
        assert_eq!(incircle(&a, &b, &c, &Point3::new(3.0, 3.0, 0.0)), Ordering::Less);
    }
}
