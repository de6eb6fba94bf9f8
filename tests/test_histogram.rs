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

use approx::assert_abs_diff_eq;
use groundtin::{GroundDetectionError, numeric::Histogram};

fn one_to_ten() -> Histogram {
    let mut h = Histogram::new(0.0, 10.0, 11);
    for v in 1..=10 {
        h.increment_count_from_value(v as f64);
    }
    h
}

#[test]
fn test_increment_lands_in_floor_bucket() {
    let mut h = Histogram::new(0.0, 10.0, 11);
    h.increment_count_from_value(3.2);
    assert_eq!(h.count_from_value(3.7), 1);
    assert_eq!(h.count(3), 1);
    assert_eq!(h.count(4), 0);
}

#[test]
fn test_out_of_range_values_are_ignored() {
    let mut h = Histogram::new(0.0, 10.0, 11);
    h.increment_count_from_value(-0.1);
    h.increment_count_from_value(10.5);
    h.increment_count_from_value(f64::NAN);
    assert_eq!(h.total_count(), 0);
    h.increment_count_from_value(10.0);
    assert_eq!(h.count(10), 1);
}

#[test]
fn test_percentile_is_nearest_rank() {
    let h = one_to_ten();
    assert_abs_diff_eq!(h.compute_percentile(0.0), 1.0);
    assert_abs_diff_eq!(h.compute_percentile(50.0), 5.0);
    assert_abs_diff_eq!(h.compute_percentile(100.0), 10.0);
    assert_abs_diff_eq!(h.compute_percentile(250.0), 10.0);
    assert_abs_diff_eq!(h.compute_percentile(-5.0), 1.0);
}

#[test]
fn test_median_even_and_odd() {
    let mut h = one_to_ten();
    assert_abs_diff_eq!(h.compute_median(), 5.5);
    h.increment_count_from_value(10.0);
    assert_abs_diff_eq!(h.compute_median(), 6.0);
}

#[test]
fn test_empty_histogram_reports_min() {
    let h = Histogram::new(0.25, 4.0, 16);
    assert_abs_diff_eq!(h.compute_percentile(80.0), 0.25);
    assert_abs_diff_eq!(h.compute_median(), 0.25);
}

#[test]
fn test_zero_width_range_uses_bucket_zero() {
    let mut h = Histogram::new(2.0, 2.0, 5);
    h.increment_count_from_value(2.0);
    h.increment_count_from_value(2.1);
    assert_eq!(h.count(0), 1);
    assert_eq!(h.total_count(), 1);
}

#[test]
fn test_merge_sums_buckets() {
    let mut a = one_to_ten();
    let mut b = Histogram::new(0.0, 10.0, 11);
    b.increment_count_from_value(3.0);
    b.increment_count_from_value(3.0);
    a.merge_with(&b).unwrap();
    assert_eq!(a.count(3), 3);
    assert_eq!(a.total_count(), 12);
}

#[test]
fn test_merge_incompatible_leaves_target_untouched() {
    let mut a = one_to_ten();
    let before = a.clone();
    let b = Histogram::new(0.0, 20.0, 11);
    let err = a.merge_with(&b).unwrap_err();
    assert!(matches!(err, GroundDetectionError::MergeIncompatible { .. }));
    assert_eq!(a, before);
}

#[test]
fn test_convert_rescales_axis_only() {
    let mut h = one_to_ten();
    h.convert_to(100.0);
    assert_abs_diff_eq!(h.max(), 1000.0);
    assert_abs_diff_eq!(h.value_from_index(3), 300.0);
    assert_eq!(h.count(3), 1);
    assert_eq!(h.count_from_value(300.0), 1);
}

#[test]
fn test_reset_clears_counts() {
    let mut h = one_to_ten();
    h.reset();
    assert_eq!(h.total_count(), 0);
    assert_eq!(h.bucket_count(), 11);
}
