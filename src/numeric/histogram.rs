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

use crate::error::{GroundDetectionError, Result};

/// Fixed-range frequency counter with nearest-rank percentile queries.
///
/// The range `[min, max]` is split into `bucket_count` buckets of width
/// `(max - min) / (bucket_count - 1)`, so bucket `i` is labelled
/// `min + i * step` and `max` falls into the last bucket. A zero-width or
/// reversed range has an inverse step of zero and routes every in-range
/// value into bucket 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    min: f64,
    max: f64,
    step: f64,
    inv_step: f64,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn new(min: f64, max: f64, bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(1);
        let step = (max - min) / (bucket_count as f64 - 1.0);
        let inv_step = if step.is_finite() && step > 0.0 { 1.0 / step } else { 0.0 };
        Histogram {
            min,
            max,
            step,
            inv_step,
            counts: vec![0; bucket_count],
        }
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.counts.len()
    }

    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    #[inline]
    pub fn count(&self, index: usize) -> u64 {
        self.counts.get(index).copied().unwrap_or(0)
    }

    /// Bucket holding `v`, `None` outside `[min, max]` (and for NaN).
    pub fn index_from_value(&self, v: f64) -> Option<usize> {
        if !(v >= self.min && v <= self.max) {
            return None;
        }
        let raw = ((v - self.min) * self.inv_step).floor();
        let last = self.counts.len() - 1;
        Some((raw as usize).min(last))
    }

    pub fn increment_count_from_value(&mut self, v: f64) {
        if let Some(i) = self.index_from_value(v) {
            self.counts[i] += 1;
        }
    }

    pub fn count_from_value(&self, v: f64) -> u64 {
        self.index_from_value(v).map_or(0, |i| self.counts[i])
    }

    #[inline]
    pub fn value_from_index(&self, index: usize) -> f64 {
        if index == 0 {
            self.min
        } else {
            self.min + index as f64 * self.step
        }
    }

    /// Value of the first bucket whose running count reaches `rank`.
    fn value_at_rank(&self, rank: u64) -> f64 {
        let mut cumulative = 0u64;
        for (i, c) in self.counts.iter().enumerate() {
            cumulative += c;
            if cumulative >= rank {
                return self.value_from_index(i);
            }
        }
        self.value_from_index(self.counts.len() - 1)
    }

    /// Nearest-rank percentile, `p` clamped to `[0, 100]`.
    ///
    /// An empty histogram reports `min`.
    pub fn compute_percentile(&self, p: f64) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return self.min;
        }
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
        let rank = ((p / 100.0) * total as f64).round() as u64;
        self.value_at_rank(rank.max(1))
    }

    pub fn compute_median(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return self.min;
        }
        if total % 2 == 0 {
            let lo = self.value_at_rank(total / 2);
            let hi = self.value_at_rank(total / 2 + 1);
            0.5 * (lo + hi)
        } else {
            self.value_at_rank(total / 2 + 1)
        }
    }

    /// Adds `other` bucket by bucket. Nothing changes on mismatch.
    pub fn merge_with(&mut self, other: &Histogram) -> Result<()> {
        if self.min != other.min || self.max != other.max || self.counts.len() != other.counts.len()
        {
            return Err(GroundDetectionError::MergeIncompatible {
                min_a: self.min,
                max_a: self.max,
                buckets_a: self.counts.len(),
                min_b: other.min,
                max_b: other.max,
                buckets_b: other.counts.len(),
            });
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        Ok(())
    }

    /// Rescales the value axis by `factor`; counts are kept.
    pub fn convert_to(&mut self, factor: f64) {
        self.min *= factor;
        self.max *= factor;
        self.step *= factor;
        self.inv_step = if self.step.is_finite() && self.step > 0.0 {
            1.0 / self.step
        } else {
            0.0
        };
    }
}
