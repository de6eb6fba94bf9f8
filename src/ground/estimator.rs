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

//! Adaptive acceptance thresholds.
//!
//! Every interior edge of the TIN contributes the dihedral angle of its two
//! faces to an angle histogram and five vertex height differences to a
//! height histogram. The thresholds are percentiles of both.

use std::f64::consts::FRAC_PI_2;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    geometry::{
        plane::Plane,
        point::{Point3, PointKey},
        vector::VectorOps,
    },
    numeric::histogram::Histogram,
    operations::triangulation::TriangulationProvider,
    params::GroundDetectionParameters,
};

/// Initial height histogram step, in meters.
pub const HISTO_STEP_PRECISION_FACTOR: f64 = 0.010;
/// Upper bound on height histogram buckets; the step doubles until it fits.
pub const MAX_HISTO_STEP: usize = 100_000;
pub const ANGLE_HISTOGRAM_BUCKETS: usize = 10_000;

/// Consecutive unchanged recomputations after which estimation stops.
const MAX_STRIKES: u32 = 2;

/// Current acceptance thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThresholds {
    /// Radians, in `[0, π/2]`.
    pub angle: f64,
    /// Meters.
    pub height: f64,
    /// Meters.
    pub classification_tolerance: f64,
}

impl AdaptiveThresholds {
    pub fn from_params(params: &GroundDetectionParameters) -> Self {
        AdaptiveThresholds {
            angle: params.angle_threshold_rad().clamp(0.0, FRAC_PI_2),
            height: params.height_threshold,
            classification_tolerance: params.classification_tolerance,
        }
    }
}

/// Height histogram spanning `(precision, z_extent]`, `precision` being the
/// smallest power-of-two multiple of 1 cm keeping the bucket count in bounds.
pub fn height_histogram_for_extent(z_extent: f64) -> Histogram {
    let z_extent = if z_extent.is_finite() { z_extent.max(0.0) } else { 0.0 };
    let mut precision = HISTO_STEP_PRECISION_FACTOR;
    let mut steps = z_extent / precision;
    while steps > MAX_HISTO_STEP as f64 {
        precision *= 2.0;
        steps = z_extent / precision;
    }
    Histogram::new(precision, z_extent, steps as usize)
}

pub fn angle_histogram() -> Histogram {
    Histogram::new(0.0, FRAC_PI_2, ANGLE_HISTOGRAM_BUCKETS)
}

/// Feeds the interior-edge statistics of `faces` into both histograms.
pub fn collect_statistics(faces: &[[Point3; 3]], angles: &mut Histogram, heights: &mut Histogram) {
    // directed edge -> (face, apex)
    let mut half_edges: AHashMap<(PointKey, PointKey), (usize, usize)> =
        AHashMap::with_capacity(faces.len() * 3);
    for (fi, f) in faces.iter().enumerate() {
        for i in 0..3 {
            let a = f[i].key();
            let b = f[(i + 1) % 3].key();
            half_edges.insert((a, b), (fi, (i + 2) % 3));
        }
    }

    let normals: Vec<Option<Plane>> = faces
        .iter()
        .map(|f| Plane::from_points_upward(&f[0], &f[1], &f[2]).normalized())
        .collect();

    for (fi, f) in faces.iter().enumerate() {
        for i in 0..3 {
            let (pa, pb) = (&f[i], &f[(i + 1) % 3]);
            let (ka, kb) = (pa.key(), pb.key());
            if ka > kb {
                continue;
            }
            let Some(&(fj, apex_j)) = half_edges.get(&(kb, ka)) else {
                continue;
            };
            let pc = &f[(i + 2) % 3];
            let pd = &faces[fj][apex_j];

            if let (Some(n1), Some(n2)) = (&normals[fi], &normals[fj]) {
                let cos = n1.normal.dot(&n2.normal).clamp(-1.0, 1.0);
                angles.increment_count_from_value(cos.acos());
            }

            // every pair but the two apexes
            for (u, v) in [(pa, pb), (pa, pc), (pa, pd), (pb, pc), (pb, pd)] {
                heights.increment_count_from_value((u.z - v.z).abs());
            }
        }
    }
}

/// Recomputes [`AdaptiveThresholds`] from the TIN, freezing once they stop
/// changing.
#[derive(Clone, Debug)]
pub struct ParameterEstimator {
    angle_histogram: Histogram,
    height_histogram: Histogram,
    angle_percentile: f64,
    height_percentile: f64,
    classification_auto: bool,
    strike: u32,
    previous: Option<(f64, f64)>,
}

impl ParameterEstimator {
    /// `z_extent` is the height span of the survey, in meters.
    pub fn new(z_extent: f64, params: &GroundDetectionParameters) -> Self {
        ParameterEstimator {
            angle_histogram: angle_histogram(),
            height_histogram: height_histogram_for_extent(z_extent),
            angle_percentile: params.angle_percentile_factor,
            height_percentile: params.height_percentile_factor,
            classification_auto: params.classification_tolerance_auto,
            strike: 0,
            previous: None,
        }
    }

    #[inline]
    pub fn strike_count(&self) -> u32 {
        self.strike
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.strike >= MAX_STRIKES
    }

    /// Starts a new densification pass.
    pub fn reset(&mut self) {
        self.strike = 0;
        self.previous = None;
    }

    pub fn angle_histogram(&self) -> &Histogram {
        &self.angle_histogram
    }

    pub fn height_histogram(&self) -> &Histogram {
        &self.height_histogram
    }

    /// Updates `thresholds` from the faces of `tin`. Returns `false` when
    /// the estimator is frozen and nothing was recomputed.
    pub fn recompute(
        &mut self,
        tin: &dyn TriangulationProvider,
        thresholds: &mut AdaptiveThresholds,
    ) -> bool {
        if self.is_frozen() {
            trace!("thresholds frozen, skipping estimation");
            return false;
        }
        if self.strike == 0 {
            self.previous = Some((thresholds.angle, thresholds.height));
        }

        self.angle_histogram.reset();
        self.height_histogram.reset();
        collect_statistics(
            &tin.faces(),
            &mut self.angle_histogram,
            &mut self.height_histogram,
        );

        let angle = self
            .angle_histogram
            .compute_percentile(self.angle_percentile)
            .clamp(0.0, FRAC_PI_2);
        let height = self.height_histogram.compute_percentile(self.height_percentile);

        if self.previous == Some((angle, height)) {
            self.strike += 1;
        } else {
            self.strike = 0;
        }

        thresholds.angle = angle;
        thresholds.height = height;
        if self.classification_auto {
            thresholds.classification_tolerance = height;
        }

        debug!(
            angle_deg = angle.to_degrees(),
            height,
            strike = self.strike,
            "thresholds estimated"
        );
        true
    }
}
