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

//! Ground detection parameters.
//!
//! Distances are in meters. Point coordinates handed to and received from
//! the points providers and the accumulator are in project units, related to
//! meters by `meters_to_project_units`.

use serde::{Deserialize, Serialize};

use crate::{
    error::{GroundDetectionError, Result},
    geometry::{point::Point3, transform::Transform},
};

/// Options of one ground detection run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundDetectionParameters {
    /// Size of the largest above-ground structure (building, canopy) in
    /// meters. Drives the seed grid cell size so every cell can hold a
    /// ground point.
    pub largest_structure_size: f64,
    /// Expected ground point spacing in meters. Used as the triangle edge
    /// threshold when `triangle_edge_threshold` is not positive.
    pub density: f64,
    /// Initial height threshold in meters; re-estimated every iteration.
    pub height_threshold: f64,
    /// Initial angle threshold in degrees; re-estimated every iteration.
    pub angle_threshold_deg: f64,
    /// Percentile (0-100) of TIN dihedral angles used as the angle threshold.
    pub angle_percentile_factor: f64,
    /// Percentile (0-100) of TIN height deltas used as the height threshold.
    pub height_percentile_factor: f64,
    /// Triangles with two edges shorter than this are not densified.
    pub triangle_edge_threshold: f64,
    pub use_multithread: bool,
    /// Upper bound on worker threads.
    pub max_threads: usize,
    /// Mirror border seeds onto the grid's outer edges so the TIN spans the
    /// whole survey area.
    pub expand_tin_to_range: bool,
    /// Distance to the TIN under which a point classifies as ground.
    pub classification_tolerance: f64,
    /// Track the height threshold as classification tolerance.
    pub classification_tolerance_auto: bool,
    pub densify_tin: bool,
    /// Extra seed points, in meters, added after the grid seeds.
    pub additional_seed_points: Vec<Point3>,
    pub meters_to_project_units: Transform,
    /// Optional hard cap on densification iterations.
    pub max_iterations: Option<usize>,
    pub output_preview: bool,
    /// Minimum delay between two rate-limited previews.
    pub preview_delay_ms: u64,
}

impl Default for GroundDetectionParameters {
    fn default() -> Self {
        Self {
            largest_structure_size: 50.0,
            density: 0.0,
            height_threshold: 0.5,
            angle_threshold_deg: 10.0,
            angle_percentile_factor: 80.0,
            height_percentile_factor: 80.0,
            triangle_edge_threshold: 0.5,
            use_multithread: true,
            max_threads: 8,
            expand_tin_to_range: true,
            classification_tolerance: 0.05,
            classification_tolerance_auto: false,
            densify_tin: true,
            additional_seed_points: Vec::new(),
            meters_to_project_units: Transform::identity(),
            max_iterations: None,
            output_preview: false,
            preview_delay_ms: 10_000,
        }
    }
}

impl GroundDetectionParameters {
    /// Parses JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let params: GroundDetectionParameters = serde_json::from_str(s)
            .map_err(|e| GroundDetectionError::InvalidParameter(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GroundDetectionError::InvalidParameter(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(GroundDetectionError::InvalidParameter(format!(
                    "{name} must be positive, got {v}"
                )))
            }
        }
        fn non_negative(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(GroundDetectionError::InvalidParameter(format!(
                    "{name} must be zero or positive, got {v}"
                )))
            }
        }
        fn percentile(name: &str, v: f64) -> Result<()> {
            if (0.0..=100.0).contains(&v) {
                Ok(())
            } else {
                Err(GroundDetectionError::InvalidParameter(format!(
                    "{name} must lie in [0, 100], got {v}"
                )))
            }
        }

        positive("largest_structure_size", self.largest_structure_size)?;
        non_negative("density", self.density)?;
        non_negative("height_threshold", self.height_threshold)?;
        non_negative("triangle_edge_threshold", self.triangle_edge_threshold)?;
        non_negative("classification_tolerance", self.classification_tolerance)?;
        percentile("angle_percentile_factor", self.angle_percentile_factor)?;
        percentile("height_percentile_factor", self.height_percentile_factor)?;
        if !(0.0..=90.0).contains(&self.angle_threshold_deg) {
            return Err(GroundDetectionError::InvalidParameter(format!(
                "angle_threshold_deg must lie in [0, 90], got {}",
                self.angle_threshold_deg
            )));
        }
        if self.max_threads == 0 {
            return Err(GroundDetectionError::InvalidParameter(
                "max_threads must be at least 1".into(),
            ));
        }
        if self.max_iterations == Some(0) {
            return Err(GroundDetectionError::InvalidParameter(
                "max_iterations must be at least 1 when set".into(),
            ));
        }
        if self.meters_to_project_units.inverse().is_none() {
            return Err(GroundDetectionError::InvalidParameter(
                "meters_to_project_units is not invertible".into(),
            ));
        }
        if self
            .additional_seed_points
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(GroundDetectionError::InvalidParameter(
                "additional_seed_points must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Edge length under which a triangle side counts as short.
    pub fn effective_edge_threshold(&self) -> f64 {
        if self.triangle_edge_threshold > 0.0 {
            self.triangle_edge_threshold
        } else {
            self.density.max(0.0)
        }
    }

    #[inline]
    pub fn angle_threshold_rad(&self) -> f64 {
        self.angle_threshold_deg.to_radians()
    }

    /// Project-to-meters transform. Falls back to identity when the
    /// parameters were not validated.
    pub fn project_to_meters(&self) -> Transform {
        self.meters_to_project_units.inverse().unwrap_or_default()
    }
}
