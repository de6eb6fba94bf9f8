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

use thiserror::Error;

/// Phase of a ground detection run, used to report where a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Seeding,
    Triangulation,
    Densification,
    Classification,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Seeding => "seeding",
            Phase::Triangulation => "triangulation",
            Phase::Densification => "densification",
            Phase::Classification => "classification",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by the ground detection phases.
#[derive(Debug, Error)]
pub enum GroundDetectionError {
    /// Not enough non-collinear points to build a single triangle.
    #[error("triangulation produced no triangle from {point_count} points")]
    InputDegenerate { point_count: usize },

    /// The progress sink or the accumulator asked to stop.
    #[error("aborted by caller during {phase}")]
    UserAbort { phase: Phase },

    /// Histograms with different range or bucket count cannot be merged.
    #[error(
        "incompatible histograms: [{min_a}, {max_a}]x{buckets_a} vs [{min_b}, {max_b}]x{buckets_b}"
    )]
    MergeIncompatible {
        min_a: f64,
        max_a: f64,
        buckets_a: usize,
        min_b: f64,
        max_b: f64,
        buckets_b: usize,
    },

    /// A configuration value is out of its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The points provider could not deliver the requested range.
    #[error("points provider failed: {0}")]
    PointsProvider(String),

    /// A pooled work item failed; the phase was canceled.
    #[error("worker failed: {0}")]
    WorkerFailed(String),

    #[error("could not start the worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl GroundDetectionError {
    pub fn is_user_abort(&self) -> bool {
        matches!(self, GroundDetectionError::UserAbort { .. })
    }
}

pub type Result<T> = std::result::Result<T, GroundDetectionError>;
