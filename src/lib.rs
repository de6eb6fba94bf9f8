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

//! Bare-earth extraction from LiDAR point clouds by progressive TIN
//! densification.

pub mod accumulator;
pub mod error;
pub mod geometry;
pub mod ground;
pub mod kernel;
pub mod numeric;
pub mod operations;
pub mod params;
pub mod progress;
pub mod provider;

pub use accumulator::{CollectingAccumulator, GroundPointsAccumulator, NullAccumulator, PreviewMesh};
pub use error::{GroundDetectionError, Phase, Result};
pub use ground::{GroundDetectionReport, PcGroundTin, TinState};
pub use params::GroundDetectionParameters;
pub use progress::{NullProgress, ProgressContext, ProgressSink};
pub use provider::{InMemoryPointCloud, PointsProvider, PointsProviderCreator};
