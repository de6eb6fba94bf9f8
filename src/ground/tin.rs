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

//! Densification controller.
//!
//! Seeds a TIN from the lowest point of every grid cell, then repeatedly
//! triangulates, re-estimates the thresholds and lets every coarse face
//! pick its best candidate until the TIN stops growing.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    accumulator::{GroundPointsAccumulator, PreviewMesh},
    error::{GroundDetectionError, Phase, Result},
    geometry::{aabb::Aabb, point::Point3, triangle::Triangle},
    ground::{
        estimator::{AdaptiveThresholds, ParameterEstimator},
        grid::{Grid, MAX_NB_SEEDPOINTS_TO_ADD},
        ground_triangle::{GroundTriangle, TinView, is_densification_required},
        pending::PendingPointSet,
        work::{ExecutionMode, WorkContext, WorkItem, WorkPool, run_sequential},
    },
    operations::triangulation::{DelaunayTin, TriangulationProvider},
    params::GroundDetectionParameters,
    progress::{NullProgress, ProgressContext, ProgressSink},
    provider::PointsProviderCreator,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TinState {
    Created,
    /// Seed points are known but no face was built from them yet.
    Seeded,
    Triangulated,
    Densifying,
    Converged,
    Aborted,
}

/// Outcome of [`PcGroundTin::run`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroundDetectionReport {
    pub iterations: usize,
    pub triangle_count: usize,
    pub point_count: usize,
    pub thresholds: AdaptiveThresholds,
    pub state: TinState,
}

/// Ground TIN of one point cloud.
pub struct PcGroundTin {
    params: GroundDetectionParameters,
    creator: Arc<dyn PointsProviderCreator>,
    accumulator: Arc<dyn GroundPointsAccumulator>,
    sink: Box<dyn ProgressSink>,
    progress: ProgressContext,
    mode: ExecutionMode,
    pool: Option<WorkPool>,
    grid: Grid,
    tin: Box<dyn TriangulationProvider>,
    pending: Mutex<PendingPointSet>,
    triangles_to_process: Vec<GroundTriangle>,
    estimator: ParameterEstimator,
    thresholds: AdaptiveThresholds,
    is_first_iteration: bool,
    should_stop: bool,
    iterations: usize,
    last_preview: Option<Instant>,
    state: TinState,
}

impl PcGroundTin {
    /// Validates `params` and lays the seed grid over the creator's cloud.
    pub fn new(
        params: GroundDetectionParameters,
        creator: Arc<dyn PointsProviderCreator>,
        accumulator: Arc<dyn GroundPointsAccumulator>,
    ) -> Result<Self> {
        params.validate()?;
        let grid = Grid::build(creator.as_ref(), &params)?;
        let estimator = ParameterEstimator::new(grid.bounding_box().extent(2), &params);
        let thresholds = AdaptiveThresholds::from_params(&params);
        let mode = ExecutionMode::from_params(&params);
        Ok(PcGroundTin {
            creator,
            accumulator,
            sink: Box::new(NullProgress),
            progress: ProgressContext::new(),
            mode,
            pool: None,
            grid,
            tin: Box::new(DelaunayTin::new()),
            pending: Mutex::new(PendingPointSet::new()),
            triangles_to_process: Vec::new(),
            estimator,
            thresholds,
            is_first_iteration: true,
            should_stop: false,
            iterations: 0,
            last_preview: None,
            state: TinState::Created,
            params,
        })
    }

    pub fn with_progress_sink(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the TIN builder; any existing TIN content is dropped.
    pub fn with_triangulation(mut self, tin: Box<dyn TriangulationProvider>) -> Self {
        self.tin = tin;
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self.pool = None;
        self
    }

    #[inline]
    pub fn params(&self) -> &GroundDetectionParameters {
        &self.params
    }

    #[inline]
    pub fn thresholds(&self) -> AdaptiveThresholds {
        self.thresholds
    }

    /// Parameters with the estimated thresholds written back.
    pub fn current_parameters(&self) -> GroundDetectionParameters {
        GroundDetectionParameters {
            angle_threshold_deg: self.thresholds.angle.to_degrees(),
            height_threshold: self.thresholds.height,
            classification_tolerance: self.thresholds.classification_tolerance,
            ..self.params.clone()
        }
    }

    #[inline]
    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    #[inline]
    pub fn state(&self) -> TinState {
        self.state
    }

    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn tin(&self) -> &dyn TriangulationProvider {
        self.tin.as_ref()
    }

    /// Survey range in meters.
    #[inline]
    pub fn bounding_box(&self) -> &Aabb {
        self.grid.bounding_box()
    }

    pub fn triangle_count(&self) -> usize {
        self.tin.triangle_count()
    }

    pub fn point_count(&self) -> usize {
        self.tin.point_count()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[inline]
    pub fn triangles_to_process(&self) -> &[GroundTriangle] {
        &self.triangles_to_process
    }

    pub fn memory_size(&self) -> usize {
        self.grid.memory_size()
            + self
                .triangles_to_process
                .iter()
                .map(GroundTriangle::memory_size)
                .sum::<usize>()
            + self.tin.memory_size()
    }

    /// Queues a ground point, in meters, for the next triangulation.
    pub fn add_point(&self, p: Point3) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(p)
    }

    /// Makes the next `prepare_next_iteration` report no more work.
    pub fn stop_iteration(&mut self) {
        self.should_stop = true;
    }

    /// Seeds the TIN from the grid and triangulates it.
    pub fn create_initial_tin(&mut self) -> Result<()> {
        const LABEL: &str = "Find Initial Seed Points";
        info!(
            rows = self.grid.rows(),
            cols = self.grid.cols(),
            mode = ?self.mode,
            "creating initial TIN"
        );
        self.sink.start_phase(Phase::Seeding, &format!("START - {LABEL}"));
        if !self.sink.check_continue() {
            return self.abort(Phase::Seeding, LABEL);
        }

        let items: Vec<WorkItem> = (0..self.grid.len())
            .map(|cell| WorkItem::QueryFirstSeedPoint { cell })
            .collect();
        if let Err(e) = self.run_items(items, Phase::Seeding) {
            return self.fail(LABEL, e);
        }
        self.state = TinState::Seeded;

        let triangles = self.compute_triangulation();
        if triangles == 0 {
            let point_count = self.tin.point_count();
            return self.fail(LABEL, GroundDetectionError::InputDegenerate { point_count });
        }
        if !self.params.densify_tin {
            self.compute_parameters_from_tin_points();
        }
        self.sink.end_phase(&format!("END - {LABEL}"));

        if !self.params.additional_seed_points.is_empty() {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.extend(self.params.additional_seed_points.iter().copied());
        }

        self.state = TinState::Triangulated;
        info!(
            triangles,
            points = self.tin.point_count(),
            "initial TIN created"
        );
        Ok(())
    }

    /// Grows the TIN until it stops changing, the caller stops it or the
    /// optional iteration cap is hit.
    pub fn densify_tin(&mut self) -> Result<()> {
        const LABEL: &str = "Densification of TIN";
        self.sink
            .start_phase(Phase::Densification, &format!("START - {LABEL}"));
        if !self.sink.check_continue() {
            return self.abort(Phase::Densification, LABEL);
        }

        self.state = TinState::Densifying;
        self.prepare_first_iteration();
        loop {
            if !self.accumulator.should_continue() {
                info!(iterations = self.iterations, "accumulator stopped densification");
                self.compute_triangulation();
                break;
            }
            if self
                .params
                .max_iterations
                .is_some_and(|max| self.iterations >= max)
            {
                info!(iterations = self.iterations, "iteration cap reached");
                self.compute_triangulation();
                break;
            }
            match self.prepare_next_iteration() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => return self.fail(LABEL, e),
            }
            self.iterations += 1;

            self.output_preview(true);
            if !self.sink.check_continue() {
                self.stop_iteration();
                return self.abort(Phase::Densification, LABEL);
            }

            let items: Vec<WorkItem> = (0..self.triangles_to_process.len())
                .map(|triangle| WorkItem::QueryAndDensifyTriangle { triangle })
                .collect();
            self.sink.start_iteration(self.iterations);
            if let Err(e) = self.run_items(items, Phase::Densification) {
                self.stop_iteration();
                return self.fail(LABEL, e);
            }
            self.sink.end_iteration(self.iterations);

            debug!(
                iteration = self.iterations,
                triangles = self.triangles_to_process.len(),
                pending = self.pending_count(),
                "densification pass done"
            );
            self.triangles_to_process.clear();
        }

        self.triangles_to_process.clear();
        self.sink.end_phase(&format!("END - {LABEL}"));
        self.state = TinState::Converged;
        info!(
            iterations = self.iterations,
            triangles = self.tin.triangle_count(),
            points = self.tin.point_count(),
            "densification finished"
        );
        Ok(())
    }

    /// Initial TIN then densification when enabled.
    pub fn run(&mut self) -> Result<GroundDetectionReport> {
        self.create_initial_tin()?;
        if self.params.densify_tin {
            self.densify_tin()?;
        }
        Ok(self.report())
    }

    pub fn report(&self) -> GroundDetectionReport {
        GroundDetectionReport {
            iterations: self.iterations,
            triangle_count: self.tin.triangle_count(),
            point_count: self.tin.point_count(),
            thresholds: self.thresholds,
            state: self.state,
        }
    }

    pub fn prepare_first_iteration(&mut self) {
        self.estimator.reset();
        self.should_stop = false;
        self.is_first_iteration = true;
        self.iterations = 0;
    }

    /// Commits the pending points and schedules the faces they touched.
    ///
    /// `Ok(false)` once the TIN stopped growing; an error when the
    /// triangulation has no face.
    pub fn prepare_next_iteration(&mut self) -> Result<bool> {
        if self.should_stop {
            return Ok(false);
        }
        let previous = self.tin.triangle_count();
        let triangles = self.compute_triangulation();
        if triangles == 0 {
            return Err(GroundDetectionError::InputDegenerate {
                point_count: self.tin.point_count(),
            });
        }

        let no_pending = self
            .pending
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty();
        if !self.is_first_iteration && (triangles == previous || no_pending) {
            debug!(triangles, "TIN stable");
            return Ok(false);
        }
        self.is_first_iteration = false;

        self.compute_parameters_from_tin_points();
        self.compute_triangles_to_process_from_pending();
        Ok(!self.triangles_to_process.is_empty())
    }

    /// Inserts every pending point into the TIN and triangulates. The
    /// pending set is kept; newly inserted points go to the accumulator in
    /// project units.
    pub fn compute_triangulation(&mut self) -> usize {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        let inserted: Vec<Point3> = pending
            .iter()
            .copied()
            .filter(|p| self.tin.add_point(*p))
            .collect();
        if !inserted.is_empty() {
            let to_project = &self.params.meters_to_project_units;
            self.accumulator.add_points(&to_project.apply_all(&inserted));
        }
        if self.tin.point_count() < 3 {
            return 0;
        }
        self.tin.triangulate()
    }

    pub fn compute_parameters_from_tin_points(&mut self) {
        self.estimator
            .recompute(self.tin.as_ref(), &mut self.thresholds);
    }

    fn make_ground_triangle(&self, triangle: Triangle) -> GroundTriangle {
        GroundTriangle::new(
            triangle,
            self.thresholds.height,
            self.grid.bounding_box(),
            self.creator.as_ref(),
            &self.params.meters_to_project_units,
            self.params.use_multithread,
            MAX_NB_SEEDPOINTS_TO_ADD,
        )
    }

    /// Schedules the coarse faces touching a pending point, then clears the
    /// pending set.
    pub fn compute_triangles_to_process_from_pending(&mut self) {
        let keys = {
            let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
            if pending.is_empty() {
                return;
            }
            pending.keys()
        };

        let edge_threshold = self.params.effective_edge_threshold();
        let scheduled: Vec<GroundTriangle> = self
            .tin
            .faces()
            .into_iter()
            .filter(|f| f.iter().any(|p| keys.contains(&p.key())))
            .map(Triangle::from_array)
            .filter(|t| is_densification_required(t, edge_threshold))
            .map(|t| self.make_ground_triangle(t))
            .collect();
        self.triangles_to_process = scheduled;

        self.pending
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Triangulates and schedules every coarse face of the TIN.
    pub fn compute_triangles_to_process(&mut self) {
        self.compute_triangulation();
        let edge_threshold = self.params.effective_edge_threshold();
        let scheduled: Vec<GroundTriangle> = self
            .tin
            .faces()
            .into_iter()
            .map(Triangle::from_array)
            .filter(|t| is_densification_required(t, edge_threshold))
            .map(|t| self.make_ground_triangle(t))
            .collect();
        self.triangles_to_process = scheduled;
    }

    /// Drops the TIN and rebuilds it from `points`, in meters. Returns the
    /// triangle count.
    pub fn set_new_seed_points(&mut self, points: &[Point3]) -> usize {
        self.tin.clear();
        self.triangles_to_process.clear();
        {
            let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
            pending.clear();
            pending.extend(points.iter().copied());
        }
        let triangles = self.compute_triangulation();
        self.state = if triangles > 0 {
            TinState::Triangulated
        } else if points.is_empty() {
            TinState::Created
        } else {
            TinState::Seeded
        };
        triangles
    }

    /// Every TIN point, in meters.
    pub fn dtm_points(&mut self) -> Vec<Point3> {
        if self.tin.point_count() == 0 {
            self.compute_triangles_to_process();
        }
        self.tin.all_points()
    }

    /// `true` when `p`, in meters, lies within the classification tolerance
    /// of the TIN.
    pub fn classify_point(&self, p: &Point3) -> bool {
        self.tin
            .find_nearest_triangle(p)
            .is_some_and(|n| n.distance <= self.thresholds.classification_tolerance)
    }

    pub fn classify_points(&self, points: &[Point3]) -> Vec<bool> {
        points.iter().map(|p| self.classify_point(p)).collect()
    }

    /// [`classify_points`](Self::classify_points) for points in project
    /// units.
    pub fn classify_project_points(&self, points: &[Point3]) -> Vec<bool> {
        let to_meters = self.params.project_to_meters();
        points
            .iter()
            .map(|p| self.classify_point(&to_meters.apply(p)))
            .collect()
    }

    /// Sends a preview of the TIN with the pending points. Unless
    /// `no_delay`, at most one preview per configured delay is sent.
    pub fn output_preview(&mut self, no_delay: bool) {
        emit_preview(
            &self.params,
            self.accumulator.as_ref(),
            self.tin.as_ref(),
            &self.pending,
            &mut self.last_preview,
            no_delay,
        );
    }

    fn abort(&mut self, phase: Phase, label: &str) -> Result<()> {
        warn!(%phase, "ground detection aborted");
        self.sink.end_phase(&format!("ABORT - {label}"));
        self.state = TinState::Aborted;
        Err(GroundDetectionError::UserAbort { phase })
    }

    fn fail(&mut self, label: &str, error: GroundDetectionError) -> Result<()> {
        warn!(error = %error, "ground detection phase failed");
        self.sink.end_phase(&format!("ABORT - {label}"));
        self.state = TinState::Aborted;
        Err(error)
    }

    /// Runs `items` in the configured mode, polling the sink between items
    /// (single thread) or every progress period (pool).
    fn run_items(&mut self, items: Vec<WorkItem>, phase: Phase) -> Result<()> {
        self.progress.reset(items.len() as u64);
        if let ExecutionMode::Pooled { workers } = self.mode {
            if self.pool.is_none() {
                self.pool = Some(WorkPool::new(workers)?);
            }
        }
        let densifying = phase == Phase::Densification;

        let PcGroundTin {
            params,
            accumulator,
            sink,
            progress,
            pool,
            grid,
            tin,
            pending,
            triangles_to_process,
            thresholds,
            last_preview,
            ..
        } = self;
        let tin: &dyn TriangulationProvider = &**tin;
        let accumulator: &dyn GroundPointsAccumulator = &**accumulator;
        let params: &GroundDetectionParameters = params;
        let grid: &Grid = grid;
        let pending: &Mutex<PendingPointSet> = pending;
        let progress: &ProgressContext = progress;
        let ctx = WorkContext {
            grid,
            triangles: triangles_to_process.as_slice(),
            view: TinView {
                thresholds: *thresholds,
                tin,
                tin_range: *grid.bounding_box(),
            },
            pending,
            progress,
            accumulator,
            expand_tin_to_range: params.expand_tin_to_range,
        };

        match pool.as_ref() {
            None => run_sequential(&items, &ctx, || {
                sink.set_work_fraction(progress.fraction());
                if !sink.check_continue() {
                    progress.cancel();
                    return false;
                }
                if densifying {
                    if !accumulator.should_continue() {
                        return false;
                    }
                    emit_preview(params, accumulator, tin, pending, last_preview, false);
                }
                true
            }),
            Some(pool) => {
                pool.run(items, &ctx, || {
                    sink.set_work_fraction(progress.fraction());
                    if !sink.check_continue() {
                        progress.cancel();
                    }
                    if densifying {
                        emit_preview(params, accumulator, tin, pending, last_preview, false);
                    }
                });
                // phases shorter than the progress period never reach the active wait
                if !progress.is_canceled() && !sink.check_continue() {
                    progress.cancel();
                }
            }
        }
        sink.set_work_fraction(progress.fraction());

        if let Some(message) = progress.take_failure() {
            return Err(GroundDetectionError::WorkerFailed(message));
        }
        if progress.is_canceled() {
            return Err(GroundDetectionError::UserAbort { phase });
        }
        Ok(())
    }
}

fn emit_preview(
    params: &GroundDetectionParameters,
    accumulator: &dyn GroundPointsAccumulator,
    tin: &dyn TriangulationProvider,
    pending: &Mutex<PendingPointSet>,
    last_preview: &mut Option<Instant>,
    no_delay: bool,
) {
    if !params.output_preview {
        return;
    }
    let delay = Duration::from_millis(params.preview_delay_ms);
    if !no_delay && last_preview.is_some_and(|t| t.elapsed() < delay) {
        return;
    }

    let mut snapshot = tin.snapshot();
    let points = pending.lock().unwrap_or_else(|e| e.into_inner()).to_vec();
    for p in points {
        snapshot.add_point(p);
    }
    snapshot.triangulate();

    let transform = accumulator.preview_transform();
    let mesh = PreviewMesh {
        points: transform.apply_all(&snapshot.all_points()),
        triangles: snapshot
            .faces()
            .into_iter()
            .map(|f| f.map(|p| transform.apply(&p)))
            .collect(),
    };
    accumulator.output_preview(&mesh);
    *last_preview = Some(Instant::now());
}
