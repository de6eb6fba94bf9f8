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

//! Deferred work of the seeding and densification phases, and the worker
//! pool that drains it.

use std::{
    sync::{Condvar, Mutex},
    thread,
    time::Duration,
};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{trace, warn};

use crate::{
    accumulator::GroundPointsAccumulator,
    error::Result,
    ground::{
        ground_triangle::{GroundTriangle, TinView},
        grid::Grid,
        pending::PendingPointSet,
    },
    params::GroundDetectionParameters,
    progress::ProgressContext,
};

/// Upper bound on pool workers.
pub const MAX_NUMBER_THREAD: usize = 8;

/// Period of the controlling thread's active wait.
pub const PROGRESS_UPDATE_TIME: Duration = Duration::from_millis(2000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    SingleThreaded,
    Pooled { workers: usize },
}

impl ExecutionMode {
    pub fn from_params(params: &GroundDetectionParameters) -> Self {
        if !params.use_multithread {
            return ExecutionMode::SingleThreaded;
        }
        let hardware = thread::available_parallelism().map_or(MAX_NUMBER_THREAD, |n| n.get());
        ExecutionMode::Pooled {
            workers: hardware.min(params.max_threads).max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        match self {
            ExecutionMode::SingleThreaded => 1,
            ExecutionMode::Pooled { workers } => (*workers).max(1),
        }
    }
}

/// One unit of pooled work, addressing its target by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkItem {
    QueryFirstSeedPoint { cell: usize },
    QueryAndDensifyTriangle { triangle: usize },
}

/// What work items read and write.
///
/// Only `pending` and the per-triangle containers are written, each behind
/// its own mutex.
#[derive(Clone, Copy)]
pub struct WorkContext<'a> {
    pub grid: &'a Grid,
    pub triangles: &'a [GroundTriangle],
    pub view: TinView<'a>,
    pub pending: &'a Mutex<PendingPointSet>,
    pub progress: &'a ProgressContext,
    pub accumulator: &'a dyn GroundPointsAccumulator,
    pub expand_tin_to_range: bool,
}

impl WorkItem {
    pub fn execute(&self, ctx: &WorkContext<'_>) -> Result<()> {
        match *self {
            WorkItem::QueryFirstSeedPoint { cell } => {
                if let Some(cell) = ctx.grid.cell(cell) {
                    let seeds = cell.query_seed_points(ctx.expand_tin_to_range)?;
                    ctx.pending
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .extend(seeds);
                }
            }
            WorkItem::QueryAndDensifyTriangle { triangle } => {
                if !ctx.accumulator.should_continue() {
                    return Ok(());
                }
                if let Some(t) = ctx.triangles.get(triangle) {
                    t.prefetch_points()?;
                    let best = t.query_points_to_add(&ctx.view);
                    if !best.is_empty() {
                        let mut pending = ctx.pending.lock().unwrap_or_else(|e| e.into_inner());
                        for p in best.into_iter().take(t.points_to_add()) {
                            pending.insert(p);
                        }
                    }
                }
            }
        }
        ctx.progress.add_work_done(1);
        Ok(())
    }

    /// Bytes currently prefetched by the item's target.
    pub fn memory_size(&self, ctx: &WorkContext<'_>) -> usize {
        match *self {
            WorkItem::QueryFirstSeedPoint { cell } => {
                ctx.grid.cell(cell).map_or(0, |c| c.memory_size())
            }
            WorkItem::QueryAndDensifyTriangle { triangle } => ctx
                .triangles
                .get(triangle)
                .map_or(0, GroundTriangle::memory_size),
        }
    }
}

/// Runs one item, turning a failure into a canceled phase.
fn run_isolated(item: &WorkItem, ctx: &WorkContext<'_>) {
    if let Err(e) = item.execute(ctx) {
        warn!(?item, error = %e, "work item failed");
        ctx.progress.fail(e.to_string());
    }
}

/// Runs `items` on the calling thread. `between` is called after each item
/// and returns `false` to stop early.
pub fn run_sequential(
    items: &[WorkItem],
    ctx: &WorkContext<'_>,
    mut between: impl FnMut() -> bool,
) {
    for item in items {
        if ctx.progress.is_canceled() {
            break;
        }
        run_isolated(item, ctx);
        if !between() {
            break;
        }
    }
}

/// Decrements the outstanding item count when dropped, so a panicking
/// item still releases the controlling thread.
struct Countdown<'a> {
    remaining: &'a Mutex<usize>,
    finished: &'a Condvar,
}

impl Drop for Countdown<'_> {
    fn drop(&mut self) {
        let mut left = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
        *left = left.saturating_sub(1);
        if *left == 0 {
            self.finished.notify_all();
        }
    }
}

/// Fixed-size pool of named rayon workers.
pub struct WorkPool {
    pool: ThreadPool,
}

impl WorkPool {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("groundtin-worker-{i}"))
            .build()?;
        Ok(WorkPool { pool })
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs every item on the workers and returns once all of them finished.
    ///
    /// While waiting, the calling thread runs `active_wait` every
    /// [`PROGRESS_UPDATE_TIME`]. Items not yet started when the phase is
    /// canceled are skipped; items in flight run to completion.
    pub fn run(&self, items: Vec<WorkItem>, ctx: &WorkContext<'_>, mut active_wait: impl FnMut()) {
        if items.is_empty() {
            return;
        }
        let total = items.len();
        let remaining = Mutex::new(total);
        let finished = Condvar::new();
        trace!(workers = self.workers(), total, "work pool started");

        self.pool.in_place_scope(|scope| {
            for item in items {
                let (remaining, finished) = (&remaining, &finished);
                scope.spawn(move |_| {
                    let _done = Countdown {
                        remaining,
                        finished,
                    };
                    if !ctx.progress.is_canceled() {
                        run_isolated(&item, ctx);
                    }
                });
            }

            let mut left = remaining.lock().unwrap_or_else(|e| e.into_inner());
            while *left > 0 {
                let (guard, timeout) = finished
                    .wait_timeout(left, PROGRESS_UPDATE_TIME)
                    .unwrap_or_else(|e| e.into_inner());
                left = guard;
                if timeout.timed_out() && *left > 0 {
                    drop(left);
                    active_wait();
                    left = remaining.lock().unwrap_or_else(|e| e.into_inner());
                }
            }
        });
    }
}

impl std::fmt::Debug for WorkPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkPool")
            .field("workers", &self.workers())
            .finish()
    }
}
