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

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::error::Phase;

/// Caller-side progress reporting and cancellation.
///
/// Only the controlling thread talks to the sink. Every method has a no-op
/// default.
pub trait ProgressSink: Send {
    fn start_phase(&mut self, _phase: Phase, _label: &str) {}

    fn end_phase(&mut self, _label: &str) {}

    /// Densification pass `iteration` (1-based) is about to query its faces.
    fn start_iteration(&mut self, _iteration: usize) {}

    /// Densification pass `iteration` finished without being canceled.
    fn end_iteration(&mut self, _iteration: usize) {}

    /// Polled between work units; `false` aborts the current phase.
    fn check_continue(&mut self) -> bool {
        true
    }

    fn set_work_fraction(&mut self, _fraction: f64) {}
}

/// Sink that never cancels and reports nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// Work counters and the cancellation flag of one phase.
///
/// Owned by a single controller and shared by reference with its workers.
#[derive(Debug, Default)]
pub struct ProgressContext {
    work_total: AtomicU64,
    work_done: AtomicU64,
    canceled: AtomicBool,
    failure: Mutex<Option<String>>,
}

impl ProgressContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the counters and flags for a new phase of `total` units.
    pub fn reset(&self, total: u64) {
        self.work_total.store(total, Ordering::Relaxed);
        self.work_done.store(0, Ordering::Relaxed);
        self.canceled.store(false, Ordering::Release);
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    #[inline]
    pub fn add_work_done(&self, n: u64) {
        self.work_done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn work_done(&self) -> u64 {
        self.work_done.load(Ordering::Relaxed)
    }

    pub fn work_total(&self) -> u64 {
        self.work_total.load(Ordering::Relaxed)
    }

    /// Done fraction in `[0, 1]`; a phase with no work reports 1.
    pub fn fraction(&self) -> f64 {
        let total = self.work_total();
        if total == 0 {
            return 1.0;
        }
        (self.work_done() as f64 / total as f64).min(1.0)
    }

    #[inline]
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Records the first failure and cancels the phase.
    pub fn fail(&self, message: String) {
        let mut slot = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(message);
        }
        drop(slot);
        self.cancel();
    }

    pub fn take_failure(&self) -> Option<String> {
        self.failure.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_wins() {
        let ctx = ProgressContext::new();
        ctx.reset(4);
        ctx.add_work_done(1);
        assert_eq!(ctx.fraction(), 0.25);
        ctx.fail("a".into());
        ctx.fail("b".into());
        assert!(ctx.is_canceled());
        assert_eq!(ctx.take_failure().as_deref(), Some("a"));
        ctx.reset(0);
        assert!(!ctx.is_canceled());
        assert_eq!(ctx.fraction(), 1.0);
    }
}
