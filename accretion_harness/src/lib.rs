// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles and a drive loop for the accretion reconciler.
//!
//! Real embeddings hand the reconciler a platform host adapter and a
//! platform scheduler. This crate provides deterministic stand-ins:
//!
//! - [`RecordingHost`] — a [`RenderHost`](accretion_core::RenderHost) that
//!   keeps the whole host tree in memory and logs every operation, so tests
//!   can assert both the final shape and the exact mutations taken to get
//!   there.
//! - [`ManualScheduler`] — a priority queue the test steps explicitly, with
//!   controllable yield behavior for exercising time slicing and
//!   preemption.
//! - [`drive`] — runs microtask flushes and scheduled tasks to quiescence,
//!   the way an event loop would between frames.
//!
//! End-to-end behavior tests for the reconciler live in the crate's
//! test-only `properties` module.

#![no_std]

extern crate alloc;

pub mod host;
pub mod sched;

#[cfg(test)]
mod properties;

pub use host::{HostOp, RecordingHost};
pub use sched::ManualScheduler;

use accretion_core::{Reconciler, TaskStatus};

/// Runs pending sync flushes and scheduled tasks until both are exhausted.
///
/// Continuations (interrupted concurrent passes) are re-queued under their
/// original handle and priority, so a forced-yield scheduler must clear its
/// yield flag eventually or this will spin.
pub fn drive(rec: &mut Reconciler, host: &mut RecordingHost, sched: &mut ManualScheduler) {
    loop {
        if host.take_sync_request() {
            rec.flush_sync_work(host, sched);
            continue;
        }
        if let Some(task) = sched.pop_next() {
            let status = rec.perform_task(task.handle, task.token, false, host, sched);
            if status == TaskStatus::Continuation {
                sched.restore(task);
            }
            continue;
        }
        break;
    }
}
