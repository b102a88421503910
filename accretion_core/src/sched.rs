// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduling contract for host integrations.
//!
//! Accretion does not own an event loop. A cooperative task scheduler is
//! consumed as an opaque service through the [`TaskScheduler`] trait: the
//! reconciler asks for callbacks at a [`TaskPriority`], cancels them when the
//! pending-lane picture changes, and polls [`should_yield`] between work-loop
//! steps in time-sliced mode.
//!
//! The embedder owns the drive loop: when the scheduler decides a task is
//! ready it hands the recorded [`TaskToken`] back to
//! [`Reconciler::perform_task`](crate::work_loop::Reconciler::perform_task).
//! Synchronous-lane work bypasses this path entirely and is flushed through
//! the host's microtask primitive (see
//! [`RenderHost::request_sync_flush`](crate::host::RenderHost::request_sync_flush)).
//!
//! [`should_yield`]: TaskScheduler::should_yield

use crate::root::RootId;

/// Priority levels of the external scheduler, highest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    /// Must run before control returns to the host event loop.
    Immediate,
    /// Discrete user input (clicks, key presses).
    UserBlocking,
    /// Default priority for ordinary updates.
    Normal,
    /// Deprioritized work (transitions).
    Low,
    /// Runs only when nothing else is pending.
    Idle,
}

/// Identifier of a scheduled callback, issued by the scheduler.
///
/// Handles are compared to detect whether a root's scheduled work was
/// superseded while a pass ran; the scheduler must not reuse a handle while
/// it can still be observed by the reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub u64);

/// What a scheduled callback should do when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskToken {
    /// Run the work loop for the given root.
    RenderRoot(RootId),
    /// Flush the given root's pending passive effects.
    FlushPassive(RootId),
}

/// External cooperative scheduler consumed by the reconciler.
pub trait TaskScheduler {
    /// Schedules `token` to be delivered at `priority`. Returns a handle the
    /// reconciler may later [`cancel`](Self::cancel).
    fn schedule(&mut self, priority: TaskPriority, token: TaskToken) -> TaskHandle;

    /// Cancels a previously scheduled callback. Cancelling a handle that
    /// already fired is a no-op.
    fn cancel(&mut self, handle: TaskHandle);

    /// Returns whether the time-sliced work loop should give control back.
    fn should_yield(&self) -> bool;

    /// The ambient priority of the code currently running (event handlers
    /// inherit their dispatch priority from here).
    fn current_priority(&self) -> TaskPriority;

    /// Replaces the ambient priority, returning the previous value so the
    /// caller can restore it.
    fn set_current_priority(&mut self, priority: TaskPriority) -> TaskPriority;

    /// The handle of the next callback the scheduler would deliver, if any.
    fn first_pending_task(&self) -> Option<TaskHandle>;

    /// Runs `f` with the ambient priority set to `priority`, restoring the
    /// previous priority afterwards.
    fn run_at<R>(&mut self, priority: TaskPriority, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        let previous = self.set_current_priority(priority);
        let result = f(self);
        self.set_current_priority(previous);
        result
    }
}
