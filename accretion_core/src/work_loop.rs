// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interruptible work loop and root scheduling.
//!
//! A [`Reconciler`] owns the node arena, every root container, and the state
//! of the single in-flight render pass: the cursor node, the render lane,
//! and the root being rendered. The pass state machine is
//!
//! ```text
//!   Idle ──prepare──► InProgress ──yield──► Interrupted
//!                        │    ▲                 │
//!                        │    └────resume───────┘
//!                        ▼
//!                    Completed ──commit──► Idle
//! ```
//!
//! One step performs `begin` on the cursor and either descends into the
//! returned child or walks upward through `complete`, following siblings.
//! The synchronous loop never checks for yielding; the concurrent loop asks
//! the external scheduler between steps and returns with the cursor intact
//! when told to stop, to be resumed by a continuation callback.
//!
//! Starting a pass for a different root or lane than the in-flight one
//! resets the work-in-progress stack: partial work is never reused across
//! lanes, which is what lets a higher-priority update preempt and discard a
//! lower-priority partial tree.
//!
//! A reconcile error surfacing from `begin` abandons the pass: the cursor
//! is discarded, the event is traced, and the failed lane is dropped from
//! the root (give up; no retry).

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use crate::begin::begin_work;
use crate::complete::complete_work;
use crate::diff::ReconcileError;
use crate::hooks::{DispatchInbox, HooksEnv};
use crate::host::RenderHost;
use crate::lane::{Lane, Lanes, NO_LANE, SYNC_LANE};
use crate::node::{INVALID, NodeArena};
use crate::root::{RootContainer, RootId};
use crate::sched::{TaskHandle, TaskScheduler, TaskToken};
use crate::trace::{PassEvent, PassMode, ScheduleEvent, TraceSink, Tracer};

/// Observable state of the in-flight render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    /// No pass in flight.
    Idle,
    /// A pass is between steps on the current call stack.
    InProgress,
    /// A time-sliced pass ran out of budget; the cursor is retained.
    Interrupted,
    /// A pass produced a finished tree awaiting commit.
    Completed,
}

/// What the embedder should do with a delivered task after
/// [`Reconciler::perform_task`] returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task is done (or was superseded); drop it.
    Finished,
    /// Work remains: deliver the same task again in the next time slice.
    Continuation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PassOutcome {
    Incomplete,
    Completed,
    Errored,
}

/// The reconciliation engine: arena, roots, and the work-loop state machine.
pub struct Reconciler {
    pub(crate) arena: NodeArena,
    pub(crate) roots: Vec<RootContainer>,
    /// Current work node of the in-flight pass, or [`INVALID`].
    cursor: u32,
    /// Lane of the in-flight pass.
    render_lane: Lane,
    /// Root index of the in-flight pass, or [`INVALID`].
    in_flight_root: u32,
    pass_state: PassState,
    /// Roots with synchronous work queued for the microtask flush.
    sync_queue: Vec<u32>,
    flushing_sync: bool,
    inbox: DispatchInbox,
    transition: Rc<Cell<bool>>,
    pub(crate) trace: Tracer,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("roots", &self.roots.len())
            .field("live_nodes", &self.arena.live_count())
            .field("pass_state", &self.pass_state)
            .field("render_lane", &self.render_lane)
            .finish_non_exhaustive()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    /// Creates an empty reconciler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: NodeArena::new(),
            roots: Vec::new(),
            cursor: INVALID,
            render_lane: NO_LANE,
            in_flight_root: INVALID,
            pass_state: PassState::Idle,
            sync_queue: Vec::new(),
            flushing_sync: false,
            inbox: DispatchInbox::new(),
            transition: Rc::new(Cell::new(false)),
            trace: Tracer::none(),
        }
    }

    /// Creates a reconciler that reports diagnostics to `sink`.
    #[must_use]
    pub fn with_tracer(sink: Box<dyn TraceSink>) -> Self {
        let mut this = Self::new();
        this.trace = Tracer::new(sink);
        this
    }

    /// State of the in-flight pass.
    #[must_use]
    pub fn pass_state(&self) -> PassState {
        self.pass_state
    }

    pub(crate) fn set_pass_state(&mut self, state: PassState) {
        self.pass_state = state;
    }

    /// Read-only view of the node arena (diagnostics).
    #[must_use]
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    // -- scheduling -----------------------------------------------------

    /// Records `lane` as pending on `root` and (re)schedules it.
    pub(crate) fn schedule_update_on_root(
        &mut self,
        root: u32,
        lane: Lane,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) {
        self.trace.update_scheduled(ScheduleEvent { root, lane });
        let container = &mut self.roots[root as usize];
        container.pending_lanes = container.pending_lanes.merge(lane);
        self.ensure_root_scheduled(root, host, sched);
    }

    /// Drains dispatch notices recorded by [`Updater`](crate::hooks::Updater)
    /// handles and schedules the affected roots.
    ///
    /// Embedders call this after running user code (event handlers) that may
    /// have dispatched state updates, then service any requested sync flush.
    pub fn flush_dispatched(
        &mut self,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) {
        for (root, lane) in self.inbox.drain() {
            self.schedule_update_on_root(root, lane, host, sched);
        }
    }

    /// Keeps `root`'s scheduled callback in line with its highest-priority
    /// pending lane: cancel when idle or when the priority changed, hand
    /// synchronous work to the microtask queue, everything else to the
    /// external scheduler.
    pub(crate) fn ensure_root_scheduled(
        &mut self,
        root: u32,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) {
        let lane = self.roots[root as usize].pending_lanes.highest_priority();
        let existing = self.roots[root as usize].task;

        if lane.is_none() {
            if let Some(handle) = existing {
                sched.cancel(handle);
            }
            let container = &mut self.roots[root as usize];
            container.task = None;
            container.task_lane = NO_LANE;
            return;
        }

        // Same priority as the outstanding callback: leave it in place so an
        // interrupted pass can continue through its continuation.
        if lane == self.roots[root as usize].task_lane {
            return;
        }

        if let Some(handle) = existing {
            sched.cancel(handle);
        }

        let task = if lane == SYNC_LANE {
            self.sync_queue.push(root);
            host.request_sync_flush();
            None
        } else {
            let priority = Lanes::from_lane(lane).to_priority();
            Some(sched.schedule(priority, TaskToken::RenderRoot(RootId(root))))
        };
        let container = &mut self.roots[root as usize];
        container.task = task;
        container.task_lane = lane;
    }

    /// Flushes all queued synchronous-lane work. Called by the embedder in
    /// response to [`RenderHost::request_sync_flush`]; reentrant calls are
    /// no-ops.
    pub fn flush_sync_work(
        &mut self,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) {
        if self.flushing_sync {
            return;
        }
        self.flushing_sync = true;
        loop {
            let batch = core::mem::take(&mut self.sync_queue);
            if batch.is_empty() {
                break;
            }
            for root in batch {
                self.perform_sync_on_root(root, host, sched);
            }
        }
        self.flushing_sync = false;
    }

    /// Runs a scheduler-delivered task.
    ///
    /// `handle` must be the handle the scheduler issued for this task, and
    /// `did_timeout` whether the scheduler considers the task overdue
    /// (overdue tasks render without yield checks).
    pub fn perform_task(
        &mut self,
        handle: TaskHandle,
        token: TaskToken,
        did_timeout: bool,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) -> TaskStatus {
        match token {
            TaskToken::RenderRoot(root) => {
                self.perform_concurrent_on_root(root.0, handle, did_timeout, host, sched)
            }
            TaskToken::FlushPassive(root) => {
                self.flush_passive_for(root.0, host, sched);
                TaskStatus::Finished
            }
        }
    }

    /// Flushes `root`'s pending passive effects, then any synchronous work
    /// they produced. Returns whether anything ran.
    pub fn flush_passive_effects(
        &mut self,
        root: RootId,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) -> bool {
        self.flush_passive_for(root.0, host, sched)
    }

    // -- work-loop entry points -----------------------------------------

    fn perform_sync_on_root(
        &mut self,
        root: u32,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) {
        let lane = self.roots[root as usize].pending_lanes.highest_priority();
        if lane != SYNC_LANE {
            // Stale entry; put scheduling back in shape and bail.
            self.ensure_root_scheduled(root, host, sched);
            return;
        }

        match self.render_root(root, SYNC_LANE, false, host, sched) {
            PassOutcome::Completed => {
                self.finish_pass(root, SYNC_LANE);
                self.commit_root(root, host, sched);
            }
            PassOutcome::Errored => {
                self.drop_failed_lane(root, SYNC_LANE, host, sched);
            }
            PassOutcome::Incomplete => {
                unreachable!("synchronous pass cannot be interrupted");
            }
        }
    }

    fn perform_concurrent_on_root(
        &mut self,
        root: u32,
        handle: TaskHandle,
        did_timeout: bool,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) -> TaskStatus {
        // Make sure passive effects of earlier commits ran; the updates they
        // dispatch may reshape what this root should work on.
        let task_before = self.roots[root as usize].task;
        if self.flush_passive_for(root, host, sched)
            && self.roots[root as usize].task != task_before
        {
            // Higher-priority work got scheduled; this callback is obsolete.
            return TaskStatus::Finished;
        }

        let lane = self.roots[root as usize].pending_lanes.highest_priority();
        if lane.is_none() {
            return TaskStatus::Finished;
        }

        let need_sync = lane == SYNC_LANE || did_timeout;
        let outcome = self.render_root(root, lane, !need_sync, host, sched);
        if outcome == PassOutcome::Errored {
            self.drop_failed_lane(root, lane, host, sched);
            return TaskStatus::Finished;
        }
        self.ensure_root_scheduled(root, host, sched);

        match outcome {
            PassOutcome::Incomplete => {
                if self.roots[root as usize].task != Some(handle) {
                    // Superseded while rendering; the partial tree stays for
                    // the new callback to reuse or reset.
                    return TaskStatus::Finished;
                }
                TaskStatus::Continuation
            }
            PassOutcome::Completed => {
                self.finish_pass(root, lane);
                self.commit_root(root, host, sched);
                TaskStatus::Finished
            }
            PassOutcome::Errored => unreachable!("handled above"),
        }
    }

    /// Marks the finished tree on the root and clears the pass markers.
    fn finish_pass(&mut self, root: u32, lane: Lane) {
        self.arena.commit_pass();
        let current = self.roots[root as usize].current;
        let finished = self.arena.node(current).alternate;
        let container = &mut self.roots[root as usize];
        container.finished = finished;
        container.finished_lane = lane;
        self.render_lane = NO_LANE;
        self.in_flight_root = INVALID;
    }

    fn drop_failed_lane(
        &mut self,
        root: u32,
        lane: Lane,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) {
        let container = &mut self.roots[root as usize];
        container.pending_lanes = container.pending_lanes.remove(lane);
        self.ensure_root_scheduled(root, host, sched);
    }

    // -- the render pass -------------------------------------------------

    fn render_root(
        &mut self,
        root: u32,
        lane: Lane,
        time_slice: bool,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) -> PassOutcome {
        // Partial work is only resumable for the same root and lane;
        // anything else starts from a fresh stack.
        if self.in_flight_root != root || self.render_lane != lane {
            self.prepare_fresh_stack(root, lane);
        }
        let event = PassEvent {
            root,
            lane,
            mode: if time_slice {
                PassMode::Concurrent
            } else {
                PassMode::Sync
            },
        };
        self.trace.pass_started(event);
        self.pass_state = PassState::InProgress;

        let result = if time_slice {
            self.work_loop_concurrent(host, sched)
        } else {
            self.work_loop_sync(host)
        };

        if let Err(error) = result {
            // Give up on this pass entirely; the caller drops the lane.
            self.trace.render_error(event, &error);
            let _ = self.arena.reclaim_abandoned();
            self.cursor = INVALID;
            self.render_lane = NO_LANE;
            self.in_flight_root = INVALID;
            self.pass_state = PassState::Idle;
            return PassOutcome::Errored;
        }

        if time_slice && self.cursor != INVALID {
            self.pass_state = PassState::Interrupted;
            self.trace.pass_yielded(event);
            return PassOutcome::Incomplete;
        }

        debug_assert!(
            self.cursor == INVALID,
            "synchronous pass ended with work remaining"
        );
        self.pass_state = PassState::Completed;
        self.trace.pass_completed(event);
        PassOutcome::Completed
    }

    fn prepare_fresh_stack(&mut self, root: u32, lane: Lane) {
        // A superseded partial tree is dead; return its unpaired nodes
        // before this pass starts allocating.
        let _ = self.arena.reclaim_abandoned();
        self.arena.begin_pass();

        let container = &mut self.roots[root as usize];
        container.finished = INVALID;
        container.finished_lane = NO_LANE;
        let current = container.current;
        self.cursor = self
            .arena
            .create_work_in_progress(current, crate::node::NodePayload::Root);
        self.render_lane = lane;
        self.in_flight_root = root;
    }

    fn work_loop_sync(&mut self, host: &mut dyn RenderHost) -> Result<(), ReconcileError> {
        while self.cursor != INVALID {
            self.perform_unit(host)?;
        }
        Ok(())
    }

    fn work_loop_concurrent(
        &mut self,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) -> Result<(), ReconcileError> {
        while self.cursor != INVALID && !sched.should_yield() {
            self.perform_unit(host)?;
        }
        Ok(())
    }

    /// One work-loop step: begin on the cursor, then either descend or
    /// complete upward until a sibling takes over.
    fn perform_unit(&mut self, host: &mut dyn RenderHost) -> Result<(), ReconcileError> {
        let wip = self.cursor;
        let env = HooksEnv {
            inbox: self.inbox.clone(),
            transition: self.transition.clone(),
            root: self.in_flight_root,
        };
        let next = begin_work(&mut self.arena, wip, self.render_lane, &env)?;

        let node = self.arena.node_mut(wip);
        node.memoized = Some(node.pending.clone());

        if next == INVALID {
            self.complete_unit(wip, host);
        } else {
            self.cursor = next;
        }
        Ok(())
    }

    /// DFS post-order walk upward: finalize nodes until a sibling exists or
    /// the root is reached.
    fn complete_unit(&mut self, from: u32, host: &mut dyn RenderHost) {
        let mut node = from;
        loop {
            complete_work(&mut self.arena, node, host);

            let sibling = self.arena.node(node).sibling;
            if sibling != INVALID {
                self.cursor = sibling;
                return;
            }

            let parent = self.arena.node(node).parent;
            self.cursor = parent;
            if parent == INVALID {
                return;
            }
            node = parent;
        }
    }
}
