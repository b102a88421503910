// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the reconciler.
//!
//! [`TraceSink`] is a per-event trait the engine calls at each stage of the
//! update pipeline: scheduling, render passes (start / yield / complete /
//! error), commit phases, and passive-effect flushes. All methods default to
//! no-ops so sinks implement only what they care about.
//!
//! [`Tracer`] wraps an optional boxed sink. With the `trace` feature **off**
//! every `Tracer` method compiles to nothing; with it **on**, each method is
//! a single `Option` branch before dispatch. Per-node mutation events are
//! additionally gated behind `trace-rich`.
//!
//! Host-adapter problems (a placement with no host parent, for example) are
//! reported through [`TraceSink::on_host_warning`] and the operation is
//! skipped; they are diagnostics, not errors.

use alloc::boxed::Box;
use core::fmt;

use crate::diff::ReconcileError;
use crate::lane::Lane;

/// How a render pass runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassMode {
    /// Non-preemptible, no yield checks.
    Sync,
    /// Time-sliced with yield checks between steps.
    Concurrent,
}

/// Emitted when an update is recorded and its root (re)scheduled.
#[derive(Clone, Copy, Debug)]
pub struct ScheduleEvent {
    /// Root index.
    pub root: u32,
    /// Lane the update arrived on.
    pub lane: Lane,
}

/// Emitted at render-pass boundaries.
#[derive(Clone, Copy, Debug)]
pub struct PassEvent {
    /// Root index.
    pub root: u32,
    /// Lane being rendered.
    pub lane: Lane,
    /// Pass mode.
    pub mode: PassMode,
}

/// Emitted at commit-pipeline boundaries.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// Root index.
    pub root: u32,
    /// Lane being committed.
    pub lane: Lane,
}

/// Emitted when a passive-effect flush runs.
#[derive(Clone, Copy, Debug)]
pub struct PassiveFlushEvent {
    /// Root index.
    pub root: u32,
    /// Number of unmount effect lists drained.
    pub unmount_lists: usize,
    /// Number of update effect lists drained.
    pub update_lists: usize,
}

/// Emitted when a host operation is skipped.
#[derive(Clone, Copy, Debug)]
pub struct HostWarning {
    /// Node the operation targeted.
    pub node: u32,
    /// Why it was skipped.
    pub reason: &'static str,
}

/// Which host mutation a rich mutation event records.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Host object inserted or moved.
    Placement,
    /// Host properties or text updated.
    Update,
    /// Subtree unmounted.
    Deletion,
    /// Ref detached.
    RefDetach,
    /// Ref attached.
    RefAttach,
}

/// A per-node mutation record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct MutationEvent {
    /// Node the mutation applied to.
    pub node: u32,
    /// Mutation kind.
    pub kind: MutationKind,
}

/// Receiver for reconciler diagnostics. All methods default to no-ops.
pub trait TraceSink {
    /// An update was recorded for a root.
    fn on_update_scheduled(&mut self, event: &ScheduleEvent) {
        let _ = event;
    }

    /// A render pass started (or resumed after an interruption).
    fn on_pass_started(&mut self, event: &PassEvent) {
        let _ = event;
    }

    /// A time-sliced pass yielded with work remaining.
    fn on_pass_yielded(&mut self, event: &PassEvent) {
        let _ = event;
    }

    /// A render pass produced a finished tree.
    fn on_pass_completed(&mut self, event: &PassEvent) {
        let _ = event;
    }

    /// A render pass failed; its partial tree was discarded.
    fn on_render_error(&mut self, event: &PassEvent, error: &ReconcileError) {
        let _ = (event, error);
    }

    /// The commit pipeline started for a finished tree.
    fn on_commit_started(&mut self, event: &CommitEvent) {
        let _ = event;
    }

    /// The commit pipeline finished and the current pointer swapped.
    fn on_commit_finished(&mut self, event: &CommitEvent) {
        let _ = event;
    }

    /// A passive-effect flush drained the root's buffers.
    fn on_passive_flush(&mut self, event: &PassiveFlushEvent) {
        let _ = event;
    }

    /// A host operation was skipped.
    fn on_host_warning(&mut self, event: &HostWarning) {
        let _ = event;
    }

    /// A single host mutation was applied.
    #[cfg(feature = "trace-rich")]
    fn on_mutation(&mut self, event: &MutationEvent) {
        let _ = event;
    }
}

/// Zero-overhead dispatcher in front of an optional [`TraceSink`].
#[derive(Default)]
pub struct Tracer {
    sink: Option<Box<dyn TraceSink>>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

macro_rules! forward {
    ($self:ident, $method:ident, $($arg:expr),+) => {{
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut $self.sink {
            sink.$method($($arg),+);
        }
        #[cfg(not(feature = "trace"))]
        {
            let _ = &$self.sink;
            $(let _ = $arg;)+
        }
    }};
}

impl Tracer {
    /// A tracer with no sink attached.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A tracer dispatching to `sink`.
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub(crate) fn update_scheduled(&mut self, event: ScheduleEvent) {
        forward!(self, on_update_scheduled, &event);
    }

    pub(crate) fn pass_started(&mut self, event: PassEvent) {
        forward!(self, on_pass_started, &event);
    }

    pub(crate) fn pass_yielded(&mut self, event: PassEvent) {
        forward!(self, on_pass_yielded, &event);
    }

    pub(crate) fn pass_completed(&mut self, event: PassEvent) {
        forward!(self, on_pass_completed, &event);
    }

    pub(crate) fn render_error(&mut self, event: PassEvent, error: &ReconcileError) {
        forward!(self, on_render_error, &event, error);
    }

    pub(crate) fn commit_started(&mut self, event: CommitEvent) {
        forward!(self, on_commit_started, &event);
    }

    pub(crate) fn commit_finished(&mut self, event: CommitEvent) {
        forward!(self, on_commit_finished, &event);
    }

    pub(crate) fn passive_flush(&mut self, event: PassiveFlushEvent) {
        forward!(self, on_passive_flush, &event);
    }

    pub(crate) fn host_warning(&mut self, event: HostWarning) {
        forward!(self, on_host_warning, &event);
    }

    #[cfg(feature = "trace-rich")]
    pub(crate) fn mutation(&mut self, event: MutationEvent) {
        forward!(self, on_mutation, &event);
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use super::*;
    use crate::lane::SYNC_LANE;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    #[derive(Default)]
    struct Counting(Rc<RefCell<Vec<&'static str>>>);

    impl TraceSink for Counting {
        fn on_pass_started(&mut self, _event: &PassEvent) {
            self.0.borrow_mut().push("start");
        }

        fn on_pass_completed(&mut self, _event: &PassEvent) {
            self.0.borrow_mut().push("complete");
        }
    }

    #[test]
    fn tracer_dispatches_to_sink() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tracer = Tracer::new(Box::new(Counting(log.clone())));
        let event = PassEvent {
            root: 0,
            lane: SYNC_LANE,
            mode: PassMode::Sync,
        };
        tracer.pass_started(event);
        tracer.pass_completed(event);
        // Unimplemented events fall through to the default no-op.
        tracer.pass_yielded(event);
        assert_eq!(*log.borrow(), ["start", "complete"]);
    }

    #[test]
    fn detached_tracer_is_silent() {
        let mut tracer = Tracer::none();
        tracer.pass_started(PassEvent {
            root: 0,
            lane: SYNC_LANE,
            mode: PassMode::Concurrent,
        });
    }
}
