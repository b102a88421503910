// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event recording.
//!
//! [`EventLog`] implements [`TraceSink`] and stores each event as a
//! [`RecordedEvent`] in arrival order. Recording is lossless with respect to
//! the information the reconciler emits; lanes are stored as their raw bit
//! patterns.

use accretion_core::ReconcileError;
use accretion_core::trace::{
    CommitEvent, HostWarning, MutationEvent, MutationKind, PassEvent, PassMode,
    PassiveFlushEvent, ScheduleEvent, TraceSink,
};

/// One reconciler event, as recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// An update was recorded for a root.
    UpdateScheduled {
        /// Root index.
        root: u32,
        /// Lane bits.
        lane: u32,
    },
    /// A render pass started or resumed.
    PassStarted {
        /// Root index.
        root: u32,
        /// Lane bits.
        lane: u32,
        /// Whether the pass was time-sliced.
        concurrent: bool,
    },
    /// A time-sliced pass yielded.
    PassYielded {
        /// Root index.
        root: u32,
        /// Lane bits.
        lane: u32,
    },
    /// A pass produced a finished tree.
    PassCompleted {
        /// Root index.
        root: u32,
        /// Lane bits.
        lane: u32,
    },
    /// A pass failed and was abandoned.
    RenderError {
        /// Root index.
        root: u32,
        /// Lane bits.
        lane: u32,
        /// Rendered error message.
        message: String,
    },
    /// Commit started.
    CommitStarted {
        /// Root index.
        root: u32,
        /// Lane bits.
        lane: u32,
    },
    /// Commit finished; the current pointer swapped.
    CommitFinished {
        /// Root index.
        root: u32,
        /// Lane bits.
        lane: u32,
    },
    /// A passive flush drained the root's buffers.
    PassiveFlush {
        /// Root index.
        root: u32,
        /// Unmount lists drained.
        unmount_lists: usize,
        /// Update lists drained.
        update_lists: usize,
    },
    /// A host operation was skipped.
    HostWarning {
        /// Target node.
        node: u32,
        /// Reason text.
        reason: &'static str,
    },
    /// A host mutation was applied (`trace-rich`).
    Mutation {
        /// Target node.
        node: u32,
        /// Mutation kind.
        kind: MutationKind,
    },
}

/// A [`TraceSink`] that appends every event to a vector.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<RecordedEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded events in arrival order.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the log and returns the events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }
}

impl TraceSink for EventLog {
    fn on_update_scheduled(&mut self, event: &ScheduleEvent) {
        self.events.push(RecordedEvent::UpdateScheduled {
            root: event.root,
            lane: event.lane.bits(),
        });
    }

    fn on_pass_started(&mut self, event: &PassEvent) {
        self.events.push(RecordedEvent::PassStarted {
            root: event.root,
            lane: event.lane.bits(),
            concurrent: event.mode == PassMode::Concurrent,
        });
    }

    fn on_pass_yielded(&mut self, event: &PassEvent) {
        self.events.push(RecordedEvent::PassYielded {
            root: event.root,
            lane: event.lane.bits(),
        });
    }

    fn on_pass_completed(&mut self, event: &PassEvent) {
        self.events.push(RecordedEvent::PassCompleted {
            root: event.root,
            lane: event.lane.bits(),
        });
    }

    fn on_render_error(&mut self, event: &PassEvent, error: &ReconcileError) {
        self.events.push(RecordedEvent::RenderError {
            root: event.root,
            lane: event.lane.bits(),
            message: error.to_string(),
        });
    }

    fn on_commit_started(&mut self, event: &CommitEvent) {
        self.events.push(RecordedEvent::CommitStarted {
            root: event.root,
            lane: event.lane.bits(),
        });
    }

    fn on_commit_finished(&mut self, event: &CommitEvent) {
        self.events.push(RecordedEvent::CommitFinished {
            root: event.root,
            lane: event.lane.bits(),
        });
    }

    fn on_passive_flush(&mut self, event: &PassiveFlushEvent) {
        self.events.push(RecordedEvent::PassiveFlush {
            root: event.root,
            unmount_lists: event.unmount_lists,
            update_lists: event.update_lists,
        });
    }

    fn on_host_warning(&mut self, event: &HostWarning) {
        self.events.push(RecordedEvent::HostWarning {
            node: event.node,
            reason: event.reason,
        });
    }

    fn on_mutation(&mut self, event: &MutationEvent) {
        self.events.push(RecordedEvent::Mutation {
            node: event.node,
            kind: event.kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accretion_core::lane::SYNC_LANE;

    #[test]
    fn records_in_arrival_order() {
        let mut log = EventLog::new();
        log.on_pass_started(&PassEvent {
            root: 0,
            lane: SYNC_LANE,
            mode: PassMode::Sync,
        });
        log.on_pass_completed(&PassEvent {
            root: 0,
            lane: SYNC_LANE,
            mode: PassMode::Sync,
        });
        log.on_commit_started(&CommitEvent {
            root: 0,
            lane: SYNC_LANE,
        });

        let lane = SYNC_LANE.bits();
        assert_eq!(
            log.events(),
            [
                RecordedEvent::PassStarted {
                    root: 0,
                    lane,
                    concurrent: false
                },
                RecordedEvent::PassCompleted { root: 0, lane },
                RecordedEvent::CommitStarted { root: 0, lane },
            ]
        );
    }
}
