// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable event formatting, one line per event.

use std::fmt::Write as _;

use crate::recorder::RecordedEvent;

/// Formats one event as a single line (no trailing newline).
#[must_use]
pub fn format_event(event: &RecordedEvent) -> String {
    let mut out = String::new();
    match event {
        RecordedEvent::UpdateScheduled { root, lane } => {
            let _ = write!(out, "schedule   root={root} lane={lane:#b}");
        }
        RecordedEvent::PassStarted {
            root,
            lane,
            concurrent,
        } => {
            let mode = if *concurrent { "concurrent" } else { "sync" };
            let _ = write!(out, "pass-start root={root} lane={lane:#b} mode={mode}");
        }
        RecordedEvent::PassYielded { root, lane } => {
            let _ = write!(out, "pass-yield root={root} lane={lane:#b}");
        }
        RecordedEvent::PassCompleted { root, lane } => {
            let _ = write!(out, "pass-done  root={root} lane={lane:#b}");
        }
        RecordedEvent::RenderError {
            root,
            lane,
            message,
        } => {
            let _ = write!(out, "pass-error root={root} lane={lane:#b} {message}");
        }
        RecordedEvent::CommitStarted { root, lane } => {
            let _ = write!(out, "commit     root={root} lane={lane:#b}");
        }
        RecordedEvent::CommitFinished { root, lane } => {
            let _ = write!(out, "committed  root={root} lane={lane:#b}");
        }
        RecordedEvent::PassiveFlush {
            root,
            unmount_lists,
            update_lists,
        } => {
            let _ = write!(
                out,
                "passive    root={root} unmount={unmount_lists} update={update_lists}"
            );
        }
        RecordedEvent::HostWarning { node, reason } => {
            let _ = write!(out, "host-warn  node={node} {reason}");
        }
        RecordedEvent::Mutation { node, kind } => {
            let _ = write!(out, "mutate     node={node} kind={kind:?}");
        }
    }
    out
}

/// Formats an event sequence, one line per event.
#[must_use]
pub fn pretty_print(events: &[RecordedEvent]) -> String {
    let mut out = String::new();
    for event in events {
        out.push_str(&format_event(event));
        out.push('\n');
    }
    out
}
