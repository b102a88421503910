// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format export.
//!
//! Converts a recorded event sequence into the JSON array format understood
//! by `chrome://tracing` and Perfetto. The reconciler's events carry no wall
//! clock, so the event's position in the sequence serves as its timestamp —
//! the visualization shows ordering and nesting, not durations.
//!
//! Passes and commits become `B`/`E` duration pairs on a per-root track;
//! everything else becomes an instant event.

use serde_json::{Value, json};

use crate::recorder::RecordedEvent;

/// Serializes `events` as a Chrome Trace Event Format JSON string.
#[must_use]
pub fn to_chrome_trace(events: &[RecordedEvent]) -> String {
    let mut entries: Vec<Value> = Vec::with_capacity(events.len());
    let mut ts: u64 = 0;
    for event in events {
        entries.push(entry(ts, event));
        ts += 1;
    }
    Value::Array(entries).to_string()
}

fn entry(ts: u64, event: &RecordedEvent) -> Value {
    match event {
        RecordedEvent::UpdateScheduled { root, lane } => instant(ts, *root, "schedule", lane),
        RecordedEvent::PassStarted { root, lane, .. } => span(ts, *root, "render", "B", lane),
        RecordedEvent::PassYielded { root, lane }
        | RecordedEvent::PassCompleted { root, lane } => span(ts, *root, "render", "E", lane),
        RecordedEvent::RenderError { root, lane, .. } => span(ts, *root, "render", "E", lane),
        RecordedEvent::CommitStarted { root, lane } => span(ts, *root, "commit", "B", lane),
        RecordedEvent::CommitFinished { root, lane } => span(ts, *root, "commit", "E", lane),
        RecordedEvent::PassiveFlush { root, .. } => instant(ts, *root, "passive-flush", &0u32),
        RecordedEvent::HostWarning { node, reason } => json!({
            "name": "host-warning",
            "ph": "i",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "g",
            "args": { "node": node, "reason": reason },
        }),
        RecordedEvent::Mutation { node, kind } => json!({
            "name": format!("{kind:?}"),
            "ph": "i",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "t",
            "args": { "node": node },
        }),
    }
}

fn span(ts: u64, root: u32, name: &str, phase: &str, lane: &u32) -> Value {
    json!({
        "name": name,
        "ph": phase,
        "ts": ts,
        "pid": 0,
        "tid": root,
        "args": { "lane": lane },
    })
}

fn instant(ts: u64, root: u32, name: &str, lane: &u32) -> Value {
    json!({
        "name": name,
        "ph": "i",
        "ts": ts,
        "pid": 0,
        "tid": root,
        "s": "t",
        "args": { "lane": lane },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_balanced_span_pairs() {
        let events = [
            RecordedEvent::PassStarted {
                root: 0,
                lane: 2,
                concurrent: false,
            },
            RecordedEvent::PassCompleted { root: 0, lane: 2 },
            RecordedEvent::CommitStarted { root: 0, lane: 2 },
            RecordedEvent::CommitFinished { root: 0, lane: 2 },
        ];
        let trace = to_chrome_trace(&events);
        let parsed: serde_json::Value = serde_json::from_str(&trace).expect("valid JSON");
        let entries = parsed.as_array().expect("array");
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["ph"], "B");
        assert_eq!(entries[1]["ph"], "E");
        assert_eq!(entries[2]["name"], "commit");
        assert_eq!(entries[3]["ts"], 3);
    }
}
