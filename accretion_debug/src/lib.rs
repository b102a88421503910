// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for accretion
//! diagnostics.
//!
//! This crate provides [`TraceSink`](accretion_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`recorder::EventLog`] — records every reconciler event as a
//!   [`recorder::RecordedEvent`] for later inspection or export.
//! - [`pretty::pretty_print`] — human-readable one-line-per-event output.
//! - [`chrome::to_chrome_trace`] — Chrome Trace Event Format JSON from a
//!   recorded event sequence.

pub mod chrome;
pub mod pretty;
pub mod recorder;
