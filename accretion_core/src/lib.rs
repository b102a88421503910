// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reconciliation engine for declarative element trees.
//!
//! `accretion_core` turns described element trees into the minimal set of
//! mutations on an external render target, with priority-based preemption of
//! in-flight work. It is `no_std` compatible (with `alloc`) and keeps the
//! render tree in a flat, index-addressed arena with explicit child/sibling
//! links.
//!
//! # Architecture
//!
//! An update flows through the engine like this:
//!
//! ```text
//!   update_container / Updater::set
//!       │
//!       ▼
//!   UpdateQueue (per root / per hook, lane-tagged)
//!       │
//!       ▼
//!   Reconciler work loop ──begin──► diff children ──► new work nodes
//!       │                 ◄─complete─ host payloads, bubbled flags
//!       │  (yieldable between steps at concurrent priorities)
//!       ▼
//!   Commit pipeline ──► RenderHost mutations ──► current-tree swap
//!       │                                            │
//!       ▼                                            ▼
//!   passive effects (async flush)            layout effects (refs)
//! ```
//!
//! **[`element`]** — The input vocabulary: [`Element`](element::Element)
//! descriptions, [`Child`](element::Child) positions, plain
//! [`PropValue`](element::PropValue) data.
//!
//! **[`lane`]** — Bit-per-class update priorities. The lowest set bit wins;
//! conversion to scheduler priorities happens only at the boundary.
//!
//! **[`flags`]** — Per-node effect bitset constants and the commit-stage
//! masks.
//!
//! **[`node`]** — The work-node arena: two generations per tree position,
//! paired lazily and recycled through a free list.
//!
//! **[`update`]** — Lane-filtered update replay with base-state/base-queue
//! carry-over for skipped work.
//!
//! **[`hooks`]** — Per-component hook chains, the explicit
//! [`HookContext`](hooks::HookContext) cursor, and the
//! [`Updater`](hooks::Updater) dispatch boundary.
//!
//! **[`diff`]** — Keyed child reconciliation with running-maximum move
//! detection.
//!
//! **[`work_loop`]** — The [`Reconciler`](work_loop::Reconciler): the
//! begin/complete state machine, time slicing, and root scheduling.
//!
//! **[`commit`]** — The non-preemptible mutation → swap → layout pipeline
//! and the asynchronous passive-effect flush.
//!
//! **[`root`]** — Containers: [`create_container`] and
//! [`update_container`].
//!
//! **[`host`]** — The [`RenderHost`](host::RenderHost) adapter trait
//! platform integrations implement.
//!
//! **[`sched`]** — The [`TaskScheduler`](sched::TaskScheduler) contract the
//! external cooperative scheduler provides.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) diagnostics with a
//! zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): adds per-node
//!   mutation events during commit.
//!
//! [`create_container`]: work_loop::Reconciler::create_container
//! [`update_container`]: work_loop::Reconciler::update_container

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod begin;
pub mod commit;
pub mod complete;
pub mod diff;
pub mod element;
pub mod flags;
pub mod hooks;
pub mod host;
pub mod lane;
pub mod node;
pub mod root;
pub mod sched;
pub mod trace;
pub mod update;
pub mod work_loop;

pub use diff::ReconcileError;
pub use element::{Child, Element, PropValue};
pub use host::{HostHandle, RenderHost};
pub use lane::{Lane, Lanes};
pub use root::RootId;
pub use sched::{TaskHandle, TaskPriority, TaskScheduler, TaskToken};
pub use work_loop::{PassState, Reconciler, TaskStatus};
