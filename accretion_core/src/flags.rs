// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect-flag constants.
//!
//! Each work node carries a [`Flags`] bitset of the host mutations and
//! lifecycle work the commit pipeline owes it, plus a `subtree_flags`
//! aggregate OR-ed up from its children during the complete phase so commit
//! can skip whole subtrees with nothing to do.
//!
//! Masks group the flags by commit stage:
//!
//! - [`MUTATION_MASK`] — flags handled during the mutation pass (host
//!   inserts/moves, property updates, deletions, ref detach).
//! - [`LAYOUT_MASK`] — flags handled synchronously after the current-tree
//!   swap (ref attach).
//! - [`PASSIVE_MASK`] — flags that require an asynchronous passive-effect
//!   flush ([`PASSIVE`] itself, and [`CHILD_DELETION`] because deleted
//!   components queue unmount effects).
//!
//! Hook-effect tags ([`HookFlags`]) are a separate small bitset stored per
//! effect record; [`HOOK_HAS_EFFECT`] marks records whose create/destroy
//! must run for the current commit.

/// Per-node effect bitset.
pub type Flags = u32;

/// No pending work.
pub const NO_FLAGS: Flags = 0;

/// Insert or move the node's host object.
pub const PLACEMENT: Flags = 0b0000_0010;

/// Apply diffed host properties or text.
pub const UPDATE: Flags = 0b0000_0100;

/// One or more children recorded in `deletions` must be unmounted.
pub const CHILD_DELETION: Flags = 0b0001_0000;

/// Ref must be detached during mutation and re-attached during layout.
pub const REF: Flags = 0b10_0000_0000;

/// The node owns passive effects to (re)run after this commit.
pub const PASSIVE: Flags = 0b1000_0000_0000;

/// Everything the mutation pass consumes.
pub const MUTATION_MASK: Flags = PLACEMENT | UPDATE | CHILD_DELETION | REF;

/// Everything the layout pass consumes.
pub const LAYOUT_MASK: Flags = REF;

/// Everything that forces a passive-effect flush to be scheduled.
pub const PASSIVE_MASK: Flags = PASSIVE | CHILD_DELETION;

/// Per-effect-record tag bitset.
pub type HookFlags = u32;

/// The effect's create/destroy pair must run for the current commit.
pub const HOOK_HAS_EFFECT: HookFlags = 0b0001;

/// The record belongs to a passive (deferred) effect hook.
pub const HOOK_PASSIVE: HookFlags = 0b1000;
