// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-adapter contract.
//!
//! Accretion never touches a concrete render surface. Platform integrations
//! implement [`RenderHost`] and map [`HostHandle`]s to native objects (DOM
//! nodes, native views, recording test doubles). The reconciler stores only
//! the opaque handles in its work nodes and drives the adapter during the
//! commit pipeline:
//!
//! - creation + [`append_initial_child`](RenderHost::append_initial_child)
//!   while a new subtree is assembled off-screen (complete phase);
//! - [`append_child`](RenderHost::append_child) /
//!   [`insert_child_before`](RenderHost::insert_child_before) /
//!   [`remove_child`](RenderHost::remove_child) during the mutation pass;
//! - [`commit_instance_update`](RenderHost::commit_instance_update) /
//!   [`commit_text_update`](RenderHost::commit_text_update) for diffed
//!   property and text changes.
//!
//! [`request_sync_flush`](RenderHost::request_sync_flush) is the microtask
//! primitive: the adapter must arrange for
//! [`Reconciler::flush_sync_work`](crate::work_loop::Reconciler::flush_sync_work)
//! to be called after the current call stack unwinds (a real event loop
//! queues a microtask; the test harness records the request and the drive
//! loop services it).

use core::fmt;

use crate::element::PropMap;

/// Opaque identifier of a host object (instance, text node, or container).
///
/// Issued by the [`RenderHost`]; the reconciler only stores and passes these
/// back.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostHandle(pub u64);

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostHandle({})", self.0)
    }
}

/// Applies reconciler-computed mutations to a platform-native tree.
pub trait RenderHost {
    /// Creates a host instance of `kind` with initial attributes.
    fn create_instance(&mut self, kind: &str, attrs: &PropMap) -> HostHandle;

    /// Creates a host text node.
    fn create_text(&mut self, content: &str) -> HostHandle;

    /// Appends `child` to a parent that is still being assembled off-screen.
    fn append_initial_child(&mut self, parent: HostHandle, child: HostHandle);

    /// Appends `child` as the last child of an attached `parent`.
    fn append_child(&mut self, parent: HostHandle, child: HostHandle);

    /// Inserts (or moves) `child` immediately before `before` under
    /// `parent`.
    fn insert_child_before(&mut self, parent: HostHandle, child: HostHandle, before: HostHandle);

    /// Detaches `child` from `parent`. Descendants go with it.
    fn remove_child(&mut self, parent: HostHandle, child: HostHandle);

    /// Applies diffed attributes to an instance.
    fn commit_instance_update(&mut self, instance: HostHandle, attrs: &PropMap);

    /// Replaces a text node's content.
    fn commit_text_update(&mut self, text: HostHandle, content: &str);

    /// Asks the host to call
    /// [`Reconciler::flush_sync_work`](crate::work_loop::Reconciler::flush_sync_work)
    /// once the current call stack has unwound.
    fn request_sync_flush(&mut self);
}
