// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root containers and the container-facing API.
//!
//! A [`RootContainer`] ties a host container handle to the current committed
//! tree and owns everything scheduled for it: the pending-lanes set, the
//! in-flight scheduler callback, and the passive-effect buffers awaiting an
//! asynchronous flush.
//!
//! [`Reconciler::create_container`] and [`Reconciler::update_container`] are
//! the whole outward surface for element construction: render a described
//! element into a container, or pass `None` to unmount it.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::element::Element;
use crate::hooks::Effect;
use crate::host::{HostHandle, RenderHost};
use crate::lane::{Lane, Lanes, NO_LANE, NO_LANES, SYNC_LANE};
use crate::node::INVALID;
use crate::sched::{TaskHandle, TaskScheduler};
use crate::update::{SharedQueue, Update, shared_queue};
use crate::work_loop::Reconciler;

/// Identifier of a container created by
/// [`Reconciler::create_container`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootId(pub(crate) u32);

impl fmt::Debug for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootId({})", self.0)
    }
}

/// One node's effect list, captured for a passive flush.
pub(crate) type NodeEffects = Vec<Rc<Effect>>;

/// Passive-effect buffers: unmount destroys run before update
/// destroy/create pairs.
#[derive(Debug, Default)]
pub(crate) struct PendingPassive {
    pub(crate) unmount: Vec<NodeEffects>,
    pub(crate) update: Vec<NodeEffects>,
}

/// Per-container bookkeeping.
#[derive(Debug)]
pub(crate) struct RootContainer {
    /// Host handle of the container itself.
    pub(crate) container: HostHandle,
    /// Head node of the committed tree.
    pub(crate) current: u32,
    /// Root-level update queue (shared with the root node).
    pub(crate) queue: SharedQueue<Option<Element>>,
    /// Union of lanes with pending work.
    pub(crate) pending_lanes: Lanes,
    /// Finished work-in-progress tree awaiting commit, or [`INVALID`].
    pub(crate) finished: u32,
    /// Lane the finished tree was rendered at.
    pub(crate) finished_lane: Lane,
    /// Outstanding scheduler callback for this root.
    pub(crate) task: Option<TaskHandle>,
    /// Lane the outstanding callback was scheduled for.
    pub(crate) task_lane: Lane,
    /// Buffers awaiting the asynchronous passive flush.
    pub(crate) pending_passive: PendingPassive,
    /// Deduplicates passive-flush scheduling per root.
    pub(crate) passive_scheduled: bool,
}

impl RootContainer {
    fn new(container: HostHandle, current: u32, queue: SharedQueue<Option<Element>>) -> Self {
        Self {
            container,
            current,
            queue,
            pending_lanes: NO_LANES,
            finished: INVALID,
            finished_lane: NO_LANE,
            task: None,
            task_lane: NO_LANE,
            pending_passive: PendingPassive::default(),
            passive_scheduled: false,
        }
    }
}

impl Reconciler {
    /// Creates a root container around a host container handle.
    pub fn create_container(&mut self, container: HostHandle) -> RootId {
        let root_id = u32::try_from(self.roots.len()).expect("too many containers");
        let queue = shared_queue();
        let root_node = self.arena.create_host_root(root_id, queue.clone());
        self.roots
            .push(RootContainer::new(container, root_node, queue));
        RootId(root_id)
    }

    /// Renders `element` into `root` (or unmounts it when `None`).
    ///
    /// The update is enqueued at the synchronous lane and flushed through
    /// the host's microtask primitive, so the render happens outside the
    /// caller's stack but before control returns to the event loop.
    pub fn update_container(
        &mut self,
        element: Option<Element>,
        root: RootId,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) {
        let queue = self.roots[root.0 as usize].queue.clone();
        queue
            .borrow_mut()
            .enqueue(Update::replace(element, SYNC_LANE));
        self.schedule_update_on_root(root.0, SYNC_LANE, host, sched);
    }

    /// The committed head node of a container's tree (for diagnostics).
    #[must_use]
    pub fn current_tree(&self, root: RootId) -> u32 {
        self.roots[root.0 as usize].current
    }

    /// Lanes with pending work on `root`.
    #[must_use]
    pub fn pending_lanes(&self, root: RootId) -> Lanes {
        self.roots[root.0 as usize].pending_lanes
    }
}
