// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The commit pipeline: flushing a finished tree to the host.
//!
//! Commit is non-preemptible and runs in a fixed order, each step a
//! precondition for the next:
//!
//! 1. Detach the finished lane from the root's pending set.
//! 2. Schedule an asynchronous passive-effect flush (normal priority,
//!    deduplicated per root) if the tree carries passive or deletion
//!    markers. The flush never runs synchronously inside commit.
//! 3. If mutation-class work is present anywhere, walk the tree depth-first
//!    applying placements, property updates, deletions, and ref detach.
//! 4. Swap the root's `current` pointer to the committed tree — after
//!    mutation, before layout, so ref callbacks observe the new surface.
//! 5. Run layout-class effects (ref attach) synchronously.
//!
//! Deletions walk their subtree parent-before-child, queueing component
//! unmount effects and detaching refs, and remove only the top-level host
//! descendants from the host parent — nested hosts leave with them. The
//! freed tree positions (both generations) return to the arena.
//!
//! Host-adapter failures (no host parent for a placement) are traced as
//! warnings and the operation is skipped; one failed attach does not abort
//! the commit.

use alloc::vec::Vec;

use crate::flags::{
    CHILD_DELETION, HOOK_HAS_EFFECT, HOOK_PASSIVE, LAYOUT_MASK, MUTATION_MASK, PASSIVE,
    PASSIVE_MASK, PLACEMENT, REF, UPDATE,
};
use crate::element::RefValue;
use crate::host::{HostHandle, RenderHost};
use crate::lane::NO_LANE;
use crate::node::{INVALID, NodePayload, NodeTag};
use crate::root::RootId;
use crate::sched::{TaskPriority, TaskScheduler, TaskToken};
use crate::trace::{CommitEvent, HostWarning, PassiveFlushEvent};
use crate::work_loop::{PassState, Reconciler};

impl Reconciler {
    /// Runs the commit pipeline for `root`'s finished tree, if any.
    pub(crate) fn commit_root(
        &mut self,
        root: u32,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) {
        let finished = self.roots[root as usize].finished;
        if finished == INVALID {
            return;
        }
        let lane = self.roots[root as usize].finished_lane;
        debug_assert!(!lane.is_none(), "commit without a finished lane");
        self.trace.commit_started(CommitEvent { root, lane });

        {
            let container = &mut self.roots[root as usize];
            container.finished = INVALID;
            container.finished_lane = NO_LANE;
            container.pending_lanes = container.pending_lanes.remove(lane);
        }

        let top = self.arena.node(finished);
        let all_flags = top.flags | top.subtree_flags;

        // Passive work is flushed asynchronously, once per root.
        if all_flags & PASSIVE_MASK != 0 && !self.roots[root as usize].passive_scheduled {
            self.roots[root as usize].passive_scheduled = true;
            let _ = sched.schedule(TaskPriority::Normal, TaskToken::FlushPassive(RootId(root)));
        }

        if all_flags & (MUTATION_MASK | PASSIVE) != 0 {
            self.commit_mutation_pass(finished, root, host);
            self.roots[root as usize].current = finished;
            self.commit_layout_pass(finished, host);
        } else {
            self.roots[root as usize].current = finished;
        }

        self.set_pass_state(PassState::Idle);
        self.trace.commit_finished(CommitEvent { root, lane });
        self.ensure_root_scheduled(root, host, sched);
    }

    // -- mutation pass ---------------------------------------------------

    /// Depth-first walk over nodes whose subtree carries mutation-class or
    /// passive flags, applying per-node mutations bottom-up in document
    /// order.
    fn commit_mutation_pass(&mut self, finished: u32, root: u32, host: &mut dyn RenderHost) {
        const MASK: u32 = MUTATION_MASK | PASSIVE;
        let mut cursor = finished;
        while cursor != INVALID {
            let node = self.arena.node(cursor);
            let child = node.child;
            if node.subtree_flags & MASK != 0 && child != INVALID {
                cursor = child;
            } else {
                while cursor != INVALID {
                    self.commit_mutation_on_node(cursor, root, host);
                    let node = self.arena.node(cursor);
                    let sibling = node.sibling;
                    if sibling != INVALID {
                        cursor = sibling;
                        break;
                    }
                    cursor = node.parent;
                }
            }
        }
    }

    fn commit_mutation_on_node(&mut self, node: u32, root: u32, host: &mut dyn RenderHost) {
        let flags = self.arena.node(node).flags;

        if flags & PLACEMENT != 0 {
            self.commit_placement(node, host);
            self.arena.node_mut(node).flags &= !PLACEMENT;
        }

        if flags & UPDATE != 0 {
            self.commit_host_update(node, host);
            self.arena.node_mut(node).flags &= !UPDATE;
        }

        if flags & CHILD_DELETION != 0 {
            let deletions = core::mem::take(&mut self.arena.node_mut(node).deletions);
            for deleted in deletions {
                self.commit_deletion(deleted, root, host);
            }
            self.arena.node_mut(node).flags &= !CHILD_DELETION;
        }

        if flags & PASSIVE != 0 {
            // Collect this node's effect list for the asynchronous flush.
            let effects = self.arena.node(node).effects.clone();
            if !effects.is_empty() {
                self.roots[root as usize].pending_passive.update.push(effects);
            }
            self.arena.node_mut(node).flags &= !PASSIVE;
        }

        if flags & REF != 0 && self.arena.node(node).tag == NodeTag::HostElement {
            // Release the previously attached ref; the new one attaches
            // during layout, after the surface swap.
            let previous = self.arena.node(node).alternate;
            if previous != INVALID {
                let old_ref = match &self.arena.node(previous).pending {
                    NodePayload::Host(props) => props.host_ref.clone(),
                    _ => None,
                };
                if let Some(old_ref) = old_ref {
                    detach_ref(&old_ref);
                    #[cfg(feature = "trace-rich")]
                    self.trace.mutation(crate::trace::MutationEvent {
                        node,
                        kind: crate::trace::MutationKind::RefDetach,
                    });
                }
            }
        }
    }

    // -- placement -------------------------------------------------------

    fn commit_placement(&mut self, node: u32, host: &mut dyn RenderHost) {
        let Some(parent) = self.host_parent_of(node) else {
            self.trace.host_warning(HostWarning {
                node,
                reason: "placement skipped: no host parent",
            });
            return;
        };
        let before = self.host_sibling_of(node);
        self.insert_or_append(node, parent, before, host);
        #[cfg(feature = "trace-rich")]
        self.trace.mutation(crate::trace::MutationEvent {
            node,
            kind: crate::trace::MutationKind::Placement,
        });
    }

    /// The host object of the nearest host-element or root ancestor.
    fn host_parent_of(&self, node: u32) -> Option<HostHandle> {
        let mut parent = self.arena.node(node).parent;
        while parent != INVALID {
            let candidate = self.arena.node(parent);
            match candidate.tag {
                NodeTag::HostElement => return candidate.host,
                NodeTag::HostRoot => {
                    return Some(self.roots[candidate.root_id as usize].container);
                }
                _ => parent = candidate.parent,
            }
        }
        None
    }

    /// The host object of the nearest following host sibling that is not
    /// itself being placed, to serve as the insertion anchor.
    fn host_sibling_of(&self, node: u32) -> Option<HostHandle> {
        let mut cursor = node;
        'siblings: loop {
            // Climb until a following sibling exists; crossing a host
            // boundary means there is no anchor.
            while self.arena.node(cursor).sibling == INVALID {
                let parent = self.arena.node(cursor).parent;
                if parent == INVALID
                    || matches!(
                        self.arena.node(parent).tag,
                        NodeTag::HostElement | NodeTag::HostRoot
                    )
                {
                    return None;
                }
                cursor = parent;
            }
            cursor = self.arena.node(cursor).sibling;

            // Descend to the nearest host descendant, skipping anything
            // that is itself moving.
            while !self.arena.node(cursor).is_host() {
                let candidate = self.arena.node(cursor);
                if candidate.flags & PLACEMENT != 0 || candidate.child == INVALID {
                    continue 'siblings;
                }
                cursor = candidate.child;
            }

            let candidate = self.arena.node(cursor);
            if candidate.flags & PLACEMENT == 0 {
                return candidate.host;
            }
        }
    }

    /// Inserts (or appends) every nearest host descendant of `node` under
    /// `parent`, preserving document order.
    fn insert_or_append(
        &mut self,
        node: u32,
        parent: HostHandle,
        before: Option<HostHandle>,
        host: &mut dyn RenderHost,
    ) {
        let current = self.arena.node(node);
        if current.is_host() {
            if let Some(handle) = current.host {
                match before {
                    Some(anchor) => host.insert_child_before(parent, handle, anchor),
                    None => host.append_child(parent, handle),
                }
            }
            return;
        }
        let child = current.child;
        if child != INVALID {
            self.insert_or_append(child, parent, before, host);
            let mut sibling = self.arena.node(child).sibling;
            while sibling != INVALID {
                self.insert_or_append(sibling, parent, before, host);
                sibling = self.arena.node(sibling).sibling;
            }
        }
    }

    // -- host updates ----------------------------------------------------

    fn commit_host_update(&mut self, node: u32, host: &mut dyn RenderHost) {
        let record = self.arena.node(node);
        let Some(handle) = record.host else {
            self.trace.host_warning(HostWarning {
                node,
                reason: "update skipped: node has no host object",
            });
            return;
        };
        match &record.pending {
            NodePayload::Text(text) => host.commit_text_update(handle, text),
            NodePayload::Host(props) => host.commit_instance_update(handle, &props.attrs),
            _ => {}
        }
        #[cfg(feature = "trace-rich")]
        self.trace.mutation(crate::trace::MutationEvent {
            node,
            kind: crate::trace::MutationKind::Update,
        });
    }

    // -- deletion --------------------------------------------------------

    /// Unmounts a deleted subtree: walks it parent-before-child detaching
    /// refs and queueing passive unmounts, removes its top-level host
    /// descendants from the host parent, and frees both generations of
    /// every position.
    fn commit_deletion(&mut self, deleted: u32, root: u32, host: &mut dyn RenderHost) {
        let mut top_level_hosts: Vec<u32> = Vec::new();

        let mut cursor = deleted;
        'walk: loop {
            self.unmount_node(cursor, &mut top_level_hosts, root);

            let node = self.arena.node(cursor);
            if node.child != INVALID {
                let child = node.child;
                self.arena.node_mut(child).parent = cursor;
                cursor = child;
                continue;
            }
            if cursor == deleted {
                break;
            }
            while self.arena.node(cursor).sibling == INVALID {
                let parent = self.arena.node(cursor).parent;
                if parent == INVALID || parent == deleted {
                    break 'walk;
                }
                cursor = parent;
            }
            let parent = self.arena.node(cursor).parent;
            let sibling = self.arena.node(cursor).sibling;
            self.arena.node_mut(sibling).parent = parent;
            cursor = sibling;
        }

        if !top_level_hosts.is_empty() {
            if let Some(parent) = self.host_parent_of(deleted) {
                for &node in &top_level_hosts {
                    if let Some(handle) = self.arena.node(node).host {
                        host.remove_child(parent, handle);
                    }
                }
            } else {
                self.trace.host_warning(HostWarning {
                    node: deleted,
                    reason: "deletion skipped: no host parent",
                });
            }
        }
        #[cfg(feature = "trace-rich")]
        self.trace.mutation(crate::trace::MutationEvent {
            node: deleted,
            kind: crate::trace::MutationKind::Deletion,
        });

        self.free_subtree(deleted);
    }

    fn unmount_node(&mut self, node: u32, top_level_hosts: &mut Vec<u32>, root: u32) {
        match self.arena.node(node).tag {
            NodeTag::HostElement => {
                self.record_top_level_host(node, top_level_hosts);
                let host_ref = match &self.arena.node(node).pending {
                    NodePayload::Host(props) => props.host_ref.clone(),
                    _ => None,
                };
                if let Some(host_ref) = host_ref {
                    detach_ref(&host_ref);
                }
            }
            NodeTag::HostText => {
                self.record_top_level_host(node, top_level_hosts);
            }
            NodeTag::Component => {
                // Queue the whole effect list; destroys run during the
                // asynchronous passive flush, parent lists first.
                let effects = self.arena.node(node).effects.clone();
                if !effects.is_empty() {
                    self.roots[root as usize]
                        .pending_passive
                        .unmount
                        .push(effects);
                }
            }
            NodeTag::Fragment | NodeTag::HostRoot => {}
        }
    }

    /// Records `node` only if it is a top-level host of the deleted subtree:
    /// the first host found, or a sibling (at the same host depth) of the
    /// last recorded one.
    fn record_top_level_host(&self, node: u32, recorded: &mut Vec<u32>) {
        let Some(&last) = recorded.last() else {
            recorded.push(node);
            return;
        };
        let mut sibling = self.arena.node(last).sibling;
        while sibling != INVALID {
            if sibling == node {
                recorded.push(node);
                return;
            }
            sibling = self.arena.node(sibling).sibling;
        }
    }

    /// Returns every position of the deleted subtree (and its alternate) to
    /// the arena.
    fn free_subtree(&mut self, deleted: u32) {
        let mut stack = alloc::vec![deleted];
        let mut to_free = Vec::new();
        while let Some(node) = stack.pop() {
            to_free.push(node);
            let mut child = self.arena.node(node).child;
            while child != INVALID {
                stack.push(child);
                child = self.arena.node(child).sibling;
            }
        }
        for node in to_free {
            let alternate = self.arena.node(node).alternate;
            if alternate != INVALID {
                self.arena.free(alternate);
            }
            self.arena.free(node);
        }
    }

    // -- layout pass -----------------------------------------------------

    /// Depth-first layout pass: attaches refs to the now-current surface.
    ///
    /// Runs pre-order so layout effects observe parent-then-child order,
    /// unlike the bottom-up mutation pass.
    fn commit_layout_pass(&mut self, finished: u32, host: &mut dyn RenderHost) {
        let _ = host;
        let mut cursor = finished;
        loop {
            self.commit_layout_on_node(cursor);

            let node = self.arena.node(cursor);
            if node.subtree_flags & LAYOUT_MASK != 0 && node.child != INVALID {
                cursor = node.child;
                continue;
            }
            if cursor == finished {
                return;
            }
            while self.arena.node(cursor).sibling == INVALID {
                let parent = self.arena.node(cursor).parent;
                if parent == INVALID || parent == finished {
                    return;
                }
                cursor = parent;
            }
            cursor = self.arena.node(cursor).sibling;
        }
    }

    fn commit_layout_on_node(&mut self, node: u32) {
        let record = self.arena.node(node);
        if record.flags & REF != 0 && record.tag == NodeTag::HostElement {
            let handle = record.host;
            let host_ref = match &record.pending {
                NodePayload::Host(props) => props.host_ref.clone(),
                _ => None,
            };
            if let (Some(host_ref), Some(handle)) = (host_ref, handle) {
                attach_ref(&host_ref, handle);
                #[cfg(feature = "trace-rich")]
                self.trace.mutation(crate::trace::MutationEvent {
                    node,
                    kind: crate::trace::MutationKind::RefAttach,
                });
            }
            self.arena.node_mut(node).flags &= !REF;
        }
    }

    // -- passive effects -------------------------------------------------

    /// Drains and runs `root`'s passive buffers: unmount destroys first,
    /// then update destroys, then update creates, all in declaration order
    /// within each node. Any updates dispatched by the callbacks are
    /// scheduled, and produced synchronous work flushes before returning.
    pub(crate) fn flush_passive_for(
        &mut self,
        root: u32,
        host: &mut dyn RenderHost,
        sched: &mut dyn TaskScheduler,
    ) -> bool {
        let container = &mut self.roots[root as usize];
        container.passive_scheduled = false;
        let unmount = core::mem::take(&mut container.pending_passive.unmount);
        let update = core::mem::take(&mut container.pending_passive.update);
        let did_flush = !unmount.is_empty() || !update.is_empty();
        if did_flush {
            self.trace.passive_flush(PassiveFlushEvent {
                root,
                unmount_lists: unmount.len(),
                update_lists: update.len(),
            });
        }

        for list in &unmount {
            for effect in list {
                let tag = effect.tag.get();
                if tag & HOOK_PASSIVE != 0 {
                    if let Some(destroy) = effect.destroy.borrow_mut().take() {
                        destroy();
                    }
                    // The component is gone; its create must never run.
                    effect.tag.set(tag & !HOOK_HAS_EFFECT);
                }
            }
        }

        const ACTIVE: u32 = HOOK_PASSIVE | HOOK_HAS_EFFECT;
        for list in &update {
            for effect in list {
                if effect.tag.get() & ACTIVE == ACTIVE {
                    if let Some(destroy) = effect.destroy.borrow_mut().take() {
                        destroy();
                    }
                }
            }
        }
        for list in &update {
            for effect in list {
                if effect.tag.get() & ACTIVE == ACTIVE {
                    let cleanup = (effect.create)();
                    *effect.destroy.borrow_mut() = cleanup;
                }
            }
        }

        // Effect callbacks may have dispatched; schedule the updates and
        // drain any synchronous work they produced before returning.
        self.flush_dispatched(host, sched);
        self.flush_sync_work(host, sched);
        did_flush
    }
}

/// Releases a ref attachment.
fn detach_ref(host_ref: &RefValue) {
    match host_ref {
        RefValue::Object(slot) => slot.set(None),
        RefValue::Callback(callback) => callback(None),
    }
}

/// Attaches a ref to its materialized host object.
fn attach_ref(host_ref: &RefValue, handle: HostHandle) {
    match host_ref {
        RefValue::Object(slot) => slot.set(Some(handle)),
        RefValue::Callback(callback) => callback(Some(handle)),
    }
}
