// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The top-down ("begin") phase of one work-loop step.
//!
//! [`begin_work`] dispatches on the node's tag, computes the children the
//! node describes for this render, and reconciles them against the previous
//! generation. It returns the first child to descend into, or [`INVALID`]
//! when the node is a leaf and the complete phase should take over.
//!
//! Only structural flags (placement, deletion) are produced here; property
//! updates are detected during the complete phase where old and new host
//! payloads sit side by side.

use alloc::vec::Vec;

use crate::diff::{ChildReconciler, ReconcileError};
use crate::element::{Child, PropValue};
use crate::hooks::{HooksEnv, render_with_hooks};
use crate::lane::Lane;
use crate::node::{INVALID, NodeArena, NodePayload, NodeState, NodeTag};
use crate::update::process_update_queue;

/// Runs the begin phase on `wip`. Returns the child cursor to continue
/// with, or [`INVALID`] if the subtree bottomed out here.
pub(crate) fn begin_work(
    arena: &mut NodeArena,
    wip: u32,
    render_lane: Lane,
    env: &HooksEnv,
) -> Result<u32, ReconcileError> {
    match arena.node(wip).tag {
        NodeTag::HostRoot => update_host_root(arena, wip, render_lane),
        NodeTag::HostElement => {
            let children = match &arena.node(wip).pending {
                NodePayload::Host(props) => props.children.clone(),
                _ => Vec::new(),
            };
            reconcile_children(arena, wip, &child_from_list(children))
        }
        NodeTag::HostText => Ok(INVALID),
        NodeTag::Component => {
            let child = render_with_hooks(arena, wip, render_lane, env);
            reconcile_children(arena, wip, &child)
        }
        NodeTag::Fragment => {
            let children = match &arena.node(wip).pending {
                NodePayload::Fragment(children) => children.clone(),
                _ => Vec::new(),
            };
            reconcile_children(arena, wip, &child_from_list(children))
        }
    }
}

/// Replays the root's update queue at the render lane, stores the processed
/// element, and reconciles it as the root's single child.
fn update_host_root(
    arena: &mut NodeArena,
    wip: u32,
    render_lane: Lane,
) -> Result<u32, ReconcileError> {
    let base = match &arena.node(wip).state {
        NodeState::Root(element) => element.clone(),
        _ => None,
    };
    let queue = arena
        .node(wip)
        .root_queue
        .clone()
        .expect("host root without an update queue");
    let pending = queue.borrow_mut().take_pending();

    let processed = process_update_queue(base, &pending, render_lane);
    arena.node_mut(wip).state = NodeState::Root(processed.memoized_state.clone());

    let next = match processed.memoized_state {
        Some(element) => Child::Element(element),
        None => Child::Value(PropValue::Null),
    };
    reconcile_children(arena, wip, &next)
}

/// A described child list as a single [`Child`]: empty renders nothing, a
/// lone child keeps the single-child reconcile path, several children take
/// the keyed list path.
fn child_from_list(mut children: Vec<Child>) -> Child {
    match children.len() {
        0 => Child::Value(PropValue::Null),
        1 => children.swap_remove(0),
        _ => Child::List(children),
    }
}

/// Diffs `new_child` against the current generation's children and installs
/// the result as `wip`'s child. First mounts (no current generation) only
/// construct; updates track side effects.
fn reconcile_children(
    arena: &mut NodeArena,
    wip: u32,
    new_child: &Child,
) -> Result<u32, ReconcileError> {
    let current = arena.node(wip).alternate;
    let first = if current == INVALID {
        ChildReconciler::MOUNT.reconcile(arena, wip, INVALID, new_child)?
    } else {
        let current_first = arena.node(current).child;
        ChildReconciler::UPDATE.reconcile(arena, wip, current_first, new_child)?
    };
    arena.node_mut(wip).child = first;
    Ok(if first == INVALID { INVALID } else { first })
}
