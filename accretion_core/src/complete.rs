// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The bottom-up ("complete") phase of one work-loop step.
//!
//! For host nodes this phase materializes or diffs the host payload: a
//! first-time node creates its host object and assembles its nearest host
//! descendants into it off-screen, so a whole new subtree later attaches
//! with a single placement at its root. A reused node compares old and new
//! payloads and marks [`UPDATE`] only when they differ, which is what makes
//! re-rendering an unchanged tree produce zero mutation flags.
//!
//! Every tag ends by bubbling flags: the node's `subtree_flags` absorbs each
//! child's own and subtree flags, and the children's transient parent links
//! are refreshed for the commit walk.

use crate::element::RefValue;
use crate::flags::{REF, UPDATE};
use crate::host::RenderHost;
use crate::node::{INVALID, NodeArena, NodePayload, NodeTag};

/// Runs the complete phase on `wip`.
pub(crate) fn complete_work(arena: &mut NodeArena, wip: u32, host: &mut dyn RenderHost) {
    match arena.node(wip).tag {
        NodeTag::HostElement => complete_host_element(arena, wip, host),
        NodeTag::HostText => complete_host_text(arena, wip, host),
        NodeTag::HostRoot | NodeTag::Component | NodeTag::Fragment => {}
    }
    bubble_properties(arena, wip);
}

fn complete_host_element(arena: &mut NodeArena, wip: u32, host: &mut dyn RenderHost) {
    let node = arena.node(wip);
    let NodePayload::Host(new_props) = node.pending.clone() else {
        return;
    };

    if node.alternate != INVALID && node.host.is_some() {
        // Reused node: diff committed props against the new description.
        let old = match &node.memoized {
            Some(NodePayload::Host(props)) => Some(props.clone()),
            _ => None,
        };
        let attrs_changed = old.as_ref().is_none_or(|old| old.attrs != new_props.attrs);
        let ref_changed = !RefValue::same_opt(
            old.as_ref().and_then(|old| old.host_ref.as_ref()),
            new_props.host_ref.as_ref(),
        );

        let node = arena.node_mut(wip);
        if attrs_changed {
            node.flags |= UPDATE;
        }
        if ref_changed {
            node.flags |= REF;
        }
    } else {
        // Fresh node: build the host object and assemble its host-level
        // children while the subtree is still detached.
        let instance = host.create_instance(&new_props.kind, &new_props.attrs);
        arena.node_mut(wip).host = Some(instance);
        append_all_children(arena, wip, instance, host);
        if new_props.host_ref.is_some() {
            arena.node_mut(wip).flags |= REF;
        }
    }
}

fn complete_host_text(arena: &mut NodeArena, wip: u32, host: &mut dyn RenderHost) {
    let node = arena.node(wip);
    let NodePayload::Text(new_text) = node.pending.clone() else {
        return;
    };

    if node.alternate != INVALID && node.host.is_some() {
        let old_text = match &node.memoized {
            Some(NodePayload::Text(text)) => Some(text.as_str()),
            _ => None,
        };
        if old_text != Some(new_text.as_str()) {
            arena.node_mut(wip).flags |= UPDATE;
        }
    } else {
        let instance = host.create_text(&new_text);
        arena.node_mut(wip).host = Some(instance);
    }
}

/// Appends the nearest host descendants of `wip` into `instance`, skipping
/// over components and fragments.
fn append_all_children(arena: &mut NodeArena, wip: u32, instance: crate::host::HostHandle, host: &mut dyn RenderHost) {
    let mut node = arena.node(wip).child;

    while node != INVALID {
        let current = arena.node(node);
        if current.is_host() {
            if let Some(child_host) = current.host {
                host.append_initial_child(instance, child_host);
            }
        } else if current.child != INVALID {
            let child = current.child;
            arena.node_mut(child).parent = node;
            node = child;
            continue;
        }

        if node == wip {
            return;
        }

        while arena.node(node).sibling == INVALID {
            let parent = arena.node(node).parent;
            if parent == INVALID || parent == wip {
                return;
            }
            node = parent;
        }
        let parent = arena.node(node).parent;
        let sibling = arena.node(node).sibling;
        arena.node_mut(sibling).parent = parent;
        node = sibling;
    }
}

/// Bubbles children's flags into `wip.subtree_flags` and refreshes their
/// parent links for the commit walk.
fn bubble_properties(arena: &mut NodeArena, wip: u32) {
    let mut subtree = 0;
    let mut child = arena.node(wip).child;
    while child != INVALID {
        let node = arena.node_mut(child);
        subtree |= node.subtree_flags | node.flags;
        node.parent = wip;
        child = node.sibling;
    }
    arena.node_mut(wip).subtree_flags |= subtree;
}
