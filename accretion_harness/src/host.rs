// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory recording host adapter.
//!
//! [`RecordingHost`] materializes host objects as records in a map and
//! mirrors the child-list semantics a real surface would have: appends move
//! an already-mounted child to the end, inserts place it before an anchor,
//! removals detach it. Every call is also logged as a [`HostOp`] so tests
//! can assert the exact mutation sequence — including that an unchanged
//! re-render performs none.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write as _;

use accretion_core::HostHandle;
use accretion_core::element::PropMap;
use accretion_core::host::RenderHost;

/// One recorded host operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    /// `create_instance` produced this handle.
    Create(u64),
    /// `create_text` produced this handle.
    CreateText(u64),
    /// Off-screen assembly append.
    AppendInitial {
        /// Parent handle.
        parent: u64,
        /// Child handle.
        child: u64,
    },
    /// Attached-tree append (placement without an anchor).
    Append {
        /// Parent handle.
        parent: u64,
        /// Child handle.
        child: u64,
    },
    /// Attached-tree insert or move before an anchor.
    InsertBefore {
        /// Parent handle.
        parent: u64,
        /// Child handle.
        child: u64,
        /// Anchor handle.
        before: u64,
    },
    /// Child detached from its parent.
    Remove {
        /// Parent handle.
        parent: u64,
        /// Child handle.
        child: u64,
    },
    /// Instance attributes replaced.
    UpdateInstance(u64),
    /// Text content replaced.
    UpdateText(u64),
}

#[derive(Clone, Debug)]
enum Record {
    Container {
        children: Vec<u64>,
    },
    Instance {
        kind: String,
        attrs: PropMap,
        children: Vec<u64>,
    },
    Text(String),
}

/// A [`RenderHost`] recording the full host tree and operation log.
#[derive(Debug, Default)]
pub struct RecordingHost {
    records: BTreeMap<u64, Record>,
    next: u64,
    sync_requests: u32,
    ops: Vec<HostOp>,
}

impl RecordingHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a container handle (the mount point a root renders into).
    pub fn create_container(&mut self) -> HostHandle {
        let handle = self.fresh();
        self.records
            .insert(handle, Record::Container { children: Vec::new() });
        HostHandle(handle)
    }

    /// Consumes an outstanding sync-flush request, if one is pending.
    pub fn take_sync_request(&mut self) -> bool {
        if self.sync_requests > 0 {
            self.sync_requests = 0;
            true
        } else {
            false
        }
    }

    /// The operation log so far.
    #[must_use]
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Drains the operation log (typically after a mount, so a test asserts
    /// only the following update's mutations).
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        core::mem::take(&mut self.ops)
    }

    /// Number of instances and text nodes created so far.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, HostOp::Create(_) | HostOp::CreateText(_)))
            .count()
    }

    /// Child handles of a container or instance, in document order.
    #[must_use]
    pub fn children_of(&self, parent: HostHandle) -> Vec<HostHandle> {
        match self.records.get(&parent.0) {
            Some(Record::Container { children } | Record::Instance { children, .. }) => {
                children.iter().map(|&c| HostHandle(c)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Text content of a text node.
    #[must_use]
    pub fn text_of(&self, handle: HostHandle) -> Option<&str> {
        match self.records.get(&handle.0) {
            Some(Record::Text(content)) => Some(content),
            _ => None,
        }
    }

    /// Kind string of an instance.
    #[must_use]
    pub fn kind_of(&self, handle: HostHandle) -> Option<&str> {
        match self.records.get(&handle.0) {
            Some(Record::Instance { kind, .. }) => Some(kind),
            _ => None,
        }
    }

    /// Current attributes of an instance.
    #[must_use]
    pub fn attrs_of(&self, handle: HostHandle) -> Option<&PropMap> {
        match self.records.get(&handle.0) {
            Some(Record::Instance { attrs, .. }) => Some(attrs),
            _ => None,
        }
    }

    /// Renders the subtree under `handle` as a compact one-line string:
    /// instances as `kind(child, child)`, text as `"content"`.
    #[must_use]
    pub fn tree_to_string(&self, handle: HostHandle) -> String {
        let mut out = String::new();
        self.write_node(handle.0, &mut out);
        out
    }

    fn write_node(&self, handle: u64, out: &mut String) {
        match self.records.get(&handle) {
            Some(Record::Text(content)) => {
                let _ = write!(out, "\"{content}\"");
            }
            Some(Record::Instance { kind, children, .. }) => {
                let _ = write!(out, "{kind}(");
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_node(child, out);
                }
                out.push(')');
            }
            Some(Record::Container { children }) => {
                out.push('[');
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_node(child, out);
                }
                out.push(']');
            }
            None => out.push('?'),
        }
    }

    fn fresh(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    fn children_mut(&mut self, parent: u64) -> Option<&mut Vec<u64>> {
        match self.records.get_mut(&parent) {
            Some(Record::Container { children } | Record::Instance { children, .. }) => {
                Some(children)
            }
            _ => None,
        }
    }
}

impl RenderHost for RecordingHost {
    fn create_instance(&mut self, kind: &str, attrs: &PropMap) -> HostHandle {
        let handle = self.fresh();
        self.records.insert(
            handle,
            Record::Instance {
                kind: kind.to_string(),
                attrs: attrs.clone(),
                children: Vec::new(),
            },
        );
        self.ops.push(HostOp::Create(handle));
        HostHandle(handle)
    }

    fn create_text(&mut self, content: &str) -> HostHandle {
        let handle = self.fresh();
        self.records
            .insert(handle, Record::Text(content.to_string()));
        self.ops.push(HostOp::CreateText(handle));
        HostHandle(handle)
    }

    fn append_initial_child(&mut self, parent: HostHandle, child: HostHandle) {
        if let Some(children) = self.children_mut(parent.0) {
            children.push(child.0);
        }
        self.ops.push(HostOp::AppendInitial {
            parent: parent.0,
            child: child.0,
        });
    }

    fn append_child(&mut self, parent: HostHandle, child: HostHandle) {
        if let Some(children) = self.children_mut(parent.0) {
            children.retain(|&c| c != child.0);
            children.push(child.0);
        }
        self.ops.push(HostOp::Append {
            parent: parent.0,
            child: child.0,
        });
    }

    fn insert_child_before(&mut self, parent: HostHandle, child: HostHandle, before: HostHandle) {
        if let Some(children) = self.children_mut(parent.0) {
            children.retain(|&c| c != child.0);
            let at = children
                .iter()
                .position(|&c| c == before.0)
                .unwrap_or(children.len());
            children.insert(at, child.0);
        }
        self.ops.push(HostOp::InsertBefore {
            parent: parent.0,
            child: child.0,
            before: before.0,
        });
    }

    fn remove_child(&mut self, parent: HostHandle, child: HostHandle) {
        if let Some(children) = self.children_mut(parent.0) {
            children.retain(|&c| c != child.0);
        }
        self.ops.push(HostOp::Remove {
            parent: parent.0,
            child: child.0,
        });
    }

    fn commit_instance_update(&mut self, instance: HostHandle, attrs: &PropMap) {
        if let Some(Record::Instance {
            attrs: stored, ..
        }) = self.records.get_mut(&instance.0)
        {
            *stored = attrs.clone();
        }
        self.ops.push(HostOp::UpdateInstance(instance.0));
    }

    fn commit_text_update(&mut self, text: HostHandle, content: &str) {
        if let Some(Record::Text(stored)) = self.records.get_mut(&text.0) {
            *stored = content.to_string();
        }
        self.ops.push(HostOp::UpdateText(text.0));
    }

    fn request_sync_flush(&mut self) {
        self.sync_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_moves_an_existing_child() {
        let mut host = RecordingHost::new();
        let container = host.create_container();
        let a = host.create_instance("a", &PropMap::new());
        let b = host.create_instance("b", &PropMap::new());
        let c = host.create_instance("c", &PropMap::new());
        host.append_child(container, a);
        host.append_child(container, b);
        host.append_child(container, c);

        // Move c before a.
        host.insert_child_before(container, c, a);
        let order: Vec<u64> = host.children_of(container).iter().map(|h| h.0).collect();
        assert_eq!(order, [c.0, a.0, b.0]);
    }

    #[test]
    fn append_moves_to_the_end() {
        let mut host = RecordingHost::new();
        let container = host.create_container();
        let a = host.create_instance("a", &PropMap::new());
        let b = host.create_instance("b", &PropMap::new());
        host.append_child(container, a);
        host.append_child(container, b);

        host.append_child(container, a);
        let order: Vec<u64> = host.children_of(container).iter().map(|h| h.0).collect();
        assert_eq!(order, [b.0, a.0]);
    }

    #[test]
    fn tree_to_string_renders_nesting() {
        let mut host = RecordingHost::new();
        let container = host.create_container();
        let div = host.create_instance("div", &PropMap::new());
        let text = host.create_text("hi");
        host.append_initial_child(div, text);
        host.append_child(container, div);
        assert_eq!(host.tree_to_string(container), "[div(\"hi\")]");
    }

    #[test]
    fn sync_requests_are_consumed_once() {
        let mut host = RecordingHost::new();
        assert!(!host.take_sync_request());
        host.request_sync_flush();
        host.request_sync_flush();
        assert!(host.take_sync_request());
        assert!(!host.take_sync_request());
    }
}
