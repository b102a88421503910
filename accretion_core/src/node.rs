// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Work-node arena.
//!
//! A [`WorkNode`] records one tree position for one generation of the render
//! tree. Nodes live in a [`NodeArena`]: a flat `Vec` of slots addressed by
//! `u32` index, with a free list recycling the slots of deleted nodes and
//! [`INVALID`] as the null link. Tree structure is explicit
//! (`parent`/`child`/`sibling` links), so every traversal is iterative.
//!
//! Each position has at most two live generations: the *current* node
//! (committed) and its *alternate* (work in progress). The pair is created
//! lazily by [`NodeArena::create_work_in_progress`] and then reused for
//! every later render — the two slots alias the same position forever, and
//! "swapping the trees" is just the root container pointing its `current`
//! at the other index.
//!
//! The `parent` link is transient: it is (re)assigned while a pass walks the
//! tree and is only meaningful for nodes reachable from the pass that wrote
//! it. Nothing persists it across passes for inactive nodes.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::element::{Child, ComponentFn, Element, ElementKind, Key, PropMap, Props, RefValue};
use crate::flags::{Flags, NO_FLAGS};
use crate::hooks::{Effect, Hook};
use crate::host::HostHandle;
use crate::update::SharedQueue;

/// Null node link.
pub const INVALID: u32 = u32::MAX;

/// What kind of tree position a node is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeTag {
    /// The container-owned root of a tree.
    HostRoot,
    /// A host element with a materialized host object.
    HostElement,
    /// A host text leaf.
    HostText,
    /// A user component.
    Component,
    /// A grouping node with no host presence.
    Fragment,
}

/// Host-element payload: kind, attributes, children, and ref.
#[derive(Clone, Debug)]
pub struct HostProps {
    /// Host kind string (e.g. `"div"`).
    pub kind: String,
    /// Attributes to diff against the previous generation.
    pub attrs: PropMap,
    /// Described children.
    pub children: Vec<Child>,
    /// Ref to attach to the host object.
    pub host_ref: Option<RefValue>,
}

/// Component payload: the render callback plus its described props.
#[derive(Clone)]
pub struct ComponentProps {
    /// Render callback; identity is reuse identity.
    pub func: ComponentFn,
    /// Props passed to the callback.
    pub props: Props,
}

impl core::fmt::Debug for ComponentProps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComponentProps")
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}

/// The described payload of a node, by tag.
#[derive(Clone, Debug)]
pub enum NodePayload {
    /// Host roots have no description of their own.
    Root,
    /// Host element description.
    Host(HostProps),
    /// Text content.
    Text(String),
    /// Component description.
    Component(ComponentProps),
    /// Fragment children.
    Fragment(Vec<Child>),
}

/// Per-node persisted state, by tag.
#[derive(Clone, Debug, Default)]
pub enum NodeState {
    /// No state.
    #[default]
    None,
    /// The root's processed element (result of replaying its update queue).
    Root(Option<Element>),
    /// A component's hook chain, in call order.
    Hooks(Vec<Hook>),
}

/// One tree-position record for one generation of the render tree.
#[derive(Debug)]
pub struct WorkNode {
    /// Node kind.
    pub tag: NodeTag,
    /// Stable identity among siblings.
    pub key: Option<Key>,
    /// Description for the in-progress render.
    pub pending: NodePayload,
    /// Description as of the last completed render of this node.
    pub memoized: Option<NodePayload>,
    /// Materialized host object, once created.
    pub host: Option<HostHandle>,
    /// Transient DFS return link (see module docs).
    pub parent: u32,
    /// First child.
    pub child: u32,
    /// Next sibling.
    pub sibling: u32,
    /// Position among siblings; input to move detection.
    pub index: u32,
    /// Pending effect flags for this node.
    pub flags: Flags,
    /// Aggregate of descendant flags, bubbled during the complete phase.
    pub subtree_flags: Flags,
    /// Children of the previous generation marked for deletion.
    pub deletions: Vec<u32>,
    /// The other generation of this position, or [`INVALID`].
    pub alternate: u32,
    /// Persisted state (root element or hook chain).
    pub state: NodeState,
    /// Effect records produced by the latest render, in declaration order.
    pub effects: Vec<Rc<Effect>>,
    /// Root-level update queue (host roots only).
    pub root_queue: Option<SharedQueue<Option<Element>>>,
    /// Owning container index (host roots only).
    pub root_id: u32,
}

impl WorkNode {
    /// Creates a fresh, unlinked node.
    #[must_use]
    pub fn new(tag: NodeTag, pending: NodePayload, key: Option<Key>) -> Self {
        Self {
            tag,
            key,
            pending,
            memoized: None,
            host: None,
            parent: INVALID,
            child: INVALID,
            sibling: INVALID,
            index: 0,
            flags: NO_FLAGS,
            subtree_flags: NO_FLAGS,
            deletions: Vec::new(),
            alternate: INVALID,
            state: NodeState::None,
            effects: Vec::new(),
            root_queue: None,
            root_id: INVALID,
        }
    }

    /// Returns whether this node owns a host object (element or text).
    #[must_use]
    pub fn is_host(&self) -> bool {
        matches!(self.tag, NodeTag::HostElement | NodeTag::HostText)
    }

    /// The ref described for this node, if it is a host element.
    #[must_use]
    pub fn host_ref(&self) -> Option<&RefValue> {
        match &self.pending {
            NodePayload::Host(props) => props.host_ref.as_ref(),
            _ => None,
        }
    }

    fn tombstone() -> Self {
        Self::new(NodeTag::Fragment, NodePayload::Fragment(Vec::new()), None)
    }
}

/// Flat slot storage for work nodes with free-list recycling.
///
/// While a render pass is in flight the arena tracks its allocations, so a
/// discarded pass (preempted or failed) can return its unpaired nodes to
/// the free list instead of leaking them. Paired alternates survive a
/// discard — they are owned by their tree position, not by the pass that
/// created them.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<WorkNode>,
    free_list: Vec<u32>,
    pass_tracking: bool,
    pass_allocations: Vec<u32>,
}

impl NodeArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots currently in use.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Borrows the node at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is [`INVALID`] or out of range.
    #[must_use]
    pub fn node(&self, idx: u32) -> &WorkNode {
        assert!(idx != INVALID, "dereferenced INVALID node link");
        &self.nodes[idx as usize]
    }

    /// Mutably borrows the node at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is [`INVALID`] or out of range.
    pub fn node_mut(&mut self, idx: u32) -> &mut WorkNode {
        assert!(idx != INVALID, "dereferenced INVALID node link");
        &mut self.nodes[idx as usize]
    }

    /// Stores `node` in a recycled or new slot and returns its index.
    pub fn alloc(&mut self, node: WorkNode) -> u32 {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.nodes[idx as usize] = node;
            idx
        } else {
            let idx = u32::try_from(self.nodes.len()).expect("node arena exceeded u32 indices");
            self.nodes.push(node);
            idx
        };
        if self.pass_tracking {
            self.pass_allocations.push(idx);
        }
        idx
    }

    /// Starts tracking allocations for a new render pass.
    pub fn begin_pass(&mut self) {
        self.pass_tracking = true;
        self.pass_allocations.clear();
    }

    /// Ends tracking for a pass whose tree was committed; its allocations
    /// are now owned by the tree.
    pub fn commit_pass(&mut self) {
        self.pass_tracking = false;
        self.pass_allocations.clear();
    }

    /// Releases the unpaired nodes allocated by a discarded pass and stops
    /// tracking. Returns how many slots were reclaimed.
    pub fn reclaim_abandoned(&mut self) -> usize {
        self.pass_tracking = false;
        let allocations = core::mem::take(&mut self.pass_allocations);
        let mut reclaimed = 0;
        for idx in allocations {
            if self.nodes[idx as usize].alternate == INVALID {
                self.free(idx);
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Releases the slot at `idx`, dropping the node's payload and state.
    ///
    /// The caller is responsible for having unlinked the node first; links
    /// into a freed slot are a logic error.
    pub fn free(&mut self, idx: u32) {
        debug_assert!(
            !self.free_list.contains(&idx),
            "node {idx} freed twice"
        );
        self.nodes[idx as usize] = WorkNode::tombstone();
        self.free_list.push(idx);
    }

    /// Creates the root node for a new container.
    ///
    /// Root nodes are owned by their container, never by a render pass, so
    /// this bypasses pass-allocation tracking even if a pass is suspended.
    pub fn create_host_root(
        &mut self,
        root_id: u32,
        queue: SharedQueue<Option<Element>>,
    ) -> u32 {
        let mut node = WorkNode::new(NodeTag::HostRoot, NodePayload::Root, None);
        node.root_queue = Some(queue);
        node.root_id = root_id;
        node.state = NodeState::Root(None);

        let tracking = core::mem::replace(&mut self.pass_tracking, false);
        let idx = self.alloc(node);
        self.pass_tracking = tracking;
        idx
    }

    /// Creates a node from an element description.
    pub fn create_from_element(&mut self, element: Element) -> u32 {
        let Element {
            kind,
            key,
            host_ref,
            props,
        } = element;
        let node = match kind {
            ElementKind::Host(host_kind) => WorkNode::new(
                NodeTag::HostElement,
                NodePayload::Host(HostProps {
                    kind: host_kind,
                    attrs: props.attrs,
                    children: props.children,
                    host_ref,
                }),
                key,
            ),
            ElementKind::Component(func) => WorkNode::new(
                NodeTag::Component,
                NodePayload::Component(ComponentProps { func, props }),
                key,
            ),
            ElementKind::Fragment => {
                WorkNode::new(NodeTag::Fragment, NodePayload::Fragment(props.children), key)
            }
        };
        self.alloc(node)
    }

    /// Creates a text node.
    pub fn create_text(&mut self, content: String) -> u32 {
        self.alloc(WorkNode::new(
            NodeTag::HostText,
            NodePayload::Text(content),
            None,
        ))
    }

    /// Creates a fragment node wrapping `children`.
    pub fn create_fragment(&mut self, children: Vec<Child>, key: Option<Key>) -> u32 {
        self.alloc(WorkNode::new(
            NodeTag::Fragment,
            NodePayload::Fragment(children),
            key,
        ))
    }

    /// Returns the work-in-progress generation for `current`, pairing a new
    /// alternate on first use and resetting the existing one otherwise.
    ///
    /// The returned node starts from the current generation's committed
    /// state (host object, memoized payload, state, child link) with
    /// `pending` as its new description and cleared effect bookkeeping.
    pub fn create_work_in_progress(&mut self, current: u32, pending: NodePayload) -> u32 {
        let wip = self.node(current).alternate;
        let wip = if wip == INVALID {
            // First update of this position: pair the alternates for good.
            let cur = self.node(current);
            let mut node = WorkNode::new(cur.tag, pending, cur.key.clone());
            node.host = cur.host;
            node.alternate = current;
            node.root_id = cur.root_id;
            let idx = self.alloc(node);
            self.node_mut(current).alternate = idx;
            idx
        } else {
            let node = self.node_mut(wip);
            node.pending = pending;
            node.flags = NO_FLAGS;
            node.subtree_flags = NO_FLAGS;
            node.deletions.clear();
            wip
        };

        // Start the new generation from the committed snapshot.
        let (memoized, state, effects, root_queue, host, child, key) = {
            let cur = self.node(current);
            (
                cur.memoized.clone(),
                cur.state.clone(),
                cur.effects.clone(),
                cur.root_queue.clone(),
                cur.host,
                cur.child,
                cur.key.clone(),
            )
        };
        let node = self.node_mut(wip);
        node.memoized = memoized;
        node.state = state;
        node.effects = effects;
        node.root_queue = root_queue;
        node.host = host;
        node.child = child;
        node.key = key;
        wip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::shared_queue;
    use alloc::string::ToString;

    #[test]
    fn alloc_recycles_freed_slots() {
        let mut arena = NodeArena::new();
        let a = arena.create_text("a".to_string());
        let b = arena.create_text("b".to_string());
        assert_ne!(a, b);
        assert_eq!(arena.live_count(), 2);

        arena.free(a);
        assert_eq!(arena.live_count(), 1);

        let c = arena.create_text("c".to_string());
        assert_eq!(c, a, "freed slot should be reused");
        assert_eq!(arena.live_count(), 2);
    }

    #[test]
    fn create_work_in_progress_pairs_alternates_once() {
        let mut arena = NodeArena::new();
        let queue = shared_queue();
        let current = arena.create_host_root(0, queue);

        let wip = arena.create_work_in_progress(current, NodePayload::Root);
        assert_eq!(arena.node(current).alternate, wip);
        assert_eq!(arena.node(wip).alternate, current);

        // A later pass reuses the same slot rather than allocating.
        let wip2 = arena.create_work_in_progress(current, NodePayload::Root);
        assert_eq!(wip2, wip);
        assert_eq!(arena.live_count(), 2);
    }

    #[test]
    fn work_in_progress_starts_from_committed_snapshot() {
        let mut arena = NodeArena::new();
        let current = arena.create_from_element(Element::host("div").attr("title", "x"));
        arena.node_mut(current).host = Some(crate::host::HostHandle(7));
        arena.node_mut(current).memoized = Some(arena.node(current).pending.clone());

        let wip = arena.create_work_in_progress(
            current,
            NodePayload::Host(HostProps {
                kind: "div".to_string(),
                attrs: PropMap::new(),
                children: Vec::new(),
                host_ref: None,
            }),
        );
        let node = arena.node(wip);
        assert_eq!(node.host, Some(crate::host::HostHandle(7)));
        assert!(node.memoized.is_some());
        assert_eq!(node.flags, NO_FLAGS);
        assert_eq!(node.tag, NodeTag::HostElement);
    }

    #[test]
    fn element_kinds_map_to_tags() {
        let mut arena = NodeArena::new();
        let host = arena.create_from_element(Element::host("span"));
        let frag = arena.create_from_element(Element::fragment(Vec::new()));
        let comp = arena.create_from_element(Element::component(crate::element::component_fn(
            |_, _| Child::empty(),
        )));
        assert_eq!(arena.node(host).tag, NodeTag::HostElement);
        assert_eq!(arena.node(frag).tag, NodeTag::Fragment);
        assert_eq!(arena.node(comp).tag, NodeTag::Component);
    }

    #[test]
    #[should_panic(expected = "dereferenced INVALID node link")]
    fn invalid_link_panics() {
        let arena = NodeArena::new();
        let _ = arena.node(INVALID);
    }

    #[test]
    fn discarded_pass_reclaims_unpaired_allocations() {
        let mut arena = NodeArena::new();
        let committed = arena.create_text("committed".to_string());

        arena.begin_pass();
        let _fresh = arena.create_text("fresh".to_string());
        let paired = arena.create_work_in_progress(committed, NodePayload::Text("x".into()));
        assert_eq!(arena.live_count(), 3);

        // The fresh node goes back to the free list; the paired alternate is
        // owned by its position and survives.
        assert_eq!(arena.reclaim_abandoned(), 1);
        assert_eq!(arena.live_count(), 2);
        assert_eq!(arena.node(committed).alternate, paired);
    }

    #[test]
    fn committed_pass_keeps_its_allocations() {
        let mut arena = NodeArena::new();
        arena.begin_pass();
        let fresh = arena.create_text("kept".to_string());
        arena.commit_pass();
        assert_eq!(arena.reclaim_abandoned(), 0);
        assert_eq!(arena.live_count(), 1);
        let _ = arena.node(fresh);
    }
}
