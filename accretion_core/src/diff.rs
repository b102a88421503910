// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child reconciliation: diffing described children against the previous
//! generation's child nodes.
//!
//! Two variants share one implementation, selected by `track_side_effects`:
//! the mount variant only constructs nodes (a freshly assembled subtree is
//! attached wholesale by its root's placement), while the update variant
//! diffs against the current children and emits placement, deletion, and
//! move flags.
//!
//! Keyed lists use the classic two-phase walk: a parallel prefix scan while
//! keys line up, then a key→node map for the remainder. Move detection keeps
//! a single running maximum (`last_placed_index`) of reused old indices: a
//! reused node moves when its old index is below the maximum, i.e. something
//! already emitted used to sit to its right. This is deliberately **not** a
//! longest-increasing-subsequence solver — for reorders that are not a
//! rotated prefix it can emit more moves than strictly necessary, and that
//! trade-off is part of the algorithm's contract (tests pin its exact
//! output).
//!
//! Structural errors (a map value described as a child) are reported as
//! [`ReconcileError`] so callers decide how to recover; nothing here panics
//! on user input.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::element::{Child, Element, ElementKind, Key, PropValue};
use crate::flags::{CHILD_DELETION, PLACEMENT};
use crate::node::{
    ComponentProps, HostProps, INVALID, NodeArena, NodePayload, NodeTag,
};

/// Structural error surfaced while reconciling described children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// A described child is a non-renderable object; `kind` names what it
    /// actually was.
    InvalidChild {
        /// Kind name of the offending value (e.g. `"map"`).
        kind: &'static str,
    },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChild { kind } => {
                write!(
                    f,
                    "values of kind `{kind}` are not valid children; \
                     describe an element, text, or a list of children"
                )
            }
        }
    }
}

impl core::error::Error for ReconcileError {}

/// Lookup key for the remaining-children map: explicit key, else position.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum MapKey {
    Key(Key),
    Index(u32),
}

type ExistingChildren = BTreeMap<MapKey, u32>;

/// Child reconciler for one parent node.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChildReconciler {
    track_side_effects: bool,
}

impl ChildReconciler {
    /// Mount variant: construct only, no diffing flags.
    pub(crate) const MOUNT: Self = Self {
        track_side_effects: false,
    };

    /// Update variant: diff against current children and emit flags.
    pub(crate) const UPDATE: Self = Self {
        track_side_effects: true,
    };

    /// Reconciles `new_child` against the current children starting at
    /// `current_first`, linking the produced children under `return_node`.
    /// Returns the first new child, or [`INVALID`] if nothing renders.
    pub(crate) fn reconcile(
        &self,
        arena: &mut NodeArena,
        return_node: u32,
        current_first: u32,
        new_child: &Child,
    ) -> Result<u32, ReconcileError> {
        // An unkeyed top-level fragment is transparent: reconcile its
        // children directly so fragment wrappers don't defeat list diffing.
        if let Child::Element(element) = new_child
            && matches!(element.kind, ElementKind::Fragment)
            && element.key.is_none()
        {
            return self.reconcile_list(
                arena,
                return_node,
                current_first,
                &element.props.children,
            );
        }

        match new_child {
            Child::Element(element) => {
                let node = self.single_element(arena, return_node, current_first, element)?;
                Ok(self.place_single(arena, node))
            }
            Child::List(children) => {
                self.reconcile_list(arena, return_node, current_first, children)
            }
            Child::Value(value) => {
                if let Some(text) = value.as_text() {
                    let node = self.single_text(arena, return_node, current_first, text);
                    return Ok(self.place_single(arena, node));
                }
                match value {
                    // A list value is a list of value children.
                    PropValue::List(items) => {
                        let children: Vec<Child> =
                            items.iter().cloned().map(Child::Value).collect();
                        self.reconcile_list(arena, return_node, current_first, &children)
                    }
                    PropValue::Map(_) => Err(ReconcileError::InvalidChild {
                        kind: value.kind_name(),
                    }),
                    // Null, booleans, empty text: render nothing.
                    _ => {
                        self.delete_remaining(arena, return_node, current_first);
                        Ok(INVALID)
                    }
                }
            }
        }
    }

    // -- single-child reconciliation ------------------------------------

    fn single_element(
        &self,
        arena: &mut NodeArena,
        return_node: u32,
        current_first: u32,
        element: &Element,
    ) -> Result<u32, ReconcileError> {
        let mut child = current_first;
        while child != INVALID {
            let sibling = arena.node(child).sibling;
            if arena.node(child).key == element.key {
                // Keys are unique among siblings: this is the only reuse
                // candidate. A type mismatch invalidates every old child.
                if self.node_matches_element(arena, child, element) {
                    self.delete_remaining(arena, return_node, sibling);
                    let reused = self.reuse_node(arena, child, payload_for(element));
                    let node = arena.node_mut(reused);
                    node.parent = return_node;
                    return Ok(reused);
                }
                self.delete_remaining(arena, return_node, child);
                break;
            }
            // Key mismatch: this candidate can never match, drop it and keep
            // scanning.
            self.delete_child(arena, return_node, child);
            child = sibling;
        }

        let created = self.create_from_description(arena, element);
        arena.node_mut(created).parent = return_node;
        Ok(created)
    }

    fn single_text(
        &self,
        arena: &mut NodeArena,
        return_node: u32,
        current_first: u32,
        text: String,
    ) -> u32 {
        if current_first != INVALID && arena.node(current_first).tag == NodeTag::HostText {
            let sibling = arena.node(current_first).sibling;
            self.delete_remaining(arena, return_node, sibling);
            let reused = self.reuse_node(arena, current_first, NodePayload::Text(text));
            arena.node_mut(reused).parent = return_node;
            return reused;
        }
        self.delete_remaining(arena, return_node, current_first);
        let created = arena.create_text(text);
        arena.node_mut(created).parent = return_node;
        created
    }

    fn place_single(&self, arena: &mut NodeArena, node: u32) -> u32 {
        if self.track_side_effects && arena.node(node).alternate == INVALID {
            arena.node_mut(node).flags |= PLACEMENT;
        }
        node
    }

    // -- keyed list reconciliation --------------------------------------

    fn reconcile_list(
        &self,
        arena: &mut NodeArena,
        return_node: u32,
        current_first: u32,
        new_children: &[Child],
    ) -> Result<u32, ReconcileError> {
        let len = u32::try_from(new_children.len()).expect("child list exceeds u32 indices");
        let mut result_first = INVALID;
        let mut previous_new = INVALID;
        let mut old = current_first;
        let mut last_placed: u32 = 0;
        let mut new_idx: u32 = 0;

        // Phase 1: walk both lists in parallel while slots keep matching.
        while old != INVALID && new_idx < len {
            let next_old;
            if arena.node(old).index > new_idx {
                // Gap in the old list: hold the cursor until indices catch up.
                next_old = old;
                old = INVALID;
            } else {
                next_old = arena.node(old).sibling;
            }

            let Some(new_node) =
                self.update_slot(arena, old, &new_children[new_idx as usize])?
            else {
                if old == INVALID {
                    old = next_old;
                }
                break;
            };

            if self.track_side_effects
                && old != INVALID
                && arena.node(new_node).alternate == INVALID
            {
                // The slot produced a fresh node, so the old one is gone.
                self.delete_child(arena, return_node, old);
            }

            last_placed = self.place_child(arena, new_node, last_placed, new_idx);
            self.link_child(arena, return_node, &mut result_first, &mut previous_new, new_node);
            old = next_old;
            new_idx += 1;
        }

        // Phase 2: new list exhausted — everything left in the old list is
        // deleted.
        if new_idx == len {
            self.delete_remaining(arena, return_node, old);
            return Ok(result_first);
        }

        // Phase 3: old list exhausted — the rest is created and placed.
        if old == INVALID {
            while new_idx < len {
                if let Some(created) =
                    self.create_child(arena, &new_children[new_idx as usize])?
                {
                    last_placed = self.place_child(arena, created, last_placed, new_idx);
                    self.link_child(
                        arena,
                        return_node,
                        &mut result_first,
                        &mut previous_new,
                        created,
                    );
                }
                new_idx += 1;
            }
            return Ok(result_first);
        }

        // Phase 4: both lists have leftovers — map the old ones by key (or
        // index) and try to match each remaining new child.
        let mut existing = Self::map_remaining(arena, old);
        while new_idx < len {
            if let Some(new_node) = self.update_from_map(
                arena,
                &mut existing,
                new_idx,
                &new_children[new_idx as usize],
            )? {
                last_placed = self.place_child(arena, new_node, last_placed, new_idx);
                self.link_child(
                    arena,
                    return_node,
                    &mut result_first,
                    &mut previous_new,
                    new_node,
                );
            }
            new_idx += 1;
        }

        // Whatever is still in the map matched nothing.
        if self.track_side_effects {
            let leftovers: Vec<u32> = existing.into_values().collect();
            for child in leftovers {
                self.delete_child(arena, return_node, child);
            }
        }

        Ok(result_first)
    }

    /// Attempts to reuse `old` (may be [`INVALID`]) for `new_child` while
    /// slots still line up. `None` ends the parallel walk.
    fn update_slot(
        &self,
        arena: &mut NodeArena,
        old: u32,
        new_child: &Child,
    ) -> Result<Option<u32>, ReconcileError> {
        let old_key = if old == INVALID {
            None
        } else {
            arena.node(old).key.clone()
        };

        match new_child {
            Child::Value(value) => {
                if let Some(text) = value.as_text() {
                    // Text has no key; a keyed old slot cannot match it.
                    if old_key.is_some() {
                        return Ok(None);
                    }
                    return Ok(Some(self.update_text(arena, old, text)));
                }
                match value {
                    PropValue::List(items) => {
                        if old_key.is_some() {
                            return Ok(None);
                        }
                        let children: Vec<Child> =
                            items.iter().cloned().map(Child::Value).collect();
                        Ok(Some(self.update_fragment(arena, old, children, None)))
                    }
                    PropValue::Map(_) => Err(ReconcileError::InvalidChild {
                        kind: value.kind_name(),
                    }),
                    _ => Ok(None),
                }
            }
            Child::Element(element) => {
                if element.key == old_key {
                    Ok(Some(self.update_element(arena, old, element)))
                } else {
                    Ok(None)
                }
            }
            Child::List(children) => {
                if old_key.is_some() {
                    return Ok(None);
                }
                Ok(Some(self.update_fragment(arena, old, children.clone(), None)))
            }
        }
    }

    /// Looks up a reuse candidate for a remaining new child. `None` means
    /// the child renders nothing.
    fn update_from_map(
        &self,
        arena: &mut NodeArena,
        existing: &mut ExistingChildren,
        new_idx: u32,
        new_child: &Child,
    ) -> Result<Option<u32>, ReconcileError> {
        let (map_key, node) = match new_child {
            Child::Value(value) => {
                if let Some(text) = value.as_text() {
                    let key = MapKey::Index(new_idx);
                    let matched = existing.get(&key).copied().unwrap_or(INVALID);
                    (key, self.update_text(arena, matched, text))
                } else {
                    match value {
                        PropValue::List(items) => {
                            let key = MapKey::Index(new_idx);
                            let matched = existing.get(&key).copied().unwrap_or(INVALID);
                            let children: Vec<Child> =
                                items.iter().cloned().map(Child::Value).collect();
                            (key, self.update_fragment(arena, matched, children, None))
                        }
                        PropValue::Map(_) => {
                            return Err(ReconcileError::InvalidChild {
                                kind: value.kind_name(),
                            });
                        }
                        _ => return Ok(None),
                    }
                }
            }
            Child::Element(element) => {
                let key = element
                    .key
                    .clone()
                    .map_or(MapKey::Index(new_idx), MapKey::Key);
                let matched = existing.get(&key).copied().unwrap_or(INVALID);
                (key, self.update_element(arena, matched, element))
            }
            Child::List(children) => {
                let key = MapKey::Index(new_idx);
                let matched = existing.get(&key).copied().unwrap_or(INVALID);
                (key, self.update_fragment(arena, matched, children.clone(), None))
            }
        };

        if self.track_side_effects && arena.node(node).alternate != INVALID {
            // Reused: take the candidate out so the final sweep keeps it.
            existing.remove(&map_key);
        }
        Ok(Some(node))
    }

    fn update_element(&self, arena: &mut NodeArena, old: u32, element: &Element) -> u32 {
        if let ElementKind::Fragment = element.kind {
            return self.update_fragment(
                arena,
                old,
                element.props.children.clone(),
                element.key.clone(),
            );
        }
        if old != INVALID && self.node_matches_element(arena, old, element) {
            return self.reuse_node(arena, old, payload_for(element));
        }
        self.create_from_description(arena, element)
    }

    fn update_fragment(
        &self,
        arena: &mut NodeArena,
        old: u32,
        children: Vec<Child>,
        key: Option<Key>,
    ) -> u32 {
        if old == INVALID || arena.node(old).tag != NodeTag::Fragment {
            arena.create_fragment(children, key)
        } else {
            self.reuse_node(arena, old, NodePayload::Fragment(children))
        }
    }

    fn update_text(&self, arena: &mut NodeArena, old: u32, text: String) -> u32 {
        if old == INVALID || arena.node(old).tag != NodeTag::HostText {
            arena.create_text(text)
        } else {
            self.reuse_node(arena, old, NodePayload::Text(text))
        }
    }

    /// Creates a node for a remaining new child; `None` renders nothing.
    fn create_child(
        &self,
        arena: &mut NodeArena,
        new_child: &Child,
    ) -> Result<Option<u32>, ReconcileError> {
        match new_child {
            Child::Value(value) => {
                if let Some(text) = value.as_text() {
                    return Ok(Some(arena.create_text(text)));
                }
                match value {
                    PropValue::List(items) => {
                        let children: Vec<Child> =
                            items.iter().cloned().map(Child::Value).collect();
                        Ok(Some(arena.create_fragment(children, None)))
                    }
                    PropValue::Map(_) => Err(ReconcileError::InvalidChild {
                        kind: value.kind_name(),
                    }),
                    _ => Ok(None),
                }
            }
            Child::Element(element) => Ok(Some(self.create_from_description(arena, element))),
            Child::List(children) => Ok(Some(arena.create_fragment(children.clone(), None))),
        }
    }

    // -- placement ------------------------------------------------------

    /// Records `new_idx` on the node and decides whether a reused node
    /// moved. Returns the updated running maximum of reused old indices.
    fn place_child(&self, arena: &mut NodeArena, node: u32, last_placed: u32, new_idx: u32) -> u32 {
        arena.node_mut(node).index = new_idx;
        if !self.track_side_effects {
            return last_placed;
        }
        let current = arena.node(node).alternate;
        if current != INVALID {
            let old_index = arena.node(current).index;
            if old_index < last_placed {
                // Something already emitted used to be to this node's right.
                arena.node_mut(node).flags |= PLACEMENT;
                last_placed
            } else {
                old_index
            }
        } else {
            arena.node_mut(node).flags |= PLACEMENT;
            last_placed
        }
    }

    fn link_child(
        &self,
        arena: &mut NodeArena,
        return_node: u32,
        result_first: &mut u32,
        previous_new: &mut u32,
        node: u32,
    ) {
        arena.node_mut(node).parent = return_node;
        if *previous_new == INVALID {
            *result_first = node;
        } else {
            arena.node_mut(*previous_new).sibling = node;
        }
        *previous_new = node;
    }

    // -- deletion bookkeeping -------------------------------------------

    fn delete_child(&self, arena: &mut NodeArena, return_node: u32, child: u32) {
        if !self.track_side_effects {
            return;
        }
        let node = arena.node_mut(return_node);
        node.deletions.push(child);
        node.flags |= CHILD_DELETION;
    }

    fn delete_remaining(&self, arena: &mut NodeArena, return_node: u32, first: u32) {
        if !self.track_side_effects {
            return;
        }
        let mut child = first;
        while child != INVALID {
            let sibling = arena.node(child).sibling;
            self.delete_child(arena, return_node, child);
            child = sibling;
        }
    }

    // -- node construction helpers --------------------------------------

    fn node_matches_element(&self, arena: &NodeArena, node: u32, element: &Element) -> bool {
        let node = arena.node(node);
        match (&element.kind, &node.pending) {
            (ElementKind::Host(kind), NodePayload::Host(props)) => *kind == props.kind,
            (ElementKind::Component(func), NodePayload::Component(props)) => {
                alloc::rc::Rc::ptr_eq(func, &props.func)
            }
            (ElementKind::Fragment, NodePayload::Fragment(_)) => true,
            _ => false,
        }
    }

    /// Clones the old node into its work-in-progress generation carrying the
    /// new description, detached from its old siblings.
    fn reuse_node(&self, arena: &mut NodeArena, old: u32, payload: NodePayload) -> u32 {
        let wip = arena.create_work_in_progress(old, payload);
        let node = arena.node_mut(wip);
        node.index = 0;
        node.sibling = INVALID;
        wip
    }

    fn create_from_description(&self, arena: &mut NodeArena, element: &Element) -> u32 {
        if let ElementKind::Fragment = element.kind {
            arena.create_fragment(element.props.children.clone(), element.key.clone())
        } else {
            arena.create_from_element(element.clone())
        }
    }

    fn map_remaining(arena: &NodeArena, first: u32) -> ExistingChildren {
        let mut existing = ExistingChildren::new();
        let mut child = first;
        while child != INVALID {
            let node = arena.node(child);
            let key = node
                .key
                .clone()
                .map_or(MapKey::Index(node.index), MapKey::Key);
            existing.insert(key, child);
            child = node.sibling;
        }
        existing
    }
}

/// The work-node payload a (non-fragment) element describes.
fn payload_for(element: &Element) -> NodePayload {
    match &element.kind {
        ElementKind::Host(kind) => NodePayload::Host(HostProps {
            kind: kind.clone(),
            attrs: element.props.attrs.clone(),
            children: element.props.children.clone(),
            host_ref: element.host_ref.clone(),
        }),
        ElementKind::Component(func) => NodePayload::Component(ComponentProps {
            func: func.clone(),
            props: element.props.clone(),
        }),
        ElementKind::Fragment => NodePayload::Fragment(element.props.children.clone()),
    }
}
