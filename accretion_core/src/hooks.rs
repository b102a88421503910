// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hook-chain bookkeeping for component nodes.
//!
//! A component's render callback receives a [`HookContext`] scoped to the
//! render pass. The context walks the node's persisted hook chain (a `Vec`
//! rebuilt every render, in call order) and dispatches each hook call to its
//! mount or update behavior — the phase is chosen once per pass from whether
//! the node has a current-generation alternate, never from ambient state.
//!
//! Hook calls must be unconditional: an update pass that requests more hooks
//! than the previous render persisted is a broken render-determinism
//! contract and panics.
//!
//! # State dispatch
//!
//! [`HookContext::use_state`] hands back an [`Updater`]. Dispatching through
//! it enqueues onto the hook's shared queue and records the owning root in a
//! shared [`DispatchInbox`]; the reconciler drains the inbox at its entry
//! points and schedules the affected roots. State updates are therefore
//! never applied eagerly — they replay during the next render of the node,
//! priority-filtered by lane (see [`crate::update`]).
//!
//! Update-queue merging happens on the **current** generation's hook before
//! processing, so a work-in-progress tree that is later abandoned cannot
//! lose updates.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::element::{Child, PropValue, RefObject, RefValue};
use crate::flags::{Flags, HOOK_HAS_EFFECT, HOOK_PASSIVE, HookFlags, NO_FLAGS, PASSIVE};
use crate::lane::{DEFAULT_LANE, Lane, TRANSITION_LANE};
use crate::node::{NodeArena, NodePayload, NodeState};
use crate::update::{SharedQueue, Update, UpdatePayload, process_update_queue, shared_queue};

/// Dynamically typed hook state.
pub type StateValue = Rc<dyn Any>;

/// Cleanup returned by an effect's create callback.
pub type EffectCleanup = Box<dyn FnOnce()>;

/// An effect's create callback.
pub type EffectCreate = Rc<dyn Fn() -> Option<EffectCleanup>>;

/// One effect record, shared between the owning node's effect list and the
/// root's pending passive buffers.
pub struct Effect {
    /// Effect tags; [`HOOK_HAS_EFFECT`] is cleared once the record's
    /// unmount destroy has run.
    pub tag: Cell<HookFlags>,
    /// Create callback, run during passive flush.
    pub create: EffectCreate,
    /// Cleanup captured from the previous create, if any.
    pub destroy: RefCell<Option<EffectCleanup>>,
    /// Dependency values compared between renders; `None` re-runs always.
    pub deps: Option<Vec<PropValue>>,
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("tag", &self.tag.get())
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

/// One persisted hook record.
#[derive(Clone)]
pub struct Hook {
    /// What the hook memoized.
    pub slot: HookSlot,
    /// Replay base state (stateful hooks).
    pub base_state: Option<StateValue>,
    /// Carried-over updates skipped by a prior pass (stateful hooks).
    pub base_queue: Vec<Update<StateValue>>,
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("slot", &self.slot)
            .field("has_base_state", &self.base_state.is_some())
            .field("base_queue_len", &self.base_queue.len())
            .finish()
    }
}

/// The memoized payload of a hook, by hook kind.
#[derive(Clone)]
pub enum HookSlot {
    /// `use_state`: current value plus the shared producer queue.
    State {
        /// Value as of the last render.
        value: StateValue,
        /// Queue shared with [`Updater`] handles.
        queue: SharedQueue<StateValue>,
    },
    /// `use_effect`: the effect record for the latest render.
    Effect(Rc<Effect>),
    /// `use_host_ref`: the stable ref slot.
    Ref(RefObject),
    /// `use_transition`: the memoized start handle.
    Transition(TransitionStart),
}

impl fmt::Debug for HookSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State { .. } => f.write_str("HookSlot::State"),
            Self::Effect(effect) => f.debug_tuple("HookSlot::Effect").field(effect).finish(),
            Self::Ref(_) => f.write_str("HookSlot::Ref"),
            Self::Transition(_) => f.write_str("HookSlot::Transition"),
        }
    }
}

/// Shared buffer of `(root, lane)` dispatch notices awaiting scheduling.
#[derive(Clone, Debug, Default)]
pub struct DispatchInbox(Rc<RefCell<Vec<(u32, Lane)>>>);

impl DispatchInbox {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, root: u32, lane: Lane) {
        self.0.borrow_mut().push((root, lane));
    }

    /// Drains all recorded notices.
    pub(crate) fn drain(&self) -> Vec<(u32, Lane)> {
        core::mem::take(&mut *self.0.borrow_mut())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Pass-shared hook environment: the dispatch inbox, the transition flag,
/// and the root the pass renders for.
#[derive(Clone, Debug)]
pub(crate) struct HooksEnv {
    pub(crate) inbox: DispatchInbox,
    pub(crate) transition: Rc<Cell<bool>>,
    pub(crate) root: u32,
}

/// Producer handle for a `use_state` hook.
///
/// Cheap to clone; valid for the lifetime of the component position. A
/// dispatch enqueues the update and records the owning root for scheduling —
/// the new state is computed during the next render, not eagerly.
#[derive(Clone)]
pub struct Updater {
    root: u32,
    queue: SharedQueue<StateValue>,
    inbox: DispatchInbox,
    transition: Rc<Cell<bool>>,
}

impl Updater {
    /// Enqueues a replacement value at `lane`.
    pub fn set<T: 'static>(&self, value: T, lane: Lane) {
        self.dispatch(UpdatePayload::Replace(Rc::new(value)), lane);
    }

    /// Enqueues a derived update at `lane`.
    pub fn update<T: Clone + 'static>(&self, f: impl Fn(&T) -> T + 'static, lane: Lane) {
        let payload = UpdatePayload::Apply(Rc::new(move |prev: &StateValue| {
            let prev = prev
                .downcast_ref::<T>()
                .expect("state type changed between renders");
            Rc::new(f(prev)) as StateValue
        }));
        self.dispatch(payload, lane);
    }

    fn dispatch(&self, payload: UpdatePayload<StateValue>, lane: Lane) {
        // An active transition overrides the caller's lane.
        let lane = if self.transition.get() {
            TRANSITION_LANE
        } else {
            lane
        };
        self.queue.borrow_mut().enqueue(Update { payload, lane });
        self.inbox.push(self.root, lane);
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater").field("root", &self.root).finish()
    }
}

/// Handle returned by `use_transition` that runs a scope with dispatches
/// downgraded to the transition lane.
#[derive(Clone)]
pub struct TransitionStart {
    pending: Updater,
    flag: Rc<Cell<bool>>,
}

impl TransitionStart {
    /// Marks the transition pending, runs `scope` with the transition flag
    /// set (so every dispatch inside lands on the transition lane), then
    /// clears the pending marker on that same lane.
    pub fn start(&self, scope: impl FnOnce()) {
        self.pending.set(true, DEFAULT_LANE);
        let previous = self.flag.replace(true);
        scope();
        self.pending.set(false, DEFAULT_LANE);
        self.flag.set(previous);
    }
}

impl fmt::Debug for TransitionStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransitionStart")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HookPhase {
    Mount,
    Update,
}

/// Per-pass hook cursor handed to component render callbacks.
pub struct HookContext<'a> {
    arena: &'a mut NodeArena,
    current: u32,
    phase: HookPhase,
    hook_index: usize,
    prev_hooks: Vec<Hook>,
    next_hooks: Vec<Hook>,
    effects: Vec<Rc<Effect>>,
    node_flags: Flags,
    render_lane: Lane,
    env: HooksEnv,
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("phase", &self.phase)
            .field("hook_index", &self.hook_index)
            .finish_non_exhaustive()
    }
}

impl HookContext<'_> {
    /// Declares a stateful value.
    ///
    /// On mount, `init` produces the initial value. On update, the hook's
    /// pending queue is merged with its carried base queue and replayed at
    /// the render lane.
    ///
    /// # Panics
    ///
    /// Panics if this render calls more hooks than the previous one
    /// persisted, or if the state type changed between renders.
    pub fn use_state<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, Updater) {
        let (value, queue) = match self.phase {
            HookPhase::Mount => {
                let value: StateValue = Rc::new(init());
                let queue = shared_queue();
                self.next_hooks.push(Hook {
                    slot: HookSlot::State {
                        value: value.clone(),
                        queue: queue.clone(),
                    },
                    base_state: Some(value.clone()),
                    base_queue: Vec::new(),
                });
                self.hook_index += 1;
                (value, queue)
            }
            HookPhase::Update => self.update_state_hook(),
        };

        let updater = Updater {
            root: self.env.root,
            queue,
            inbox: self.env.inbox.clone(),
            transition: self.env.transition.clone(),
        };
        let value = value
            .downcast_ref::<T>()
            .expect("state type changed between renders")
            .clone();
        (value, updater)
    }

    fn update_state_hook(&mut self) -> (StateValue, SharedQueue<StateValue>) {
        let index = self.hook_index;
        let prev = self.take_prev_hook();
        let HookSlot::State { value, queue } = prev.slot else {
            panic!("hook order changed between renders (expected a state hook)");
        };

        // Merge carried base queue with newly arrived updates, and persist
        // the merged queue on the current generation before processing so an
        // abandoned work-in-progress render cannot lose updates.
        let mut updates = prev.base_queue;
        updates.extend(queue.borrow_mut().take_pending());
        if let NodeState::Hooks(hooks) = &mut self.arena.node_mut(self.current).state
            && let Some(hook) = hooks.get_mut(index)
        {
            hook.base_queue = updates.clone();
        }

        let base = prev.base_state.unwrap_or_else(|| value.clone());
        let processed = process_update_queue(base, &updates, self.render_lane);

        self.next_hooks.push(Hook {
            slot: HookSlot::State {
                value: processed.memoized_state.clone(),
                queue: queue.clone(),
            },
            base_state: Some(processed.base_state),
            base_queue: processed.base_queue,
        });
        self.hook_index += 1;
        (processed.memoized_state, queue)
    }

    /// Declares a passive effect.
    ///
    /// `deps` of `None` re-runs the effect after every commit; otherwise the
    /// effect re-runs only when the dependency values differ from the
    /// previous render. The create callback runs during the asynchronous
    /// passive flush; its returned cleanup runs before the next create and
    /// on unmount.
    pub fn use_effect(
        &mut self,
        create: impl Fn() -> Option<EffectCleanup> + 'static,
        deps: Option<Vec<PropValue>>,
    ) {
        let create: EffectCreate = Rc::new(create);
        match self.phase {
            HookPhase::Mount => {
                self.push_effect(HOOK_PASSIVE | HOOK_HAS_EFFECT, create, None, deps);
                self.node_flags |= PASSIVE;
            }
            HookPhase::Update => {
                let prev = self.take_prev_hook();
                let HookSlot::Effect(prev_effect) = prev.slot else {
                    panic!("hook order changed between renders (expected an effect hook)");
                };
                let destroy = prev_effect.destroy.borrow_mut().take();

                let unchanged = match (&deps, &prev_effect.deps) {
                    (Some(next), Some(prev_deps)) => next == prev_deps,
                    _ => false,
                };
                if unchanged {
                    self.push_effect(HOOK_PASSIVE, create, destroy, deps);
                } else {
                    self.push_effect(HOOK_PASSIVE | HOOK_HAS_EFFECT, create, destroy, deps);
                    self.node_flags |= PASSIVE;
                }
            }
        }
    }

    fn push_effect(
        &mut self,
        tag: HookFlags,
        create: EffectCreate,
        destroy: Option<EffectCleanup>,
        deps: Option<Vec<PropValue>>,
    ) {
        let effect = Rc::new(Effect {
            tag: Cell::new(tag),
            create,
            destroy: RefCell::new(destroy),
            deps,
        });
        self.effects.push(effect.clone());
        self.next_hooks.push(Hook {
            slot: HookSlot::Effect(effect),
            base_state: None,
            base_queue: Vec::new(),
        });
        self.hook_index += 1;
    }

    /// Declares a stable host-ref slot, attachable via
    /// [`RefValue::Object`](crate::element::RefValue::Object).
    pub fn use_host_ref(&mut self) -> RefObject {
        let slot = match self.phase {
            HookPhase::Mount => RefValue::object(),
            HookPhase::Update => {
                let prev = self.take_prev_hook();
                let HookSlot::Ref(slot) = prev.slot else {
                    panic!("hook order changed between renders (expected a ref hook)");
                };
                slot
            }
        };
        self.next_hooks.push(Hook {
            slot: HookSlot::Ref(slot.clone()),
            base_state: None,
            base_queue: Vec::new(),
        });
        self.hook_index += 1;
        slot
    }

    /// Declares a transition: returns whether one is pending plus the start
    /// handle. Occupies two hook slots (the pending state and the handle).
    pub fn use_transition(&mut self) -> (bool, TransitionStart) {
        let (is_pending, pending) = self.use_state(|| false);
        let start = match self.phase {
            HookPhase::Mount => {
                let start = TransitionStart {
                    pending,
                    flag: self.env.transition.clone(),
                };
                self.next_hooks.push(Hook {
                    slot: HookSlot::Transition(start.clone()),
                    base_state: None,
                    base_queue: Vec::new(),
                });
                self.hook_index += 1;
                start
            }
            HookPhase::Update => {
                let prev = self.take_prev_hook();
                let HookSlot::Transition(start) = prev.slot else {
                    panic!("hook order changed between renders (expected a transition hook)");
                };
                self.next_hooks.push(Hook {
                    slot: HookSlot::Transition(start.clone()),
                    base_state: None,
                    base_queue: Vec::new(),
                });
                self.hook_index += 1;
                start
            }
        };
        (is_pending, start)
    }

    fn take_prev_hook(&mut self) -> Hook {
        assert!(
            self.hook_index < self.prev_hooks.len(),
            "component called more hooks than during its previous render"
        );
        self.prev_hooks[self.hook_index].clone()
    }
}

/// Runs a component node's render callback with a fresh hook cursor and
/// stores the produced hook chain, effect list, and effect flags on the
/// node. Returns the described child.
pub(crate) fn render_with_hooks(
    arena: &mut NodeArena,
    wip: u32,
    render_lane: Lane,
    env: &HooksEnv,
) -> Child {
    let NodePayload::Component(component) = arena.node(wip).pending.clone() else {
        unreachable!("render_with_hooks on a non-component node");
    };

    let current = arena.node(wip).alternate;
    let (phase, prev_hooks) = if current == crate::node::INVALID {
        (HookPhase::Mount, Vec::new())
    } else {
        let hooks = match &arena.node(current).state {
            NodeState::Hooks(hooks) => hooks.clone(),
            _ => Vec::new(),
        };
        (HookPhase::Update, hooks)
    };

    let mut ctx = HookContext {
        arena: &mut *arena,
        current: if phase == HookPhase::Update { current } else { wip },
        phase,
        hook_index: 0,
        prev_hooks,
        next_hooks: Vec::new(),
        effects: Vec::new(),
        node_flags: NO_FLAGS,
        render_lane,
        env: env.clone(),
    };
    let child = (component.func)(&mut ctx, &component.props);

    let HookContext {
        next_hooks,
        effects,
        node_flags,
        ..
    } = ctx;
    let node = arena.node_mut(wip);
    node.state = NodeState::Hooks(next_hooks);
    node.effects = effects;
    node.flags |= node_flags;
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, component_fn};
    use crate::flags::PASSIVE;
    use crate::lane::SYNC_LANE;

    fn env() -> HooksEnv {
        HooksEnv {
            inbox: DispatchInbox::new(),
            transition: Rc::new(Cell::new(false)),
            root: 0,
        }
    }

    fn mount_component(
        arena: &mut NodeArena,
        func: crate::element::ComponentFn,
        env: &HooksEnv,
    ) -> (u32, Child) {
        let node = arena.create_from_element(Element::component(func));
        let child = render_with_hooks(arena, node, SYNC_LANE, env);
        (node, child)
    }

    fn rerender(arena: &mut NodeArena, node: u32, lane: Lane, env: &HooksEnv) -> (u32, Child) {
        let pending = arena.node(node).pending.clone();
        let wip = arena.create_work_in_progress(node, pending);
        let child = render_with_hooks(arena, wip, lane, env);
        (wip, child)
    }

    #[test]
    fn state_persists_across_renders() {
        let mut arena = NodeArena::new();
        let env = env();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let updaters = Rc::new(RefCell::new(Vec::new()));
        let updaters_in = updaters.clone();

        let func = component_fn(move |ctx, _| {
            let (count, updater) = ctx.use_state(|| 0_i32);
            seen_in.borrow_mut().push(count);
            updaters_in.borrow_mut().push(updater);
            Child::empty()
        });

        let (node, _) = mount_component(&mut arena, func, &env);
        assert_eq!(*seen.borrow(), [0]);

        updaters.borrow()[0].set(5_i32, SYNC_LANE);
        assert!(!env.inbox.is_empty());

        let _ = rerender(&mut arena, node, SYNC_LANE, &env);
        assert_eq!(*seen.borrow(), [0, 5]);
    }

    #[test]
    fn derived_updates_compose_in_order() {
        let mut arena = NodeArena::new();
        let env = env();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let updaters = Rc::new(RefCell::new(Vec::new()));
        let updaters_in = updaters.clone();

        let func = component_fn(move |ctx, _| {
            let (count, updater) = ctx.use_state(|| 1_i32);
            seen_in.borrow_mut().push(count);
            updaters_in.borrow_mut().push(updater);
            Child::empty()
        });

        let (node, _) = mount_component(&mut arena, func, &env);
        let updater = updaters.borrow()[0].clone();
        updater.update(|n: &i32| n + 1, SYNC_LANE);
        updater.update(|n: &i32| n * 10, SYNC_LANE);

        let _ = rerender(&mut arena, node, SYNC_LANE, &env);
        assert_eq!(*seen.borrow(), [1, 20]);
    }

    #[test]
    fn skipped_lane_updates_replay_later() {
        let mut arena = NodeArena::new();
        let env = env();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let updaters = Rc::new(RefCell::new(Vec::new()));
        let updaters_in = updaters.clone();

        let func = component_fn(move |ctx, _| {
            let (count, updater) = ctx.use_state(|| 0_i32);
            seen_in.borrow_mut().push(count);
            updaters_in.borrow_mut().push(updater);
            Child::empty()
        });

        let (node, _) = mount_component(&mut arena, func, &env);
        let updater = updaters.borrow()[0].clone();
        updater.update(|n: &i32| n + 1, DEFAULT_LANE);
        updater.set(3_i32, SYNC_LANE);
        updater.update(|n: &i32| n + 10, DEFAULT_LANE);

        // Render at the default lane: the sync update is skipped.
        let (wip, _) = rerender(&mut arena, node, DEFAULT_LANE, &env);
        assert_eq!(*seen.borrow(), [0, 11]);

        // Render the other generation at the sync lane: carried queue
        // replays in original relative order.
        let _ = rerender(&mut arena, wip, SYNC_LANE, &env);
        assert_eq!(*seen.borrow(), [0, 11, 13]);
    }

    #[test]
    fn effect_records_follow_dep_changes() {
        let mut arena = NodeArena::new();
        let env = env();
        let dep = Rc::new(Cell::new(0_i64));
        let dep_in = dep.clone();

        let func = component_fn(move |ctx, _| {
            ctx.use_effect(|| None, Some(alloc::vec![PropValue::Int(dep_in.get())]));
            Child::empty()
        });

        let (node, _) = mount_component(&mut arena, func, &env);
        {
            let effects = &arena.node(node).effects;
            assert_eq!(effects.len(), 1);
            assert_eq!(effects[0].tag.get(), HOOK_PASSIVE | HOOK_HAS_EFFECT);
            assert_ne!(arena.node(node).flags & PASSIVE, 0);
        }

        // Same deps: record carried without the has-effect mark.
        let (wip, _) = rerender(&mut arena, node, SYNC_LANE, &env);
        {
            let effects = &arena.node(wip).effects;
            assert_eq!(effects[0].tag.get(), HOOK_PASSIVE);
            assert_eq!(arena.node(wip).flags & PASSIVE, 0);
        }

        // Changed deps: has-effect again.
        dep.set(1);
        let (wip2, _) = rerender(&mut arena, wip, SYNC_LANE, &env);
        let effects = &arena.node(wip2).effects;
        assert_eq!(effects[0].tag.get(), HOOK_PASSIVE | HOOK_HAS_EFFECT);
        assert_ne!(arena.node(wip2).flags & PASSIVE, 0);
    }

    #[test]
    fn host_ref_slot_is_stable() {
        let mut arena = NodeArena::new();
        let env = env();
        let slots = Rc::new(RefCell::new(Vec::new()));
        let slots_in = slots.clone();

        let func = component_fn(move |ctx, _| {
            slots_in.borrow_mut().push(ctx.use_host_ref());
            Child::empty()
        });

        let (node, _) = mount_component(&mut arena, func, &env);
        let _ = rerender(&mut arena, node, SYNC_LANE, &env);

        let slots = slots.borrow();
        assert!(Rc::ptr_eq(&slots[0], &slots[1]));
    }

    #[test]
    fn transition_dispatches_on_transition_lane() {
        let mut arena = NodeArena::new();
        let env = env();
        let handles = Rc::new(RefCell::new(Vec::new()));
        let handles_in = handles.clone();

        let func = component_fn(move |ctx, _| {
            let (_count, updater) = ctx.use_state(|| 0_i32);
            let (is_pending, start) = ctx.use_transition();
            handles_in.borrow_mut().push((updater, start, is_pending));
            Child::empty()
        });

        let (_node, _) = mount_component(&mut arena, func, &env);
        let (updater, start, _) = handles.borrow()[0].clone();

        start.start(|| updater.set(1_i32, SYNC_LANE));

        let lanes: Vec<Lane> = env.inbox.drain().into_iter().map(|(_, l)| l).collect();
        // pending=true at default, the scoped dispatch at transition,
        // pending=false at transition.
        assert_eq!(lanes, [DEFAULT_LANE, TRANSITION_LANE, TRANSITION_LANE]);
    }

    #[test]
    #[should_panic(expected = "more hooks than during its previous render")]
    fn extra_hook_on_update_panics() {
        let mut arena = NodeArena::new();
        let env = env();
        let grow = Rc::new(Cell::new(false));
        let grow_in = grow.clone();

        let func = component_fn(move |ctx, _| {
            let _ = ctx.use_state(|| 0_i32);
            if grow_in.get() {
                let _ = ctx.use_state(|| 1_i32);
            }
            Child::empty()
        });

        let (node, _) = mount_component(&mut arena, func, &env);
        grow.set(true);
        let _ = rerender(&mut arena, node, SYNC_LANE, &env);
    }
}
