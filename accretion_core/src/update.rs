// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update records and priority-filtered replay.
//!
//! Producers append [`Update`]s to a [`SharedQueue`] in arrival order. A
//! render pass drains the queue and replays it against a base state with
//! [`process_update_queue`], applying only updates whose lane is eligible
//! for the pass.
//!
//! Skipped updates are not lost: the first skip freezes the *base state* at
//! the value computed so far, and the skipped update plus **every later
//! update** (applied or not) is carried forward in a new *base queue*.
//! Applied-then-carried updates are downgraded to [`NO_LANE`] so they replay
//! unconditionally in the next pass. This preserves the total order of
//! updates even when passes consume them out of arrival order, and
//! guarantees each update affects the final state exactly once per
//! convergence.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::lane::{Lane, Lanes, NO_LANE};

/// The state transition an [`Update`] performs.
pub enum UpdatePayload<S> {
    /// Replace the state with this value.
    Replace(S),
    /// Derive the next state from the previous one.
    Apply(Rc<dyn Fn(&S) -> S>),
}

impl<S: Clone> Clone for UpdatePayload<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Replace(value) => Self::Replace(value.clone()),
            Self::Apply(f) => Self::Apply(Rc::clone(f)),
        }
    }
}

impl<S> fmt::Debug for UpdatePayload<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(_) => f.write_str("Replace"),
            Self::Apply(_) => f.write_str("Apply"),
        }
    }
}

/// One pending state transition, tagged with its priority lane.
#[derive(Debug)]
pub struct Update<S> {
    /// The transition to perform.
    pub payload: UpdatePayload<S>,
    /// Priority class this update was produced at.
    pub lane: Lane,
}

impl<S: Clone> Clone for Update<S> {
    fn clone(&self) -> Self {
        Self {
            payload: self.payload.clone(),
            lane: self.lane,
        }
    }
}

impl<S> Update<S> {
    /// Creates a replacement update.
    #[must_use]
    pub const fn replace(value: S, lane: Lane) -> Self {
        Self {
            payload: UpdatePayload::Replace(value),
            lane,
        }
    }

    /// Creates a derived update.
    #[must_use]
    pub fn apply(f: impl Fn(&S) -> S + 'static, lane: Lane) -> Self {
        Self {
            payload: UpdatePayload::Apply(Rc::new(f)),
            lane,
        }
    }

    fn run(&self, prev: &S) -> S
    where
        S: Clone,
    {
        match &self.payload {
            UpdatePayload::Replace(value) => value.clone(),
            UpdatePayload::Apply(f) => f(prev),
        }
    }
}

/// A producer-side queue of pending updates in arrival order.
#[derive(Debug)]
pub struct UpdateQueue<S> {
    pending: Vec<Update<S>>,
}

impl<S> Default for UpdateQueue<S> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<S> UpdateQueue<S> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an update.
    pub fn enqueue(&mut self, update: Update<S>) {
        self.pending.push(update);
    }

    /// Drains all pending updates, preserving arrival order.
    pub fn take_pending(&mut self) -> Vec<Update<S>> {
        core::mem::take(&mut self.pending)
    }

    /// Returns whether updates are pending.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// A queue shared between the producer handle and the hook that replays it.
pub type SharedQueue<S> = Rc<RefCell<UpdateQueue<S>>>;

/// Creates a fresh [`SharedQueue`].
#[must_use]
pub fn shared_queue<S>() -> SharedQueue<S> {
    Rc::new(RefCell::new(UpdateQueue::new()))
}

/// The result of replaying a queue at a render lane.
#[derive(Debug)]
pub struct Processed<S> {
    /// Final state considering priority: what this pass renders with.
    pub memoized_state: S,
    /// Base state for the next replay: the value before the first skipped
    /// update, or the final value if nothing was skipped.
    pub base_state: S,
    /// Carried-over updates: every skipped update plus downgraded clones of
    /// the applied updates that followed the first skip. Empty when nothing
    /// was skipped.
    pub base_queue: Vec<Update<S>>,
}

/// Replays `updates` on top of `base_state`, applying only updates whose
/// lane is a subset of `render_lane`.
pub fn process_update_queue<S: Clone>(
    base_state: S,
    updates: &[Update<S>],
    render_lane: Lane,
) -> Processed<S> {
    let render_lanes = Lanes::from_lane(render_lane);

    let mut new_state = base_state.clone();
    let mut new_base_state = base_state;
    let mut base_queue: Vec<Update<S>> = Vec::new();
    let mut skipped = false;

    for update in updates {
        if !render_lanes.contains(update.lane) {
            // Insufficient priority. The first skip pins the base state.
            if !skipped {
                skipped = true;
                new_base_state = new_state.clone();
            }
            base_queue.push(update.clone());
        } else {
            // Once an update has been skipped, every later applied update is
            // also carried, downgraded so the replay cannot skip it again.
            if skipped {
                base_queue.push(Update {
                    payload: update.payload.clone(),
                    lane: NO_LANE,
                });
            }
            new_state = update.run(&new_state);
        }
    }

    if !skipped {
        new_base_state = new_state.clone();
    }

    Processed {
        memoized_state: new_state,
        base_state: new_base_state,
        base_queue,
    }
}
