// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lane priority model.
//!
//! A [`Lane`] is a single-bit priority class for a pending update; a
//! [`Lanes`] value is the union of lanes with pending work. The lowest set
//! bit is the highest priority, so picking the next lane to render is
//! `x & -x`. All operations are pure bit arithmetic.
//!
//! Lanes exist only inside the reconciler. At the scheduling boundary they
//! are converted to and from the external scheduler's [`TaskPriority`]
//! levels via [`Lane::from_priority`] and [`Lanes::to_priority`].

use core::fmt;

use crate::sched::TaskPriority;

/// A single-bit update priority class.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lane(pub(crate) u32);

/// A set of lanes with pending work.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Lanes(pub(crate) u32);

/// No priority. Updates downgraded to `NO_LANE` are eligible in every pass.
pub const NO_LANE: Lane = Lane(0);

/// Synchronous events; never time-sliced.
pub const SYNC_LANE: Lane = Lane(0b0000_0010);

/// Continuous input (scroll, drag, pointer move).
pub const INPUT_CONTINUOUS_LANE: Lane = Lane(0b0000_1000);

/// Ordinary updates.
pub const DEFAULT_LANE: Lane = Lane(0b0010_0000);

/// Deprioritized transitions.
pub const TRANSITION_LANE: Lane = Lane(0b1000_0000);

/// Idle-time work.
pub const IDLE_LANE: Lane = Lane(0b0100_0000_0000_0000_0000_0000_0000_0000);

/// The empty lane set.
pub const NO_LANES: Lanes = Lanes(0);

impl Lane {
    /// Returns whether this is [`NO_LANE`].
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Raw bit pattern (diagnostics only).
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Maps a scheduler priority to the lane updates from that context get.
    #[must_use]
    pub const fn from_priority(priority: TaskPriority) -> Self {
        match priority {
            TaskPriority::Immediate => SYNC_LANE,
            TaskPriority::UserBlocking => INPUT_CONTINUOUS_LANE,
            TaskPriority::Normal => DEFAULT_LANE,
            TaskPriority::Low | TaskPriority::Idle => NO_LANE,
        }
    }
}

impl Lanes {
    /// The set containing only `lane`.
    #[must_use]
    pub const fn from_lane(lane: Lane) -> Self {
        Self(lane.0)
    }

    /// Raw bit pattern (diagnostics only).
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns whether no lane is pending.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Union with another lane.
    #[must_use]
    pub const fn merge(self, lane: Lane) -> Self {
        Self(self.0 | lane.0)
    }

    /// Removes `lane` from the set.
    #[must_use]
    pub const fn remove(self, lane: Lane) -> Self {
        Self(self.0 & !lane.0)
    }

    /// The highest-priority lane in the set: the lowest set bit.
    #[must_use]
    pub const fn highest_priority(self) -> Lane {
        Lane(self.0 & self.0.wrapping_neg())
    }

    /// Returns whether `lane` is a subset of this set.
    ///
    /// [`NO_LANE`] is a subset of every set, which is what makes downgraded
    /// base-queue updates eligible in every later pass.
    #[must_use]
    pub const fn contains(self, lane: Lane) -> bool {
        self.0 & lane.0 == lane.0
    }

    /// Maps the highest-priority pending lane to a scheduler priority.
    #[must_use]
    pub const fn to_priority(self) -> TaskPriority {
        let lane = self.highest_priority();
        if lane.0 == SYNC_LANE.0 {
            TaskPriority::Immediate
        } else if lane.0 == INPUT_CONTINUOUS_LANE.0 {
            TaskPriority::UserBlocking
        } else if lane.0 == DEFAULT_LANE.0 {
            TaskPriority::Normal
        } else {
            TaskPriority::Idle
        }
    }
}

impl fmt::Debug for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lane({:#b})", self.0)
    }
}

impl fmt::Debug for Lanes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lanes({:#b})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_priority_is_lowest_set_bit() {
        let lanes = NO_LANES.merge(DEFAULT_LANE).merge(SYNC_LANE);
        assert_eq!(lanes.highest_priority(), SYNC_LANE);

        let lanes = NO_LANES.merge(IDLE_LANE).merge(TRANSITION_LANE);
        assert_eq!(lanes.highest_priority(), TRANSITION_LANE);
    }

    #[test]
    fn merge_and_remove_roundtrip() {
        let lanes = NO_LANES.merge(SYNC_LANE).merge(DEFAULT_LANE);
        assert!(lanes.contains(SYNC_LANE));
        assert!(lanes.contains(DEFAULT_LANE));

        let lanes = lanes.remove(SYNC_LANE);
        assert!(!lanes.contains(SYNC_LANE));
        assert!(lanes.contains(DEFAULT_LANE));
        assert_eq!(lanes.remove(DEFAULT_LANE), NO_LANES);
    }

    #[test]
    fn no_lane_is_subset_of_everything() {
        assert!(NO_LANES.contains(NO_LANE));
        assert!(Lanes::from_lane(SYNC_LANE).contains(NO_LANE));
        assert!(Lanes::from_lane(IDLE_LANE).contains(NO_LANE));
    }

    #[test]
    fn empty_set_contains_no_real_lane() {
        assert!(!NO_LANES.contains(SYNC_LANE));
        assert!(NO_LANES.is_empty());
        assert_eq!(NO_LANES.highest_priority(), NO_LANE);
    }

    #[test]
    fn priority_conversions_roundtrip_at_the_boundary() {
        assert_eq!(Lane::from_priority(TaskPriority::Immediate), SYNC_LANE);
        assert_eq!(
            Lane::from_priority(TaskPriority::UserBlocking),
            INPUT_CONTINUOUS_LANE
        );
        assert_eq!(Lane::from_priority(TaskPriority::Normal), DEFAULT_LANE);
        assert_eq!(Lane::from_priority(TaskPriority::Idle), NO_LANE);

        assert_eq!(
            Lanes::from_lane(SYNC_LANE).to_priority(),
            TaskPriority::Immediate
        );
        assert_eq!(
            Lanes::from_lane(INPUT_CONTINUOUS_LANE).to_priority(),
            TaskPriority::UserBlocking
        );
        assert_eq!(
            Lanes::from_lane(DEFAULT_LANE).to_priority(),
            TaskPriority::Normal
        );
        assert_eq!(
            Lanes::from_lane(TRANSITION_LANE).to_priority(),
            TaskPriority::Idle
        );
    }

    #[test]
    fn sync_wins_in_mixed_set_conversion() {
        let lanes = NO_LANES.merge(TRANSITION_LANE).merge(SYNC_LANE);
        assert_eq!(lanes.to_priority(), TaskPriority::Immediate);
    }
}
