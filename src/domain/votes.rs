//! Vote state machine.
//!
//! Pure transition planning for the vote ledger. For each (user, target)
//! pair the caller's vote is in one of three states; casting a vote in a
//! direction produces exactly one of three ledger actions plus the counter
//! deltas that keep the target's denormalized counters in step.

use serde::Serialize;

use crate::domain::types::VoteDirection;

/// The caller's standing vote on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    NoVote,
    Up,
    Down,
}

impl VoteState {
    pub fn from_direction(direction: Option<VoteDirection>) -> Self {
        match direction {
            None => VoteState::NoVote,
            Some(VoteDirection::Up) => VoteState::Up,
            Some(VoteDirection::Down) => VoteState::Down,
        }
    }

    pub fn is_upvoted(self) -> bool {
        self == VoteState::Up
    }

    pub fn is_downvoted(self) -> bool {
        self == VoteState::Down
    }
}

/// Ledger mutation required to realize a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    /// No vote exists: create one in the given direction.
    Create(VoteDirection),
    /// Same direction cast again: remove the existing vote (toggle off).
    Remove,
    /// Opposite direction cast: flip the existing vote to the new direction.
    Flip(VoteDirection),
}

/// Planned outcome of casting a vote from a known state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub action: VoteAction,
    pub next_state: VoteState,
    pub upvote_delta: i64,
    pub downvote_delta: i64,
}

/// Plan the transition for casting `direction` from `current`.
///
/// Covers all six reachable transitions of the {NoVote, Up, Down} machine.
/// The deltas may be negative; persistence floors the stored counters at
/// zero as a defense against out-of-order application.
pub fn plan_transition(current: VoteState, direction: VoteDirection) -> VoteTransition {
    match (current, direction) {
        (VoteState::NoVote, VoteDirection::Up) => VoteTransition {
            action: VoteAction::Create(VoteDirection::Up),
            next_state: VoteState::Up,
            upvote_delta: 1,
            downvote_delta: 0,
        },
        (VoteState::NoVote, VoteDirection::Down) => VoteTransition {
            action: VoteAction::Create(VoteDirection::Down),
            next_state: VoteState::Down,
            upvote_delta: 0,
            downvote_delta: 1,
        },
        (VoteState::Up, VoteDirection::Up) => VoteTransition {
            action: VoteAction::Remove,
            next_state: VoteState::NoVote,
            upvote_delta: -1,
            downvote_delta: 0,
        },
        (VoteState::Down, VoteDirection::Down) => VoteTransition {
            action: VoteAction::Remove,
            next_state: VoteState::NoVote,
            upvote_delta: 0,
            downvote_delta: -1,
        },
        (VoteState::Up, VoteDirection::Down) => VoteTransition {
            action: VoteAction::Flip(VoteDirection::Down),
            next_state: VoteState::Down,
            upvote_delta: -1,
            downvote_delta: 1,
        },
        (VoteState::Down, VoteDirection::Up) => VoteTransition {
            action: VoteAction::Flip(VoteDirection::Up),
            next_state: VoteState::Up,
            upvote_delta: 1,
            downvote_delta: -1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_upvote_creates() {
        let t = plan_transition(VoteState::NoVote, VoteDirection::Up);
        assert_eq!(t.action, VoteAction::Create(VoteDirection::Up));
        assert_eq!(t.next_state, VoteState::Up);
        assert_eq!((t.upvote_delta, t.downvote_delta), (1, 0));
    }

    #[test]
    fn first_downvote_creates() {
        let t = plan_transition(VoteState::NoVote, VoteDirection::Down);
        assert_eq!(t.action, VoteAction::Create(VoteDirection::Down));
        assert_eq!(t.next_state, VoteState::Down);
        assert_eq!((t.upvote_delta, t.downvote_delta), (0, 1));
    }

    #[test]
    fn repeat_upvote_toggles_off() {
        let t = plan_transition(VoteState::Up, VoteDirection::Up);
        assert_eq!(t.action, VoteAction::Remove);
        assert_eq!(t.next_state, VoteState::NoVote);
        assert_eq!((t.upvote_delta, t.downvote_delta), (-1, 0));
    }

    #[test]
    fn repeat_downvote_toggles_off() {
        let t = plan_transition(VoteState::Down, VoteDirection::Down);
        assert_eq!(t.action, VoteAction::Remove);
        assert_eq!(t.next_state, VoteState::NoVote);
        assert_eq!((t.upvote_delta, t.downvote_delta), (0, -1));
    }

    #[test]
    fn up_to_down_flips() {
        let t = plan_transition(VoteState::Up, VoteDirection::Down);
        assert_eq!(t.action, VoteAction::Flip(VoteDirection::Down));
        assert_eq!(t.next_state, VoteState::Down);
        assert_eq!((t.upvote_delta, t.downvote_delta), (-1, 1));
    }

    #[test]
    fn down_to_up_flips() {
        let t = plan_transition(VoteState::Down, VoteDirection::Up);
        assert_eq!(t.action, VoteAction::Flip(VoteDirection::Up));
        assert_eq!(t.next_state, VoteState::Up);
        assert_eq!((t.upvote_delta, t.downvote_delta), (1, -1));
    }

    #[test]
    fn deltas_always_cancel_over_a_toggle_cycle() {
        // Casting the same direction twice must be a net no-op on counters.
        for direction in [VoteDirection::Up, VoteDirection::Down] {
            let first = plan_transition(VoteState::NoVote, direction);
            let second = plan_transition(first.next_state, direction);
            assert_eq!(first.upvote_delta + second.upvote_delta, 0);
            assert_eq!(first.downvote_delta + second.downvote_delta, 0);
            assert_eq!(second.next_state, VoteState::NoVote);
        }
    }

    #[test]
    fn state_from_stored_direction() {
        assert_eq!(VoteState::from_direction(None), VoteState::NoVote);
        assert_eq!(
            VoteState::from_direction(Some(VoteDirection::Up)),
            VoteState::Up
        );
        assert_eq!(
            VoteState::from_direction(Some(VoteDirection::Down)),
            VoteState::Down
        );
        assert!(VoteState::Up.is_upvoted());
        assert!(!VoteState::Up.is_downvoted());
    }
}
