//! crates/devstack_core/src/votes.rs
//!
//! The vote state machine. A caller has at most one vote per target; casting
//! decides between creating, retracting (same direction twice) and flipping
//! (opposite direction). Each transition carries the counter deltas the store
//! must apply to the target in the same transaction.

use crate::domain::VoteKind;

/// What the store must do to the vote row for one cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No existing vote: insert a row with the requested direction.
    Create,
    /// Existing vote in the requested direction: delete the row (toggle-off).
    Retract,
    /// Existing vote in the opposite direction: update the row in place.
    Flip { from: VoteKind },
}

/// A counter adjustment on the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDelta {
    pub kind: VoteKind,
    pub change: i64,
}

impl VoteTransition {
    /// Decides the transition for a cast of `requested` given the caller's
    /// existing vote on the target.
    pub fn decide(existing: Option<VoteKind>, requested: VoteKind) -> Self {
        match existing {
            None => VoteTransition::Create,
            Some(current) if current == requested => VoteTransition::Retract,
            Some(current) => VoteTransition::Flip { from: current },
        }
    }

    /// The counter changes the target needs for this transition.
    ///
    /// A flip decrements the old direction and increments the new one, so
    /// `upvotes + downvotes` always equals the number of vote rows.
    pub fn counter_deltas(&self, requested: VoteKind) -> Vec<CounterDelta> {
        match self {
            VoteTransition::Create => vec![CounterDelta {
                kind: requested,
                change: 1,
            }],
            VoteTransition::Retract => vec![CounterDelta {
                kind: requested,
                change: -1,
            }],
            VoteTransition::Flip { from } => vec![
                CounterDelta {
                    kind: *from,
                    change: -1,
                },
                CounterDelta {
                    kind: requested,
                    change: 1,
                },
            ],
        }
    }
}
