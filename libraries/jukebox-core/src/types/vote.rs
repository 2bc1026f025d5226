//! Vote ledger types and the toggle decision
//!
//! A user holds at most one vote per item. Casting the direction already held
//! retracts it, casting the opposite direction switches it in place.

use super::{QueueItemId, UserId, VoteId};
use serde::{Deserialize, Serialize};

/// Direction of a vote, stored as a boolean column (`true` = up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    #[must_use]
    pub fn from_bool(is_up: bool) -> Self {
        if is_up {
            Self::Up
        } else {
            Self::Down
        }
    }

    #[must_use]
    pub fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

impl std::fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// One row of the vote ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter_id: UserId,
    pub queue_item_id: QueueItemId,
    pub direction: VoteDirection,
}

/// What a cast did to the voter's ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// No previous vote; a row was inserted
    Inserted { direction: VoteDirection },
    /// Same direction cast again; the row was deleted
    Retracted { direction: VoteDirection },
    /// Opposite direction cast; the row was overwritten
    Switched { from: VoteDirection, to: VoteDirection },
}

impl VoteOutcome {
    /// Decide the ledger change for a cast given the voter's current row
    #[must_use]
    pub fn decide(existing: Option<VoteDirection>, cast: VoteDirection) -> Self {
        match existing {
            None => Self::Inserted { direction: cast },
            Some(held) if held == cast => Self::Retracted { direction: cast },
            Some(held) => Self::Switched { from: held, to: cast },
        }
    }

    /// Signed `(upvotes, downvotes)` change this outcome applies to the item's tally
    #[must_use]
    pub fn deltas(self) -> (i64, i64) {
        match self {
            Self::Inserted { direction: VoteDirection::Up } => (1, 0),
            Self::Inserted { direction: VoteDirection::Down } => (0, 1),
            Self::Retracted { direction: VoteDirection::Up } => (-1, 0),
            Self::Retracted { direction: VoteDirection::Down } => (0, -1),
            Self::Switched { to: VoteDirection::Up, .. } => (1, -1),
            Self::Switched { to: VoteDirection::Down, .. } => (-1, 1),
        }
    }

    /// The direction the voter holds after the cast, if any
    #[must_use]
    pub fn resulting_direction(self) -> Option<VoteDirection> {
        match self {
            Self::Inserted { direction } => Some(direction),
            Self::Retracted { .. } => None,
            Self::Switched { to, .. } => Some(to),
        }
    }
}

/// Upvote/downvote counts of one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl Tally {
    pub fn new(upvotes: i64, downvotes: i64) -> Self {
        Self { upvotes, downvotes }
    }

    /// Tally after applying an outcome's deltas
    #[must_use]
    pub fn apply(self, outcome: VoteOutcome) -> Self {
        let (up, down) = outcome.deltas();
        Self {
            upvotes: self.upvotes + up,
            downvotes: self.downvotes + down,
        }
    }
}

/// Result of casting a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyDelta {
    pub queue_item_id: QueueItemId,
    pub outcome: VoteOutcome,
    pub upvotes_delta: i64,
    pub downvotes_delta: i64,
    /// Tally committed together with the ledger change
    pub tally: Tally,
}

impl TallyDelta {
    pub fn new(queue_item_id: QueueItemId, outcome: VoteOutcome, tally: Tally) -> Self {
        let (upvotes_delta, downvotes_delta) = outcome.deltas();
        Self {
            queue_item_id,
            outcome,
            upvotes_delta,
            downvotes_delta,
            tally,
        }
    }
}
