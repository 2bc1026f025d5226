mod ids;
mod queue_item;
mod snapshot;
mod user;
mod vote;

pub use ids::{QueueItemId, UserId, VoteId};
pub use queue_item::{NewQueueItem, QueueItem, QueueItemState, ResolvedMedia};
pub use snapshot::{QueueSnapshot, SnapshotDiff};
pub use user::{UpsertUser, User};
pub use vote::{Tally, TallyDelta, Vote, VoteDirection, VoteOutcome};
