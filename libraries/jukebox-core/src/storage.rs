//! Storage trait for the collaborative queue

use crate::error::Result;
use crate::types::{
    NewQueueItem, QueueItem, QueueItemId, QueueSnapshot, Tally, TallyDelta, UpsertUser, User,
    UserId, VoteDirection,
};
use async_trait::async_trait;

/// Storage context providing the queue's transactional operations
///
/// Every mutating method runs as one all-or-nothing transaction. Identity is always
/// passed explicitly; implementations reject unknown users with
/// [`crate::JukeboxError::Unauthorized`].
#[async_trait]
pub trait QueueStore: Send + Sync {
    // ========================================================================
    // Users
    // ========================================================================

    /// Create the user, or refresh the display name of the user with this email
    async fn upsert_user(&self, user: UpsertUser) -> Result<User>;

    /// Get user by ID
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Get user by email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get all users
    async fn get_all_users(&self) -> Result<Vec<User>>;

    // ========================================================================
    // Vote ledger and tallies
    // ========================================================================

    /// Insert, retract or switch the voter's vote and update the item's tally
    async fn cast_vote(
        &self,
        voter_id: UserId,
        item_id: QueueItemId,
        direction: VoteDirection,
    ) -> Result<TallyDelta>;

    /// Re-derive the item's tally from the ledger and store it
    async fn recompute_tally(&self, item_id: QueueItemId) -> Result<Tally>;

    // ========================================================================
    // Queue mutation
    // ========================================================================

    /// Insert a resolved submission as a pending item
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem>;

    /// Mark the item removed (no-op if it already is) and return the new head
    async fn advance(&self, finished: QueueItemId) -> Result<Option<QueueItem>>;

    /// Move a pending item to playing
    async fn promote(&self, item_id: QueueItemId) -> Result<QueueItem>;

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get item by ID, in any state
    async fn get_item(&self, id: QueueItemId) -> Result<Option<QueueItem>>;

    /// Pending items in rank order
    async fn current_order(&self) -> Result<Vec<QueueItem>>;

    /// Top-ranked pending item
    async fn head(&self) -> Result<Option<QueueItem>>;

    /// The item currently playing, if any
    async fn now_playing(&self) -> Result<Option<QueueItem>>;

    /// Order, now playing and revision read together
    async fn snapshot(&self) -> Result<QueueSnapshot>;
}
