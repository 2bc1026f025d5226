use crate::{queue, users, votes};
use async_trait::async_trait;
use jukebox_core::{error::Result, storage::QueueStore, types::*};
use sqlx::SqlitePool;

/// Local storage context using `SQLite`
pub struct LocalStorageContext {
    pool: SqlitePool,
}

impl LocalStorageContext {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl QueueStore for LocalStorageContext {
    // Users
    async fn upsert_user(&self, user: UpsertUser) -> Result<User> {
        users::upsert(&self.pool, &user).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        users::get_by_id(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        users::find_by_email(&self.pool, email).await
    }

    async fn get_all_users(&self) -> Result<Vec<User>> {
        users::get_all(&self.pool).await
    }

    // Votes
    async fn cast_vote(
        &self,
        voter_id: UserId,
        item_id: QueueItemId,
        direction: VoteDirection,
    ) -> Result<TallyDelta> {
        votes::cast(&self.pool, voter_id, item_id, direction).await
    }

    async fn recompute_tally(&self, item_id: QueueItemId) -> Result<Tally> {
        votes::recompute(&self.pool, item_id).await
    }

    // Queue mutation
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem> {
        queue::enqueue(&self.pool, &item).await
    }

    async fn advance(&self, finished: QueueItemId) -> Result<Option<QueueItem>> {
        queue::advance(&self.pool, finished).await
    }

    async fn promote(&self, item_id: QueueItemId) -> Result<QueueItem> {
        queue::promote(&self.pool, item_id).await
    }

    // Reads
    async fn get_item(&self, id: QueueItemId) -> Result<Option<QueueItem>> {
        queue::get_by_id(&self.pool, id).await
    }

    async fn current_order(&self) -> Result<Vec<QueueItem>> {
        queue::current_order(&self.pool).await
    }

    async fn head(&self) -> Result<Option<QueueItem>> {
        queue::head(&self.pool).await
    }

    async fn now_playing(&self) -> Result<Option<QueueItem>> {
        queue::now_playing(&self.pool).await
    }

    async fn snapshot(&self) -> Result<QueueSnapshot> {
        queue::snapshot(&self.pool).await
    }
}
