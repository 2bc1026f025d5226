/// Queue service - orchestrates the store and the metadata resolver
use jukebox_core::{
    JukeboxError, MetadataResolver, NewQueueItem, QueueItem, QueueItemId, QueueSnapshot,
    QueueStore, Result, Tally, TallyDelta, User, UserId, VoteDirection,
};
use serde::Serialize;
use std::sync::Arc;

/// Result of finishing an item
#[derive(Debug, Clone, Serialize)]
pub struct AdvanceResult {
    /// Top-ranked pending item right after the removal
    pub next: Option<QueueItem>,
    /// Item playing once the call returns
    pub now_playing: Option<QueueItem>,
}

/// Queue operations on behalf of an identified user
///
/// Every method takes the acting user explicitly and fails with `Unauthorized` if
/// that user is unknown.
pub struct QueueService {
    store: Arc<dyn QueueStore>,
    resolver: Arc<dyn MetadataResolver>,
}

impl QueueService {
    pub fn new(store: Arc<dyn QueueStore>, resolver: Arc<dyn MetadataResolver>) -> Self {
        Self { store, resolver }
    }

    async fn require_user(&self, user_id: UserId) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| JukeboxError::unauthorized(format!("Unknown user {}", user_id)))
    }

    /// Resolve a link and add it to the queue
    ///
    /// Nothing is written unless resolution succeeds, and the item is committed before
    /// this returns.
    pub async fn enqueue(&self, user_id: UserId, source_url: &str) -> Result<QueueItem> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(JukeboxError::invalid_input("Source URL cannot be empty"));
        }

        self.require_user(user_id).await?;

        let media = self.resolver.resolve(source_url).await.map_err(|e| {
            tracing::info!(user_id = %user_id, source_url, error = %e, "Submission rejected");
            e
        })?;

        self.store
            .enqueue(NewQueueItem::now(user_id, source_url, media))
            .await
    }

    /// Cast, retract or switch a vote
    pub async fn vote(
        &self,
        user_id: UserId,
        item_id: QueueItemId,
        direction: VoteDirection,
    ) -> Result<TallyDelta> {
        self.store.cast_vote(user_id, item_id, direction).await
    }

    /// Finish an item and start the next one if nothing is playing
    ///
    /// Repeating the call for the same item is safe: the removal is a no-op and the
    /// item already promoted keeps playing.
    pub async fn advance(&self, user_id: UserId, finished: QueueItemId) -> Result<AdvanceResult> {
        self.require_user(user_id).await?;

        let next = self.store.advance(finished).await?;
        let now_playing = self.promote_if_idle(next.as_ref()).await?;

        tracing::info!(
            user_id = %user_id,
            finished = %finished,
            now_playing = ?now_playing.as_ref().map(|item| item.id),
            "Advanced queue"
        );

        Ok(AdvanceResult { next, now_playing })
    }

    /// Start playback from the head if nothing is playing
    pub async fn start(&self, user_id: UserId) -> Result<Option<QueueItem>> {
        self.require_user(user_id).await?;

        let head = self.store.head().await?;
        self.promote_if_idle(head.as_ref()).await
    }

    /// Promote `candidate` unless something already plays
    ///
    /// A lost race is retried once against the fresh head; after that whatever is
    /// playing is reported.
    async fn promote_if_idle(&self, candidate: Option<&QueueItem>) -> Result<Option<QueueItem>> {
        let mut candidate = candidate.map(|item| item.id);

        for refresh_head in [false, true] {
            if let Some(playing) = self.store.now_playing().await? {
                return Ok(Some(playing));
            }
            if refresh_head {
                candidate = self.store.head().await?.map(|item| item.id);
            }
            let Some(id) = candidate else {
                return Ok(None);
            };

            match self.store.promote(id).await {
                Ok(item) => return Ok(Some(item)),
                // Another caller promoted first, or skipped the candidate
                Err(JukeboxError::Conflict(_) | JukeboxError::QueueItemRemoved(_)) => {
                    tracing::debug!(item_id = %id, "Promotion lost a race");
                }
                Err(e) => return Err(e),
            }
        }

        self.store.now_playing().await
    }

    /// Re-derive an item's tally from its ledger
    pub async fn recompute(&self, user_id: UserId, item_id: QueueItemId) -> Result<Tally> {
        self.require_user(user_id).await?;
        self.store.recompute_tally(item_id).await
    }

    pub async fn current_order(&self) -> Result<Vec<QueueItem>> {
        self.store.current_order().await
    }

    pub async fn head(&self) -> Result<Option<QueueItem>> {
        self.store.head().await
    }

    pub async fn snapshot(&self) -> Result<QueueSnapshot> {
        self.store.snapshot().await
    }
}
