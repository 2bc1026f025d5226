/// Queue service tests
/// Exercises the service against a real database and a mocked metadata resolver
mod common;

use async_trait::async_trait;
use common::{create_test_database, fixtures, OfflineResolver};
use jukebox_core::{
    JukeboxError, MetadataResolver, NewQueueItem, QueueItem, QueueItemId, QueueItemState,
    QueueSnapshot, QueueStore, ResolvedMedia, Tally, TallyDelta, UpsertUser, User, UserId,
    VoteDirection,
};
use jukebox_server::services::QueueService;
use jukebox_storage::Database;
use mockall::mock;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tempfile::TempDir;

mock! {
    pub Resolver {}

    #[async_trait]
    impl MetadataResolver for Resolver {
        async fn resolve(&self, source_url: &str) -> jukebox_core::Result<ResolvedMedia>;
    }
}

fn media(id: &str) -> ResolvedMedia {
    ResolvedMedia {
        media_id: id.to_string(),
        title: Some(format!("Video {}", id)),
        thumbnail_url: None,
    }
}

async fn user(db: &Database, email: &str, name: &str) -> User {
    db.upsert_user(UpsertUser::new(email, name)).await.unwrap()
}

async fn offline_service() -> (QueueService, Arc<Database>, TempDir) {
    let (db, temp_dir) = create_test_database().await.unwrap();
    let service = QueueService::new(db.clone(), Arc::new(OfflineResolver));
    (service, db, temp_dir)
}

// =============================================================================
// Enqueue
// =============================================================================

#[tokio::test]
async fn test_enqueue_resolves_then_inserts() {
    let (db, _temp_dir) = create_test_database().await.unwrap();
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;

    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve()
        .times(1)
        .returning(|url| {
            assert_eq!(url, fixtures::LINK_A);
            Ok(media("aaaaaaaaaaa"))
        });

    let service = QueueService::new(db.clone(), Arc::new(resolver));
    let item = service
        .enqueue(alice.id, &format!("  {}  ", fixtures::LINK_A))
        .await
        .unwrap();

    assert_eq!(item.media_id, "aaaaaaaaaaa");
    assert_eq!(item.source_url, fixtures::LINK_A);
    assert_eq!(item.submitter_name, fixtures::TEST_NAME);
    assert_eq!(item.state, QueueItemState::Pending);
    assert_eq!(service.head().await.unwrap().map(|i| i.id), Some(item.id));
}

#[tokio::test]
async fn test_enqueue_resolver_unavailable_writes_nothing() {
    let (db, _temp_dir) = create_test_database().await.unwrap();
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;
    let before = db.snapshot().await.unwrap();

    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve()
        .times(1)
        .returning(|_| Err(JukeboxError::unavailable("oEmbed timed out")));

    let service = QueueService::new(db.clone(), Arc::new(resolver));
    let result = service.enqueue(alice.id, fixtures::LINK_A).await;

    assert!(matches!(result, Err(JukeboxError::Unavailable(_))));
    let after = db.snapshot().await.unwrap();
    assert!(after.order.is_empty());
    assert_eq!(after.revision, before.revision);
}

#[tokio::test]
async fn test_enqueue_invalid_source_writes_nothing() {
    let (db, _temp_dir) = create_test_database().await.unwrap();
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;

    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve()
        .times(1)
        .returning(|_| Err(JukeboxError::invalid_source("private video")));

    let service = QueueService::new(db.clone(), Arc::new(resolver));
    let result = service.enqueue(alice.id, fixtures::LINK_A).await;

    assert!(matches!(result, Err(JukeboxError::InvalidSource(_))));
    assert!(db.current_order().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_enqueue_unknown_user_skips_resolver() {
    let (db, _temp_dir) = create_test_database().await.unwrap();

    let mut resolver = MockResolver::new();
    resolver.expect_resolve().times(0);

    let service = QueueService::new(db.clone(), Arc::new(resolver));
    let result = service
        .enqueue(jukebox_core::UserId::new(77), fixtures::LINK_A)
        .await;

    assert!(matches!(result, Err(JukeboxError::Unauthorized(_))));
}

#[tokio::test]
async fn test_enqueue_blank_link_rejected() {
    let (service, db, _temp_dir) = offline_service().await;
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;

    let result = service.enqueue(alice.id, "   ").await;
    assert!(matches!(result, Err(JukeboxError::InvalidInput(_))));
}

// =============================================================================
// Voting and ranking
// =============================================================================

#[tokio::test]
async fn test_upvotes_reorder_and_toggle_off() {
    let (service, db, _temp_dir) = offline_service().await;
    let submitter = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;
    let voters = [
        user(&db, "v1@example.com", "V1").await,
        user(&db, "v2@example.com", "V2").await,
        user(&db, "v3@example.com", "V3").await,
    ];

    let a = service.enqueue(submitter.id, fixtures::LINK_A).await.unwrap();
    let b = service.enqueue(submitter.id, fixtures::LINK_B).await.unwrap();
    assert_eq!(service.head().await.unwrap().unwrap().id, a.id);

    for voter in &voters {
        service
            .vote(voter.id, b.id, VoteDirection::Up)
            .await
            .unwrap();
    }
    assert_eq!(service.head().await.unwrap().unwrap().id, b.id);

    // One voter toggles off
    let delta = service
        .vote(voters[0].id, b.id, VoteDirection::Up)
        .await
        .unwrap();
    assert_eq!(delta.tally, Tally::new(2, 0));
    assert_eq!(service.head().await.unwrap().unwrap().id, b.id);

    let order: Vec<_> = service
        .current_order()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(order, vec![b.id, a.id]);
}

#[tokio::test]
async fn test_recompute_matches_incremental_tally() {
    let (service, db, _temp_dir) = offline_service().await;
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;
    let bob = user(&db, fixtures::OTHER_EMAIL, fixtures::OTHER_NAME).await;

    let item = service.enqueue(alice.id, fixtures::LINK_A).await.unwrap();
    service.vote(alice.id, item.id, VoteDirection::Up).await.unwrap();
    service.vote(bob.id, item.id, VoteDirection::Down).await.unwrap();
    let last = service.vote(bob.id, item.id, VoteDirection::Up).await.unwrap();

    let recomputed = service.recompute(alice.id, item.id).await.unwrap();
    assert_eq!(recomputed, last.tally);
    assert_eq!(recomputed, Tally::new(2, 0));
}

// =============================================================================
// Playback
// =============================================================================

#[tokio::test]
async fn test_start_promotes_head_once() {
    let (service, db, _temp_dir) = offline_service().await;
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;

    assert!(service.start(alice.id).await.unwrap().is_none());

    let a = service.enqueue(alice.id, fixtures::LINK_A).await.unwrap();
    let b = service.enqueue(alice.id, fixtures::LINK_B).await.unwrap();

    let playing = service.start(alice.id).await.unwrap().unwrap();
    assert_eq!(playing.id, a.id);
    assert_eq!(playing.state, QueueItemState::Playing);

    // Starting again keeps the current item
    let again = service.start(alice.id).await.unwrap().unwrap();
    assert_eq!(again.id, a.id);
    assert_eq!(service.head().await.unwrap().unwrap().id, b.id);
}

#[tokio::test]
async fn test_advance_head_promotes_next() {
    let (service, db, _temp_dir) = offline_service().await;
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;
    let bob = user(&db, fixtures::OTHER_EMAIL, fixtures::OTHER_NAME).await;

    let a = service.enqueue(alice.id, fixtures::LINK_A).await.unwrap();
    let b = service.enqueue(alice.id, fixtures::LINK_B).await.unwrap();
    service.vote(bob.id, b.id, VoteDirection::Up).await.unwrap();
    assert_eq!(service.head().await.unwrap().unwrap().id, b.id);

    let result = service.advance(alice.id, b.id).await.unwrap();

    assert_eq!(result.next.as_ref().map(|i| i.id), Some(a.id));
    assert_eq!(result.now_playing.as_ref().map(|i| i.id), Some(a.id));
    let removed = db.get_item(b.id).await.unwrap().unwrap();
    assert_eq!(removed.state, QueueItemState::Removed);
}

#[tokio::test]
async fn test_advance_is_safe_to_repeat() {
    let (service, db, _temp_dir) = offline_service().await;
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;

    let a = service.enqueue(alice.id, fixtures::LINK_A).await.unwrap();
    let b = service.enqueue(alice.id, fixtures::LINK_B).await.unwrap();
    service.start(alice.id).await.unwrap();

    let first = service.advance(alice.id, a.id).await.unwrap();
    let second = service.advance(alice.id, a.id).await.unwrap();

    assert_eq!(first.now_playing.as_ref().map(|i| i.id), Some(b.id));
    assert_eq!(second.now_playing.as_ref().map(|i| i.id), Some(b.id));
    assert!(second.next.is_none());
}

#[tokio::test]
async fn test_advance_unknown_item() {
    let (service, db, _temp_dir) = offline_service().await;
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;

    let result = service
        .advance(alice.id, jukebox_core::QueueItemId::new(999))
        .await;
    assert!(matches!(result, Err(JukeboxError::QueueItemNotFound(_))));
}

#[tokio::test]
async fn test_advance_requires_known_user() {
    let (service, db, _temp_dir) = offline_service().await;
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;
    let item = service.enqueue(alice.id, fixtures::LINK_A).await.unwrap();

    let result = service
        .advance(jukebox_core::UserId::new(999), item.id)
        .await;
    assert!(matches!(result, Err(JukeboxError::Unauthorized(_))));
    assert_eq!(
        db.get_item(item.id).await.unwrap().unwrap().state,
        QueueItemState::Pending
    );
}

/// Store that lets another listener skip the promotion candidate first, once
struct SkippedBeforePromote {
    inner: Arc<Database>,
    armed: AtomicBool,
}

#[async_trait]
impl QueueStore for SkippedBeforePromote {
    async fn upsert_user(&self, user: UpsertUser) -> jukebox_core::Result<User> {
        self.inner.upsert_user(user).await
    }

    async fn get_user(&self, id: UserId) -> jukebox_core::Result<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> jukebox_core::Result<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn get_all_users(&self) -> jukebox_core::Result<Vec<User>> {
        self.inner.get_all_users().await
    }

    async fn cast_vote(
        &self,
        voter_id: UserId,
        item_id: QueueItemId,
        direction: VoteDirection,
    ) -> jukebox_core::Result<TallyDelta> {
        self.inner.cast_vote(voter_id, item_id, direction).await
    }

    async fn recompute_tally(&self, item_id: QueueItemId) -> jukebox_core::Result<Tally> {
        self.inner.recompute_tally(item_id).await
    }

    async fn enqueue(&self, item: NewQueueItem) -> jukebox_core::Result<QueueItem> {
        self.inner.enqueue(item).await
    }

    async fn advance(&self, finished: QueueItemId) -> jukebox_core::Result<Option<QueueItem>> {
        self.inner.advance(finished).await
    }

    async fn promote(&self, item_id: QueueItemId) -> jukebox_core::Result<QueueItem> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.inner.advance(item_id).await?;
        }
        self.inner.promote(item_id).await
    }

    async fn get_item(&self, id: QueueItemId) -> jukebox_core::Result<Option<QueueItem>> {
        self.inner.get_item(id).await
    }

    async fn current_order(&self) -> jukebox_core::Result<Vec<QueueItem>> {
        self.inner.current_order().await
    }

    async fn head(&self) -> jukebox_core::Result<Option<QueueItem>> {
        self.inner.head().await
    }

    async fn now_playing(&self) -> jukebox_core::Result<Option<QueueItem>> {
        self.inner.now_playing().await
    }

    async fn snapshot(&self) -> jukebox_core::Result<QueueSnapshot> {
        self.inner.snapshot().await
    }
}

#[tokio::test]
async fn test_advance_recovers_when_next_is_skipped_concurrently() {
    let (db, _temp_dir) = create_test_database().await.unwrap();
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;

    let setup = QueueService::new(db.clone(), Arc::new(OfflineResolver));
    let a = setup.enqueue(alice.id, fixtures::LINK_A).await.unwrap();
    let b = setup.enqueue(alice.id, fixtures::LINK_B).await.unwrap();
    let c = setup.enqueue(alice.id, fixtures::LINK_C).await.unwrap();
    setup.start(alice.id).await.unwrap();

    let store = Arc::new(SkippedBeforePromote {
        inner: db.clone(),
        armed: AtomicBool::new(true),
    });
    let service = QueueService::new(store, Arc::new(OfflineResolver));

    // B is next when A finishes, but is skipped before it can be promoted
    let result = service.advance(alice.id, a.id).await.unwrap();

    assert_eq!(result.next.as_ref().map(|i| i.id), Some(b.id));
    assert_eq!(result.now_playing.as_ref().map(|i| i.id), Some(c.id));
    assert_eq!(
        db.get_item(b.id).await.unwrap().unwrap().state,
        QueueItemState::Removed
    );
    assert_eq!(
        db.get_item(a.id).await.unwrap().unwrap().state,
        QueueItemState::Removed
    );
}

#[tokio::test]
async fn test_advance_reports_nothing_playing_when_last_item_skipped() {
    let (db, _temp_dir) = create_test_database().await.unwrap();
    let alice = user(&db, fixtures::TEST_EMAIL, fixtures::TEST_NAME).await;

    let setup = QueueService::new(db.clone(), Arc::new(OfflineResolver));
    let a = setup.enqueue(alice.id, fixtures::LINK_A).await.unwrap();
    let b = setup.enqueue(alice.id, fixtures::LINK_B).await.unwrap();
    setup.start(alice.id).await.unwrap();

    let store = Arc::new(SkippedBeforePromote {
        inner: db.clone(),
        armed: AtomicBool::new(true),
    });
    let service = QueueService::new(store, Arc::new(OfflineResolver));

    let result = service.advance(alice.id, a.id).await.unwrap();

    assert_eq!(result.next.as_ref().map(|i| i.id), Some(b.id));
    assert!(result.now_playing.is_none());
    assert!(db.current_order().await.unwrap().is_empty());
}
