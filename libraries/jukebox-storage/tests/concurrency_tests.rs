//! Concurrent casts and mutations against one file-backed database
//!
//! Writers serialize on the `SQLite` write lock; a cast that waits past the busy
//! timeout surfaces as `Conflict` and is retried here the way a client would.


use jukebox_core::types::*;
use jukebox_core::{JukeboxError, Result};
use jukebox_storage::{queue, votes};
use sqlx::SqlitePool;
use test_helpers::*;

async fn cast_with_retry(
    pool: &SqlitePool,
    voter: UserId,
    item: QueueItemId,
    direction: VoteDirection,
) -> Result<TallyDelta> {
    let mut attempts = 0;
    loop {
        match votes::cast(pool, voter, item, direction).await {
            Err(e) if e.is_retryable() && attempts < 10 => {
                attempts += 1;
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            }
            other => return other,
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_voters_on_one_item() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool().clone();

    let submitter = create_test_user(&pool, "submitter").await;
    let item_id = create_test_item(&pool, submitter, "dQw4w9WgXcQ").await.id;

    let mut voters = Vec::new();
    for i in 0..20 {
        voters.push(create_test_user(&pool, &format!("voter{}", i)).await);
    }

    let handles: Vec<_> = voters
        .iter()
        .enumerate()
        .map(|(i, &voter)| {
            let pool = pool.clone();
            let direction = if i % 4 == 0 {
                VoteDirection::Down
            } else {
                VoteDirection::Up
            };
            tokio::spawn(async move { cast_with_retry(&pool, voter, item_id, direction).await })
        })
        .collect();

    for handle in handles {
        handle.await.expect("Task panicked").expect("Vote failed");
    }

    let stored = queue::get_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(stored.tally(), Tally::new(15, 5));
    assert_eq!(votes::ledger_tally(&pool, item_id).await.unwrap(), stored.tally());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_by_one_voter() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool().clone();

    let alice = create_test_user(&pool, "alice").await;
    let item_id = create_test_item(&pool, alice, "dQw4w9WgXcQ").await.id;

    // An even number of identical casts always nets out to no vote
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(
                async move { cast_with_retry(&pool, alice, item_id, VoteDirection::Up).await },
            )
        })
        .collect();

    for handle in handles {
        handle.await.expect("Task panicked").expect("Vote failed");
    }

    assert!(votes::get(&pool, alice, item_id).await.unwrap().is_none());
    let stored = queue::get_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(stored.tally(), Tally::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_votes_racing_advance() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool().clone();

    let alice = create_test_user(&pool, "alice").await;
    let item_id = create_test_item(&pool, alice, "dQw4w9WgXcQ").await.id;

    let mut voters = Vec::new();
    for i in 0..10 {
        voters.push(create_test_user(&pool, &format!("voter{}", i)).await);
    }

    let advance = {
        let pool = pool.clone();
        tokio::spawn(async move { queue::advance(&pool, item_id).await })
    };
    let casts: Vec<_> = voters
        .iter()
        .map(|&voter| {
            let pool = pool.clone();
            tokio::spawn(
                async move { cast_with_retry(&pool, voter, item_id, VoteDirection::Up).await },
            )
        })
        .collect();

    advance.await.expect("Task panicked").expect("Advance failed");

    let mut accepted = 0;
    for handle in casts {
        match handle.await.expect("Task panicked") {
            Ok(_) => accepted += 1,
            Err(JukeboxError::QueueItemRemoved(_)) => {}
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    // Every accepted cast landed before the removal and is counted
    let stored = queue::get_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(stored.state, QueueItemState::Removed);
    assert_eq!(stored.upvotes, accepted);
    assert_eq!(votes::ledger_tally(&pool, item_id).await.unwrap(), stored.tally());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_enqueue_racing_advance_is_visible_immediately() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool().clone();

    let alice = create_test_user(&pool, "alice").await;
    let finished = create_test_item(&pool, alice, "dQw4w9WgXcQ").await.id;

    let advance = {
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut attempts = 0;
            loop {
                match queue::advance(&pool, finished).await {
                    Err(e) if e.is_retryable() && attempts < 10 => {
                        attempts += 1;
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    }
                    other => return other,
                }
            }
        })
    };
    let submissions: Vec<_> = (0..6)
        .map(|i| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let media_id = format!("submission{}", i);
                let new_item = NewQueueItem::now(
                    alice,
                    format!("https://youtu.be/{}", media_id),
                    test_media(&media_id),
                );

                let mut attempts = 0;
                let item = loop {
                    match queue::enqueue(&pool, &new_item).await {
                        Err(e) if e.is_retryable() && attempts < 10 => {
                            attempts += 1;
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        }
                        other => break other?,
                    }
                };

                // The very next read sees the submission
                let order = queue::current_order(&pool).await?;
                Ok::<_, JukeboxError>((item.id, ids(&order)))
            })
        })
        .collect();

    advance.await.expect("Task panicked").expect("Advance failed");

    let mut enqueued = Vec::new();
    for handle in submissions {
        let (id, order) = handle.await.expect("Task panicked").expect("Enqueue failed");
        assert!(order.contains(&id), "{} missing from {:?}", id, order);
        enqueued.push(id);
    }

    let order = ids(&queue::current_order(&pool).await.unwrap());
    assert!(!order.contains(&finished));
    for id in &enqueued {
        assert!(order.contains(id));
    }
    assert_eq!(order.len(), enqueued.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repair_during_votes_reports_no_drift() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool().clone();

    let submitter = create_test_user(&pool, "submitter").await;
    let item_id = create_test_item(&pool, submitter, "dQw4w9WgXcQ").await.id;

    let mut voters = Vec::new();
    for i in 0..12 {
        voters.push(create_test_user(&pool, &format!("voter{}", i)).await);
    }

    let casts: Vec<_> = voters
        .iter()
        .map(|&voter| {
            let pool = pool.clone();
            tokio::spawn(
                async move { cast_with_retry(&pool, voter, item_id, VoteDirection::Up).await },
            )
        })
        .collect();
    let repairs: Vec<_> = (0..6)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let mut attempts = 0;
                loop {
                    match votes::repair(&pool, item_id).await {
                        Err(e) if e.is_retryable() && attempts < 10 => {
                            attempts += 1;
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        }
                        other => return other,
                    }
                }
            })
        })
        .collect();

    for handle in casts {
        handle.await.expect("Task panicked").expect("Vote failed");
    }
    for handle in repairs {
        let repair = handle.await.expect("Task panicked").expect("Repair failed");
        assert!(!repair.drifted(), "spurious drift: {:?}", repair);
    }

    let stored = queue::get_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(stored.tally(), Tally::new(12, 0));
}
