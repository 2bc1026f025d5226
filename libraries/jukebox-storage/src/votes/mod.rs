//! Vote ledger and tally maintenance
//!
//! Tallies are kept incrementally: the toggle decision for a cast yields the exact
//! up/down deltas, applied in the same transaction as the ledger change.
//! [`recompute`] re-derives a tally from the ledger and is the drift check.

use crate::{queue, users};
use jukebox_core::{
    JukeboxError, QueueItemId, QueueItemState, Result, Tally, TallyDelta, UserId, Vote,
    VoteDirection, VoteOutcome,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

fn vote_from_row(row: &SqliteRow) -> Result<Vote> {
    let direction: bool = row.try_get("direction")?;

    Ok(Vote {
        id: row.try_get("id")?,
        voter_id: row.try_get("voter_id")?,
        queue_item_id: row.try_get("queue_item_id")?,
        direction: VoteDirection::from_bool(direction),
    })
}

fn tally_from_row(row: &SqliteRow) -> Result<Tally> {
    Ok(Tally::new(row.try_get("upvotes")?, row.try_get("downvotes")?))
}

async fn fetch_vote(
    conn: &mut SqliteConnection,
    voter_id: UserId,
    item_id: QueueItemId,
) -> Result<Option<Vote>> {
    let row = sqlx::query(
        "SELECT id, voter_id, queue_item_id, direction
         FROM votes WHERE voter_id = ? AND queue_item_id = ?",
    )
    .bind(voter_id)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(vote_from_row).transpose()
}

/// Cast a vote
///
/// - no existing vote: insert it
/// - same direction as the existing vote: delete it
/// - opposite direction: overwrite it
///
/// The ledger change and the tally update commit together. Fails with
/// `QueueItemNotFound`/`QueueItemRemoved` unless the item is pending or playing, and
/// with `Unauthorized` if the voter is unknown.
pub async fn cast(
    pool: &SqlitePool,
    voter_id: UserId,
    item_id: QueueItemId,
    direction: VoteDirection,
) -> Result<TallyDelta> {
    let mut tx = pool.begin().await?;

    // Take the write lock before reading the ledger
    let revision = queue::bump_revision(&mut tx).await?;

    users::ensure_exists(&mut tx, voter_id).await?;

    match queue::state_of(&mut tx, item_id).await? {
        None => return Err(JukeboxError::QueueItemNotFound(item_id)),
        Some(QueueItemState::Removed) => return Err(JukeboxError::QueueItemRemoved(item_id)),
        Some(QueueItemState::Pending | QueueItemState::Playing) => {}
    }

    let existing = fetch_vote(&mut tx, voter_id, item_id).await?;
    let outcome = VoteOutcome::decide(existing.as_ref().map(|v| v.direction), direction);
    let now = crate::now_millis();

    match (outcome, existing) {
        (VoteOutcome::Inserted { direction }, _) => {
            sqlx::query(
                "INSERT INTO votes (voter_id, queue_item_id, direction, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(voter_id)
            .bind(item_id)
            .bind(direction.is_up())
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        (VoteOutcome::Retracted { .. }, Some(vote)) => {
            sqlx::query("DELETE FROM votes WHERE id = ?")
                .bind(vote.id)
                .execute(&mut *tx)
                .await?;
        }
        (VoteOutcome::Switched { to, .. }, Some(vote)) => {
            sqlx::query("UPDATE votes SET direction = ?, updated_at = ? WHERE id = ?")
                .bind(to.is_up())
                .bind(now)
                .bind(vote.id)
                .execute(&mut *tx)
                .await?;
        }
        (_, None) => {
            return Err(JukeboxError::Database(
                "Vote outcome requires an existing ledger row".to_string(),
            ))
        }
    }

    let (up_delta, down_delta) = outcome.deltas();
    let row = sqlx::query(
        "UPDATE queue_items
         SET upvotes = upvotes + ?, downvotes = downvotes + ?
         WHERE id = ?
         RETURNING upvotes, downvotes",
    )
    .bind(up_delta)
    .bind(down_delta)
    .bind(item_id)
    .fetch_one(&mut *tx)
    .await?;
    let tally = tally_from_row(&row)?;

    tx.commit().await?;

    tracing::info!(
        voter_id = %voter_id,
        item_id = %item_id,
        direction = %direction,
        outcome = ?outcome,
        upvotes = tally.upvotes,
        downvotes = tally.downvotes,
        revision,
        "Vote cast"
    );

    Ok(TallyDelta::new(item_id, outcome, tally))
}

/// Stored tally next to the ledger count that replaced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyRepair {
    pub stored: Tally,
    pub ledger: Tally,
}

impl TallyRepair {
    pub fn drifted(&self) -> bool {
        self.stored != self.ledger
    }
}

/// Re-derive an item's tally from the ledger and store it
///
/// Works for items in any state.
pub async fn recompute(pool: &SqlitePool, item_id: QueueItemId) -> Result<Tally> {
    Ok(repair(pool, item_id).await?.ledger)
}

/// Like [`recompute`], also reporting the tally it overwrote
///
/// Both values are read under the same write lock, so a vote committing alongside
/// never shows up as drift.
pub async fn repair(pool: &SqlitePool, item_id: QueueItemId) -> Result<TallyRepair> {
    let mut tx = pool.begin().await?;

    queue::bump_revision(&mut tx).await?;

    let stored = sqlx::query("SELECT upvotes, downvotes FROM queue_items WHERE id = ?")
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(JukeboxError::QueueItemNotFound(item_id))?;
    let stored = tally_from_row(&stored)?;

    let row = sqlx::query(
        "UPDATE queue_items SET
            upvotes = (SELECT COUNT(*) FROM votes
                       WHERE votes.queue_item_id = queue_items.id AND votes.direction = 1),
            downvotes = (SELECT COUNT(*) FROM votes
                         WHERE votes.queue_item_id = queue_items.id AND votes.direction = 0)
         WHERE id = ?
         RETURNING upvotes, downvotes",
    )
    .bind(item_id)
    .fetch_one(&mut *tx)
    .await?;
    let ledger = tally_from_row(&row)?;

    tx.commit().await?;

    let repair = TallyRepair { stored, ledger };
    if repair.drifted() {
        tracing::warn!(
            item_id = %item_id,
            stored_up = stored.upvotes,
            stored_down = stored.downvotes,
            ledger_up = ledger.upvotes,
            ledger_down = ledger.downvotes,
            "Tally drift repaired"
        );
    } else {
        tracing::debug!(item_id = %item_id, upvotes = ledger.upvotes, downvotes = ledger.downvotes, "Tally recomputed");
    }

    Ok(repair)
}

/// Count the ledger rows for an item without touching the stored tally
pub async fn ledger_tally(pool: &SqlitePool, item_id: QueueItemId) -> Result<Tally> {
    let row = sqlx::query(
        "SELECT
            COALESCE(SUM(CASE WHEN direction = 1 THEN 1 ELSE 0 END), 0) AS upvotes,
            COALESCE(SUM(CASE WHEN direction = 0 THEN 1 ELSE 0 END), 0) AS downvotes
         FROM votes WHERE queue_item_id = ?",
    )
    .bind(item_id)
    .fetch_one(pool)
    .await?;

    tally_from_row(&row)
}

/// The voter's current vote on an item
pub async fn get(
    pool: &SqlitePool,
    voter_id: UserId,
    item_id: QueueItemId,
) -> Result<Option<Vote>> {
    let mut conn = pool.acquire().await?;
    fetch_vote(&mut conn, voter_id, item_id).await
}

/// All ledger rows for an item
pub async fn get_for_item(pool: &SqlitePool, item_id: QueueItemId) -> Result<Vec<Vote>> {
    let rows = sqlx::query(
        "SELECT id, voter_id, queue_item_id, direction
         FROM votes WHERE queue_item_id = ? ORDER BY id",
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(vote_from_row).collect()
}
