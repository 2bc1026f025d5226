//! Queue items: submission, removal, promotion and ranked reads
//!
//! Every mutating function opens its own transaction and issues a write as the
//! first statement, so the `SQLite` write lock is held before any row is read.

use crate::{now_millis, users};
use jukebox_core::{
    ranking, JukeboxError, NewQueueItem, QueueItem, QueueItemId, QueueItemState, QueueSnapshot,
    Result,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

const ITEM_SELECT: &str = "SELECT q.id, q.source_url, q.media_id, q.title, q.thumbnail_url,
        q.submitter_id, u.display_name AS submitter_name, q.upvotes, q.downvotes,
        q.submitted_at, q.state
    FROM queue_items q
    JOIN users u ON u.id = q.submitter_id";

fn item_from_row(row: &SqliteRow) -> Result<QueueItem> {
    let state: String = row.try_get("state")?;
    let submitted_at: i64 = row.try_get("submitted_at")?;

    Ok(QueueItem {
        id: row.try_get("id")?,
        source_url: row.try_get("source_url")?,
        media_id: row.try_get("media_id")?,
        title: row.try_get("title")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        submitter_id: row.try_get("submitter_id")?,
        submitter_name: row.try_get("submitter_name")?,
        upvotes: row.try_get("upvotes")?,
        downvotes: row.try_get("downvotes")?,
        submitted_at: chrono::DateTime::from_timestamp_millis(submitted_at)
            .ok_or_else(|| JukeboxError::Database("Invalid timestamp".to_string()))?,
        state: QueueItemState::from_str(&state)
            .ok_or_else(|| JukeboxError::Database(format!("Unknown queue state: {}", state)))?,
    })
}

// ============================================================================
// Connection-level helpers (usable inside a caller's transaction)
// ============================================================================

/// Bump the queue revision and return the new value
///
/// Being a write, this also takes the database write lock for the rest of the
/// transaction.
pub(crate) async fn bump_revision(conn: &mut SqliteConnection) -> Result<i64> {
    let row = sqlx::query("UPDATE queue_meta SET revision = revision + 1 WHERE id = 1 RETURNING revision")
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.try_get("revision")?)
}

pub(crate) async fn revision(conn: &mut SqliteConnection) -> Result<i64> {
    let row = sqlx::query("SELECT revision FROM queue_meta WHERE id = 1")
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.try_get("revision")?)
}

/// State of an item, or `None` if the id was never issued
pub(crate) async fn state_of(
    conn: &mut SqliteConnection,
    id: QueueItemId,
) -> Result<Option<QueueItemState>> {
    let row = sqlx::query("SELECT state FROM queue_items WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| {
        let state: String = r.try_get("state")?;
        QueueItemState::from_str(&state)
            .ok_or_else(|| JukeboxError::Database(format!("Unknown queue state: {}", state)))
    })
    .transpose()
}

pub(crate) async fn fetch_item(
    conn: &mut SqliteConnection,
    id: QueueItemId,
) -> Result<Option<QueueItem>> {
    let row = sqlx::query(&format!("{ITEM_SELECT} WHERE q.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(item_from_row).transpose()
}

async fn fetch_in_state(
    conn: &mut SqliteConnection,
    state: QueueItemState,
) -> Result<Vec<QueueItem>> {
    let rows = sqlx::query(&format!("{ITEM_SELECT} WHERE q.state = ?"))
        .bind(state.as_str())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(item_from_row).collect()
}

async fn ranked_pending(conn: &mut SqliteConnection) -> Result<Vec<QueueItem>> {
    let pending = fetch_in_state(conn, QueueItemState::Pending).await?;
    Ok(ranking::rank(pending))
}

async fn playing(conn: &mut SqliteConnection) -> Result<Option<QueueItem>> {
    Ok(fetch_in_state(conn, QueueItemState::Playing)
        .await?
        .into_iter()
        .next())
}

// ============================================================================
// Mutations
// ============================================================================

/// Insert a resolved submission as a pending item with a zero tally
///
/// Fails with `Unauthorized` if the submitter does not exist. The item is committed
/// before this returns, so the next ranked read includes it.
pub async fn enqueue(pool: &SqlitePool, item: &NewQueueItem) -> Result<QueueItem> {
    let mut tx = pool.begin().await?;

    let revision = bump_revision(&mut tx).await?;
    users::ensure_exists(&mut tx, item.submitter_id).await?;

    let submitted_at = item.submitted_at.timestamp_millis();
    let result = sqlx::query(
        "INSERT INTO queue_items
            (source_url, media_id, title, thumbnail_url, submitter_id,
             upvotes, downvotes, submitted_at, state, state_changed_at)
         VALUES (?, ?, ?, ?, ?, 0, 0, ?, 'pending', ?)",
    )
    .bind(&item.source_url)
    .bind(&item.media.media_id)
    .bind(&item.media.title)
    .bind(&item.media.thumbnail_url)
    .bind(item.submitter_id)
    .bind(submitted_at)
    .bind(submitted_at)
    .execute(&mut *tx)
    .await?;

    let id = QueueItemId::new(result.last_insert_rowid());
    let created = fetch_item(&mut tx, id)
        .await?
        .ok_or(JukeboxError::QueueItemNotFound(id))?;

    tx.commit().await?;

    tracing::info!(
        item_id = %id,
        submitter_id = %item.submitter_id,
        media_id = %item.media.media_id,
        revision,
        "Item enqueued"
    );

    Ok(created)
}

/// Mark an item removed and return the new head
///
/// Removing an already-removed item changes nothing and is not an error. An id that
/// was never issued fails with `QueueItemNotFound`.
pub async fn advance(pool: &SqlitePool, finished: QueueItemId) -> Result<Option<QueueItem>> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query(
        "UPDATE queue_items SET state = 'removed', state_changed_at = ?
         WHERE id = ? AND state != 'removed'",
    )
    .bind(now_millis())
    .bind(finished)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed == 0 {
        if state_of(&mut tx, finished).await?.is_none() {
            return Err(JukeboxError::QueueItemNotFound(finished));
        }
        tracing::debug!(item_id = %finished, "Advance on already removed item");
    } else {
        let revision = bump_revision(&mut tx).await?;
        tracing::info!(item_id = %finished, revision, "Item removed from queue");
    }

    let head = ranked_pending(&mut tx).await?.into_iter().next();

    tx.commit().await?;

    Ok(head)
}

/// Move a pending item to playing
///
/// Promoting the item that is already playing returns it unchanged. Promoting while
/// a different item is playing fails with `Conflict`; removed items cannot play again.
pub async fn promote(pool: &SqlitePool, id: QueueItemId) -> Result<QueueItem> {
    let mut tx = pool.begin().await?;

    // The partial unique index on state = 'playing' rejects a second playing item
    let promoted = sqlx::query(
        "UPDATE queue_items SET state = 'playing', state_changed_at = ?
         WHERE id = ? AND state = 'pending'",
    )
    .bind(now_millis())
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            JukeboxError::conflict(format!("Cannot promote {}: another item is playing", id))
        }
        _ => JukeboxError::from(e),
    })?
    .rows_affected();

    if promoted == 0 {
        match state_of(&mut tx, id).await? {
            None => return Err(JukeboxError::QueueItemNotFound(id)),
            Some(QueueItemState::Removed) => return Err(JukeboxError::QueueItemRemoved(id)),
            Some(_) => {}
        }
    } else {
        let revision = bump_revision(&mut tx).await?;
        tracing::info!(item_id = %id, revision, "Item promoted to playing");
    }

    let item = fetch_item(&mut tx, id)
        .await?
        .ok_or(JukeboxError::QueueItemNotFound(id))?;

    tx.commit().await?;

    Ok(item)
}

// ============================================================================
// Reads
// ============================================================================

/// Get item by ID, in any state
pub async fn get_by_id(pool: &SqlitePool, id: QueueItemId) -> Result<Option<QueueItem>> {
    let mut conn = pool.acquire().await?;
    fetch_item(&mut conn, id).await
}

/// Pending items in rank order
pub async fn current_order(pool: &SqlitePool) -> Result<Vec<QueueItem>> {
    let mut conn = pool.acquire().await?;
    ranked_pending(&mut conn).await
}

/// Top-ranked pending item
pub async fn head(pool: &SqlitePool) -> Result<Option<QueueItem>> {
    let mut conn = pool.acquire().await?;
    let pending = fetch_in_state(&mut conn, QueueItemState::Pending).await?;
    Ok(ranking::head(pending))
}

/// The item currently playing
pub async fn now_playing(pool: &SqlitePool) -> Result<Option<QueueItem>> {
    let mut conn = pool.acquire().await?;
    playing(&mut conn).await
}

/// Ids of every item that still accepts votes
pub async fn active_ids(pool: &SqlitePool) -> Result<Vec<QueueItemId>> {
    let rows = sqlx::query("SELECT id FROM queue_items WHERE state != 'removed' ORDER BY id")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| row.try_get("id").map_err(JukeboxError::from))
        .collect()
}

/// Revision, ranked order and now playing, read inside one transaction
pub async fn snapshot(pool: &SqlitePool) -> Result<QueueSnapshot> {
    let mut tx = pool.begin().await?;

    let revision = revision(&mut tx).await?;
    let order = ranked_pending(&mut tx).await?;
    let now_playing = playing(&mut tx).await?;

    tx.commit().await?;

    Ok(QueueSnapshot {
        revision,
        order,
        now_playing,
        generated_at: chrono::Utc::now(),
    })
}
