//! Jukebox Storage
//!
//! `SQLite` database layer for the collaborative playback queue.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each feature (`users`, `queue`, `votes`) owns its own queries
//! - **One transaction per operation**: every mutation is all-or-nothing and takes the
//!   write lock with its first statement, so per-item read-modify-write never loses
//!   updates
//! - **Revision counter**: every committed mutation bumps `queue_meta.revision`
//!
//! # Example
//!
//! ```rust,no_run
//! use jukebox_storage::{LocalStorageContext, PoolSettings, create_pool, run_migrations};
//! use jukebox_core::QueueStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://jukebox.db", &PoolSettings::default()).await?;
//! run_migrations(&pool).await?;
//!
//! let storage = LocalStorageContext::new(pool);
//! let snapshot = storage.snapshot().await?;
//! println!("{} items waiting", snapshot.order.len());
//! # Ok(())
//! # }
//! ```

mod context;
mod error;

// Vertical slices
pub mod queue;
pub mod users;
pub mod votes;

pub use context::LocalStorageContext;
pub use error::StorageError;

// Type alias used by the server
pub type Database = LocalStorageContext;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use std::time::Duration;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connection pool tuning
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,

    /// How long a writer waits for the lock before the operation fails with a conflict
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://jukebox.db>`)
/// * `settings` - pool size and lock wait
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(
    database_url: &str,
    settings: &PoolSettings,
) -> Result<SqlitePool, StorageError> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(settings.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    tracing::info!(
        max_connections = settings.max_connections,
        busy_timeout_ms = settings.busy_timeout.as_millis() as u64,
        "SQLite pool ready"
    );

    Ok(pool)
}

/// Current time as Unix epoch milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
