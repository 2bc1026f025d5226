/// Storage setup errors
use thiserror::Error;

/// Errors raised while opening or migrating the database
///
/// Query-level failures are reported as [`jukebox_core::JukeboxError`].
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StorageError> for jukebox_core::JukeboxError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Connection(msg) => jukebox_core::JukeboxError::Unavailable(msg),
            StorageError::Migration(msg) => jukebox_core::JukeboxError::Database(msg),
            StorageError::Database(e) => e.into(),
        }
    }
}
