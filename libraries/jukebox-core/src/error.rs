/// Core error types for Jukebox
use crate::types::QueueItemId;
use thiserror::Error;

/// Result type alias using `JukeboxError`
pub type Result<T> = std::result::Result<T, JukeboxError>;

/// Core error type for Jukebox
///
/// Every queue operation surfaces one of these to its caller; nothing is retried
/// internally.
#[derive(Error, Debug)]
pub enum JukeboxError {
    /// Caller has no valid identity, or the identity is unknown
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Queue item does not exist
    #[error("Queue item not found: {0}")]
    QueueItemNotFound(QueueItemId),

    /// Queue item exists but no longer accepts the operation
    #[error("Queue item {0} has been removed")]
    QueueItemRemoved(QueueItemId),

    /// Submitted link could not be resolved to a playable item
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// A concurrent transaction won the race; the caller may retry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage or a collaborator could not be reached
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database errors (for storage implementations)
    #[error("Database error: {0}")]
    Database(String),
}

impl JukeboxError {
    /// Create an unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create an invalid source error
    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error means "the referenced item is gone or never existed"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::QueueItemNotFound(_) | Self::QueueItemRemoved(_))
    }

    /// Whether the caller may reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }
}

/// SQLite primary result codes that mean another connection holds the lock
#[cfg(feature = "sqlx-support")]
const SQLITE_BUSY: i32 = 5;
#[cfg(feature = "sqlx-support")]
const SQLITE_LOCKED: i32 = 6;

#[cfg(feature = "sqlx-support")]
impl From<sqlx::Error> for JukeboxError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return Self::Conflict(db_err.message().to_string());
                }

                // Extended result codes keep the primary code in the low byte
                let primary = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                if matches!(primary, Some(SQLITE_BUSY | SQLITE_LOCKED)) {
                    return Self::Conflict(db_err.message().to_string());
                }

                Self::Database(err.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}
