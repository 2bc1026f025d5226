//! Jukebox Core
//!
//! Platform-agnostic types, traits, and error handling for the collaborative
//! playback queue.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `User`, `QueueItem`, `Vote`, `Tally`, `QueueSnapshot`
//! - **Vote toggling**: `VoteOutcome::decide` maps a cast onto insert / retract / switch
//! - **Ranking**: the pure projection that orders pending items and picks the head
//! - **Core Traits**: `QueueStore`, `MetadataResolver`
//! - **Error Handling**: unified `JukeboxError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use jukebox_core::types::{Tally, VoteDirection, VoteOutcome};
//!
//! let first = VoteOutcome::decide(None, VoteDirection::Up);
//! let again = VoteOutcome::decide(first.resulting_direction(), VoteDirection::Up);
//!
//! // Casting the same direction twice retracts the vote
//! assert_eq!(Tally::default().apply(first).apply(again), Tally::default());
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod ranking;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{JukeboxError, Result};
pub use storage::QueueStore;
pub use traits::MetadataResolver;

pub use types::{
    NewQueueItem, QueueItem, QueueItemId, QueueItemState, QueueSnapshot, ResolvedMedia,
    SnapshotDiff, Tally, TallyDelta, UpsertUser, User, UserId, Vote, VoteDirection, VoteId,
    VoteOutcome,
};
