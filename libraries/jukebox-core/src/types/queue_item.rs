/// Queue item domain types
use super::{QueueItemId, Tally, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a queue item
///
/// `Pending -> Playing -> Removed`, or `Pending -> Removed` for items skipped before
/// they ever played. Nothing leaves `Removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueItemState {
    #[default]
    Pending,
    Playing,
    Removed,
}

impl QueueItemState {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Playing => "playing",
            Self::Removed => "removed",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "playing" => Some(Self::Playing),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }

    /// Whether the item still accepts votes
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Removed)
    }

    /// Whether the state machine allows moving to `next`
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Playing) | (Self::Pending, Self::Removed) | (Self::Playing, Self::Removed)
        )
    }
}

impl std::fmt::Display for QueueItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A submitted video link and its community tally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,

    /// Link exactly as submitted
    pub source_url: String,

    /// Playable identifier extracted from the link (e.g. a YouTube video id)
    pub media_id: String,

    pub title: Option<String>,
    pub thumbnail_url: Option<String>,

    pub submitter_id: UserId,
    pub submitter_name: String,

    /// Derived from the vote ledger; never written from user input
    pub upvotes: i64,
    pub downvotes: i64,

    pub submitted_at: DateTime<Utc>,
    pub state: QueueItemState,
}

impl QueueItem {
    /// Current tally pair
    pub fn tally(&self) -> Tally {
        Tally {
            upvotes: self.upvotes,
            downvotes: self.downvotes,
        }
    }
}

/// Metadata produced by a [`crate::MetadataResolver`] for a submitted link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub media_id: String,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Everything needed to insert a new pending item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueItem {
    pub submitter_id: UserId,
    pub source_url: String,
    pub media: ResolvedMedia,
    pub submitted_at: DateTime<Utc>,
}

impl NewQueueItem {
    /// New item stamped with the current time
    pub fn now(submitter_id: UserId, source_url: impl Into<String>, media: ResolvedMedia) -> Self {
        Self {
            submitter_id,
            source_url: source_url.into(),
            media,
            submitted_at: Utc::now(),
        }
    }
}
