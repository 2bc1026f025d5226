//! Queue snapshots served to polling clients

use super::{QueueItem, QueueItemId, Tally};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Consistent view of the queue taken in a single read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Bumped by every committed queue mutation
    pub revision: i64,

    /// Pending items in rank order
    pub order: Vec<QueueItem>,

    pub now_playing: Option<QueueItem>,

    pub generated_at: DateTime<Utc>,
}

impl QueueSnapshot {
    /// The pending item that would be promoted next
    pub fn head(&self) -> Option<&QueueItem> {
        self.order.first()
    }
}

/// Changes between two snapshots, keyed by item id rather than position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub added: Vec<QueueItemId>,
    pub removed: Vec<QueueItemId>,
    pub retallied: Vec<(QueueItemId, Tally)>,
    pub now_playing_changed: bool,
}

impl SnapshotDiff {
    /// Compute what changed from `old` to `new`
    ///
    /// Positions are ignored: re-ranking alone is not a change, only membership and
    /// tallies are.
    pub fn between(old: &QueueSnapshot, new: &QueueSnapshot) -> Self {
        let previous: HashMap<QueueItemId, Tally> =
            old.order.iter().map(|item| (item.id, item.tally())).collect();
        let current: HashMap<QueueItemId, Tally> =
            new.order.iter().map(|item| (item.id, item.tally())).collect();

        let added = new
            .order
            .iter()
            .filter(|item| !previous.contains_key(&item.id))
            .map(|item| item.id)
            .collect();

        let removed = old
            .order
            .iter()
            .filter(|item| !current.contains_key(&item.id))
            .map(|item| item.id)
            .collect();

        let retallied = new
            .order
            .iter()
            .filter_map(|item| match previous.get(&item.id) {
                Some(before) if *before != item.tally() => Some((item.id, item.tally())),
                _ => None,
            })
            .collect();

        let playing_id = |s: &QueueSnapshot| s.now_playing.as_ref().map(|item| item.id);

        Self {
            added,
            removed,
            retallied,
            now_playing_changed: playing_id(old) != playing_id(new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.retallied.is_empty()
            && !self.now_playing_changed
    }
}
