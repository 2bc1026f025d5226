//! Queue ranking
//!
//! Pending items are ordered by upvotes (most first), then by submission time
//! (earliest first), then by id. The id tie-break only matters when two items
//! share a timestamp, and keeps the order a total, deterministic function of the
//! stored rows.

use crate::types::{QueueItem, QueueItemState};
use std::cmp::Ordering;

/// Rank comparison between two items
pub fn compare(a: &QueueItem, b: &QueueItem) -> Ordering {
    b.upvotes
        .cmp(&a.upvotes)
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Project the current order from a set of items
///
/// Items that are not `Pending` are dropped.
pub fn rank(items: impl IntoIterator<Item = QueueItem>) -> Vec<QueueItem> {
    let mut pending: Vec<QueueItem> = items
        .into_iter()
        .filter(|item| item.state == QueueItemState::Pending)
        .collect();
    pending.sort_by(compare);
    pending
}

/// The item that would play next, if any
pub fn head(items: impl IntoIterator<Item = QueueItem>) -> Option<QueueItem> {
    items
        .into_iter()
        .filter(|item| item.state == QueueItemState::Pending)
        .min_by(compare)
}
