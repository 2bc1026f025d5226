/// Shared application state
use crate::services::{AuthService, QueueService};
use jukebox_storage::Database;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth_service: Arc<AuthService>,
    pub queue_service: Arc<QueueService>,
    /// Poll interval advertised with every snapshot
    pub poll_interval_ms: u64,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        auth_service: Arc<AuthService>,
        queue_service: Arc<QueueService>,
        poll_interval_ms: u64,
    ) -> Self {
        Self {
            db,
            auth_service,
            queue_service,
            poll_interval_ms,
        }
    }
}
