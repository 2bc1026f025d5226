/// Server services
pub mod auth;
pub mod queue;

pub use auth::{AuthService, Identity};
pub use queue::{AdvanceResult, QueueService};
