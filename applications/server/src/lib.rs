//! Jukebox Server Library
//!
//! Collaborative playback queue server: submissions, voting, ranked playback and
//! polling snapshots behind JWT authentication.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use router::create_router;
pub use services::{auth::AuthService, queue::QueueService};
pub use state::AppState;
