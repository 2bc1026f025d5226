/// Collaborator traits consumed by the queue core
use crate::error::Result;
use crate::types::ResolvedMedia;
use async_trait::async_trait;

/// Metadata resolver
///
/// Turns a submitted link into a playable identifier plus display metadata.
/// Implementations return [`crate::JukeboxError::InvalidSource`] for links that do not
/// resolve and [`crate::JukeboxError::Unavailable`] when the lookup service cannot be
/// reached.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, source_url: &str) -> Result<ResolvedMedia>;
}
