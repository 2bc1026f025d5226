//! Jukebox Metadata
//!
//! Turns a submitted link into a playable queue entry.
//!
//! This crate provides:
//! - YouTube link parsing (`youtu.be`, `watch?v=`, `/embed/`, `/v/`, `/shorts/`)
//! - An oEmbed client implementing [`jukebox_core::MetadataResolver`]
//!
//! # Example
//!
//! ```rust,no_run
//! use jukebox_core::MetadataResolver;
//! use jukebox_metadata::{OEmbedConfig, OEmbedResolver};
//! # async fn example() -> jukebox_core::Result<()> {
//! let resolver = OEmbedResolver::new(OEmbedConfig::default())?;
//! let media = resolver.resolve("https://youtu.be/dQw4w9WgXcQ").await?;
//! assert_eq!(media.media_id, "dQw4w9WgXcQ");
//! # Ok(())
//! # }
//! ```

mod oembed;
pub mod youtube;

pub use oembed::{OEmbedConfig, OEmbedResolver, DEFAULT_OEMBED_ENDPOINT};
pub use youtube::{extract_video_id, thumbnail_url, watch_url};
