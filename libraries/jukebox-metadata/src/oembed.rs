//! oEmbed metadata resolver

use crate::youtube;
use async_trait::async_trait;
use jukebox_core::{JukeboxError, MetadataResolver, ResolvedMedia, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Public YouTube oEmbed endpoint
pub const DEFAULT_OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

/// Resolver settings
#[derive(Debug, Clone)]
pub struct OEmbedConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for OEmbedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OEMBED_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// The part of an oEmbed response we use
#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
}

/// Resolves YouTube links through an oEmbed endpoint
///
/// The link is parsed locally first, so a malformed link never reaches the network.
/// The thumbnail is derived from the video id; only the title comes from oEmbed.
pub struct OEmbedResolver {
    http: Client,
    endpoint: Url,
}

impl OEmbedResolver {
    /// Create a resolver with the given configuration.
    pub fn new(config: OEmbedConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            JukeboxError::invalid_input(format!(
                "Invalid oEmbed endpoint {}: {}",
                config.endpoint, e
            ))
        })?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(format!("Jukebox/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JukeboxError::unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, endpoint })
    }

    /// The endpoint this resolver queries
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn fetch_title(&self, video_id: &str) -> Result<Option<String>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("url", &youtube::watch_url(video_id))
            .append_pair("format", "json");

        debug!(url = %url, "Requesting oEmbed metadata");

        let response = self.http.get(url).send().await.map_err(|e| {
            warn!(video_id, error = %e, "oEmbed request failed");
            JukeboxError::unavailable(format!("oEmbed request failed: {}", e))
        })?;

        let status = response.status();

        if status.is_success() {
            let body: OEmbedResponse = response.json().await.map_err(|e| {
                JukeboxError::unavailable(format!("Failed to parse oEmbed response: {}", e))
            })?;
            return Ok(body.title.filter(|t| !t.trim().is_empty()));
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(JukeboxError::unavailable(
                "oEmbed provider is rate limiting requests",
            )),
            s if s.is_client_error() => {
                // 401/403 for private or embedding-disabled videos, 404 for unknown ids
                Err(JukeboxError::invalid_source(format!(
                    "Video {} is not available ({})",
                    video_id, s
                )))
            }
            s => Err(JukeboxError::unavailable(format!(
                "oEmbed provider returned {}",
                s
            ))),
        }
    }
}

#[async_trait]
impl MetadataResolver for OEmbedResolver {
    async fn resolve(&self, source_url: &str) -> Result<ResolvedMedia> {
        let video_id = youtube::extract_video_id(source_url).ok_or_else(|| {
            JukeboxError::invalid_source(format!("Not a YouTube video link: {}", source_url))
        })?;

        let title = self.fetch_title(&video_id).await?;

        debug!(video_id = %video_id, title = ?title, "Resolved media");

        Ok(ResolvedMedia {
            thumbnail_url: Some(youtube::thumbnail_url(&video_id)),
            media_id: video_id,
            title,
        })
    }
}
