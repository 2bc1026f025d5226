/// Server configuration
use crate::error::{Result, ServerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bounds for the poll interval advertised to clients
pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_auth")]
    pub auth: AuthSettings,

    #[serde(default = "default_metadata")]
    pub metadata: MetadataSettings,

    #[serde(default = "default_polling")]
    pub polling: PollingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a write waits on the database lock before failing with a conflict
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSettings {
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: u64,

    #[serde(default = "default_jwt_refresh_expiration_days")]
    pub jwt_refresh_expiration_days: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataSettings {
    #[serde(default = "default_oembed_endpoint")]
    pub oembed_endpoint: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingSettings {
    /// Interval clients are told to poll the snapshot at
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl StorageSettings {
    pub fn pool_settings(&self) -> jukebox_storage::PoolSettings {
        jukebox_storage::PoolSettings {
            max_connections: self.max_connections,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

impl MetadataSettings {
    pub fn oembed_config(&self) -> jukebox_metadata::OEmbedConfig {
        jukebox_metadata::OEmbedConfig {
            endpoint: self.oembed_endpoint.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and environment
    ///
    /// `path` overrides the default `config.toml` in the working directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from("config.toml");
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        // Override with environment variables (prefixed with JUKEBOX_)
        settings = settings.add_source(
            config::Environment::with_prefix("JUKEBOX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ServerError::Config(
                "JWT secret is required (set JUKEBOX_AUTH__JWT_SECRET)".to_string(),
            ));
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.polling.interval_ms) {
            return Err(ServerError::Config(format!(
                "Poll interval must be between {} and {} ms, got {}",
                MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS, self.polling.interval_ms
            )));
        }

        if self.storage.max_connections == 0 {
            return Err(ServerError::Config(
                "storage.max_connections must be at least 1".to_string(),
            ));
        }

        if self.metadata.request_timeout_secs == 0 {
            return Err(ServerError::Config(
                "metadata.request_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
        max_connections: default_max_connections(),
        busy_timeout_ms: default_busy_timeout_ms(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/jukebox.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_auth() -> AuthSettings {
    AuthSettings {
        jwt_secret: String::new(),
        jwt_expiration_hours: default_jwt_expiration_hours(),
        jwt_refresh_expiration_days: default_jwt_refresh_expiration_days(),
    }
}

fn default_jwt_expiration_hours() -> u64 {
    24
}

fn default_jwt_refresh_expiration_days() -> u64 {
    30
}

fn default_metadata() -> MetadataSettings {
    MetadataSettings {
        oembed_endpoint: default_oembed_endpoint(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_oembed_endpoint() -> String {
    jukebox_metadata::DEFAULT_OEMBED_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_polling() -> PollingSettings {
    PollingSettings {
        interval_ms: default_poll_interval_ms(),
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            auth: default_auth(),
            metadata: default_metadata(),
            polling: default_polling(),
        }
    }
}
