//! Common test utilities and fixtures
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use jukebox_core::{JukeboxError, MetadataResolver, ResolvedMedia, UpsertUser, User};
use jukebox_server::services::AuthService;
use jukebox_storage::{Database, LocalStorageContext, PoolSettings};
use std::sync::Arc;
use tempfile::TempDir;

/// Create a file-backed test database with migrations applied
///
/// The returned `TempDir` owns the database file; keep it alive for the test.
pub async fn create_test_database() -> Result<(Arc<Database>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());

    let pool = jukebox_storage::create_pool(&db_url, &PoolSettings::default()).await?;
    jukebox_storage::run_migrations(&pool).await?;

    Ok((Arc::new(LocalStorageContext::new(pool)), temp_dir))
}

/// Create a user with stored credentials
pub async fn create_user_with_password(
    db: &Database,
    auth_service: &AuthService,
    email: &str,
    name: &str,
    password: &str,
) -> Result<User> {
    let user = jukebox_storage::users::upsert(db.pool(), &UpsertUser::new(email, name)).await?;
    let hash = auth_service.hash_password(password)?;
    jukebox_storage::users::set_password_hash(db.pool(), user.id, &hash).await?;
    Ok(user)
}

/// Resolver that parses links locally and never touches the network
pub struct OfflineResolver;

#[async_trait]
impl MetadataResolver for OfflineResolver {
    async fn resolve(&self, source_url: &str) -> jukebox_core::Result<ResolvedMedia> {
        let media_id = jukebox_metadata::extract_video_id(source_url)
            .ok_or_else(|| JukeboxError::invalid_source(source_url.to_string()))?;

        Ok(ResolvedMedia {
            title: Some(format!("Video {}", media_id)),
            thumbnail_url: Some(jukebox_metadata::thumbnail_url(&media_id)),
            media_id,
        })
    }
}

/// Test user credentials
pub mod fixtures {
    pub const TEST_EMAIL: &str = "testuser@example.com";
    pub const TEST_NAME: &str = "Test User";
    pub const TEST_PASSWORD: &str = "TestPassword123!";

    pub const OTHER_EMAIL: &str = "other@example.com";
    pub const OTHER_NAME: &str = "Other User";
    pub const OTHER_PASSWORD: &str = "OtherPassword456!";

    pub const LINK_A: &str = "https://youtu.be/aaaaaaaaaaa";
    pub const LINK_B: &str = "https://www.youtube.com/watch?v=bbbbbbbbbbb";
    pub const LINK_C: &str = "https://www.youtube.com/shorts/ccccccccccc";
}
