/// User API routes
use crate::{middleware::AuthenticatedUser, services::Identity};
use axum::Json;

/// GET /api/me
///
/// Answers from the access token alone.
pub async fn me(user: AuthenticatedUser) -> Json<Identity> {
    Json(user.into_identity())
}
