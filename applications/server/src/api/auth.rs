/// Authentication API routes
use crate::{
    error::{Result, ServerError},
    services::Identity,
    state::AppState,
};
use axum::{extract::State, Json};
use jukebox_core::{JukeboxError, QueueStore, UpsertUser, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Refreshes the stored display name when present
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
}

fn invalid_credentials() -> ServerError {
    JukeboxError::unauthorized("Invalid email or password").into()
}

/// POST /api/auth/login
pub async fn login(
    State(app_state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = app_state
        .db
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| {
            tracing::warn!(email = %req.email, "Login for unknown email");
            invalid_credentials()
        })?;

    let password_hash = jukebox_storage::users::get_password_hash(app_state.db.pool(), user.id)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !app_state
        .auth_service
        .verify_password(&req.password, &password_hash)?
    {
        tracing::warn!(user_id = %user.id, "Login with wrong password");
        return Err(invalid_credentials());
    }

    let user = match req.display_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() && name != user.display_name => {
            app_state
                .db
                .upsert_user(UpsertUser::new(user.email.clone(), name))
                .await?
        }
        _ => user,
    };

    let access_token = app_state
        .auth_service
        .create_access_token(&Identity::from(&user))?;
    let refresh_token = app_state.auth_service.create_refresh_token(user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        user,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(app_state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let user_id = app_state
        .auth_service
        .verify_refresh_token(&req.refresh_token)?;

    // Re-read the account so renames reach the new token and deleted users stop here
    let user = app_state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| JukeboxError::unauthorized(format!("Unknown user {}", user_id)))?;

    let access_token = app_state
        .auth_service
        .create_access_token(&Identity::from(&user))?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
    }))
}
