/// Server error types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jukebox_core::JukeboxError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] JukeboxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

impl From<jukebox_storage::StorageError> for ServerError {
    fn from(err: jukebox_storage::StorageError) -> Self {
        ServerError::Core(err.into())
    }
}

/// Status code and client-facing message for a core error
fn core_error_response(err: &JukeboxError) -> (StatusCode, String) {
    match err {
        JukeboxError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, err.to_string()),
        JukeboxError::QueueItemNotFound(_) | JukeboxError::QueueItemRemoved(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        JukeboxError::InvalidSource(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        JukeboxError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        JukeboxError::Unavailable(msg) => {
            tracing::warn!("Service unavailable: {}", msg);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            )
        }
        JukeboxError::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        JukeboxError::Database(_) => {
            tracing::error!("Database error: {:?}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        }
    }
}

impl ServerError {
    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Core(e) => core_error_response(e).0,
            ServerError::Internal(_)
            | ServerError::Config(_)
            | ServerError::Jwt(_)
            | ServerError::Bcrypt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServerError::Core(ref e) => core_error_response(e),
            ServerError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
            ServerError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Jwt(ref e) => {
                tracing::error!("Token signing error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Token error".to_string(),
                )
            }
            ServerError::Bcrypt(ref e) => {
                tracing::error!("Bcrypt error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Password error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
