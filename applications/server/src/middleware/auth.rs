/// Bearer-token authentication
use crate::{
    error::ServerError,
    services::{AuthService, Identity},
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use jukebox_core::{JukeboxError, UserId};
use std::sync::Arc;

/// Identity of the caller, placed in request extensions by [`auth_middleware`]
///
/// Handlers on protected routes take it as an extractor.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl AuthenticatedUser {
    pub fn user_id(&self) -> UserId {
        self.0.id
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    pub fn display_name(&self) -> &str {
        &self.0.display_name
    }

    pub fn into_identity(self) -> Identity {
        self.0
    }
}

/// Reject requests without a valid access token
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let identity = {
        let token = bearer_token(request.headers())?;
        auth_service.verify_access_token(token)?
    };

    request.extensions_mut().insert(AuthenticatedUser(identity));

    Ok(next.run(request).await)
}

/// Token from an `Authorization: Bearer <token>` header; the scheme is case-insensitive
fn bearer_token(headers: &HeaderMap) -> Result<&str, JukeboxError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| JukeboxError::unauthorized("Missing bearer token"))?
        .to_str()
        .map_err(|_| JukeboxError::unauthorized("Malformed Authorization header"))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            if token.is_empty() {
                Err(JukeboxError::unauthorized("Missing bearer token"))
            } else {
                Ok(token)
            }
        }
        _ => Err(JukeboxError::unauthorized(
            "Authorization scheme must be Bearer",
        )),
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| JukeboxError::unauthorized("Not authenticated").into())
    }
}
