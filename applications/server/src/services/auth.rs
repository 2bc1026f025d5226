/// Session tokens and credential checks
use crate::error::{Result, ServerError};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use jukebox_core::{JukeboxError, User, UserId};
use serde::{Deserialize, Serialize};

/// Who is calling, as vouched for by a verified access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

/// JWT payload
///
/// Access tokens carry the full identity. Refresh tokens carry only the subject so
/// that a refresh re-reads the account and picks up renames.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Issues and verifies session tokens, hashes passwords
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(secret: String, access_expiration_hours: u64, refresh_expiration_days: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::hours(access_expiration_hours as i64),
            refresh_ttl: Duration::days(refresh_expiration_days as i64),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(ServerError::from)
    }

    /// Check a password against a stored bcrypt hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(password, hash).map_err(ServerError::from)
    }

    pub fn create_access_token(&self, identity: &Identity) -> Result<String> {
        self.sign(Claims {
            sub: identity.id.to_string(),
            email: Some(identity.email.clone()),
            name: Some(identity.display_name.clone()),
            ..self.claims_now(TokenType::Access, self.access_ttl)
        })
    }

    pub fn create_refresh_token(&self, user_id: UserId) -> Result<String> {
        self.sign(Claims {
            sub: user_id.to_string(),
            ..self.claims_now(TokenType::Refresh, self.refresh_ttl)
        })
    }

    /// Verify an access token and return the identity it carries
    pub fn verify_access_token(&self, token: &str) -> Result<Identity> {
        let claims = self.verify(token, TokenType::Access)?;
        let id = parse_subject(&claims.sub)?;
        match (claims.email, claims.name) {
            (Some(email), Some(display_name)) => Ok(Identity {
                id,
                email,
                display_name,
            }),
            _ => Err(JukeboxError::unauthorized("Access token carries no identity").into()),
        }
    }

    /// Verify a refresh token and return its subject
    pub fn verify_refresh_token(&self, token: &str) -> Result<UserId> {
        let claims = self.verify(token, TokenType::Refresh)?;
        parse_subject(&claims.sub)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected token");
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    _ => "Invalid token",
                };
                JukeboxError::unauthorized(reason)
            })?
            .claims;

        if claims.token_type != expected {
            return Err(JukeboxError::unauthorized("Wrong token type").into());
        }
        Ok(claims)
    }

    fn claims_now(&self, token_type: TokenType, ttl: Duration) -> Claims {
        let now = Utc::now();
        Claims {
            sub: String::new(),
            email: None,
            name: None,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type,
        }
    }

    fn sign(&self, claims: Claims) -> Result<String> {
        encode(&Header::default(), &claims, &self.encoding_key).map_err(ServerError::from)
    }
}

fn parse_subject(sub: &str) -> Result<UserId> {
    sub.parse()
        .map_err(|_| JukeboxError::unauthorized("Invalid token subject").into())
}
