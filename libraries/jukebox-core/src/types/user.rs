/// User domain type
use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,

    /// Login email, unique across users
    pub email: String,

    /// Name shown next to submitted items
    pub display_name: String,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Identity data supplied by the identity provider on registration or login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertUser {
    pub email: String,
    pub display_name: String,
}

impl UpsertUser {
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
        }
    }
}
