//! User management and authentication queries

use jukebox_core::{JukeboxError, Result, UpsertUser, User, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

const USER_COLUMNS: &str = "id, email, display_name, created_at";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let created_at: i64 = row.try_get("created_at")?;

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        created_at: chrono::DateTime::from_timestamp_millis(created_at)
            .ok_or_else(|| JukeboxError::Database("Invalid timestamp".to_string()))?,
    })
}

/// Create a user, or refresh the display name if the email is already registered
pub async fn upsert(pool: &SqlitePool, user: &UpsertUser) -> Result<User> {
    let email = normalize_email(&user.email);
    let display_name = user.display_name.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(JukeboxError::invalid_input(format!("Invalid email: {}", user.email)));
    }
    if display_name.is_empty() {
        return Err(JukeboxError::invalid_input("Display name cannot be empty"));
    }

    let row = sqlx::query(&format!(
        "INSERT INTO users (email, display_name, created_at)
         VALUES (?, ?, ?)
         ON CONFLICT(email)
         DO UPDATE SET display_name = excluded.display_name
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&email)
    .bind(display_name)
    .bind(crate::now_millis())
    .fetch_one(pool)
    .await?;

    user_from_row(&row)
}

/// Get user by ID
pub async fn get_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Get user by email (case-insensitive)
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Get all users
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY display_name, id"))
        .fetch_all(pool)
        .await?;

    rows.iter().map(user_from_row).collect()
}

/// Fail with `Unauthorized` unless the user exists
///
/// Runs on the caller's connection so it sees the same transaction.
pub async fn ensure_exists(conn: &mut SqliteConnection, id: UserId) -> Result<()> {
    let found = sqlx::query("SELECT 1 FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(JukeboxError::unauthorized(format!("Unknown user {}", id))),
    }
}

/// Get user's password hash for authentication
///
/// Returns `None` if the user has no credentials
pub async fn get_password_hash(pool: &SqlitePool, user_id: UserId) -> Result<Option<String>> {
    let row = sqlx::query("SELECT password_hash FROM user_credentials WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.try_get("password_hash")).transpose()?)
}

/// Create or update user credentials
///
/// `password_hash` must already be hashed with bcrypt.
pub async fn set_password_hash(
    pool: &SqlitePool,
    user_id: UserId,
    password_hash: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_credentials (user_id, password_hash, updated_at)
         VALUES (?, ?, ?)
         ON CONFLICT(user_id)
         DO UPDATE SET password_hash = excluded.password_hash, updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(password_hash)
    .bind(crate::now_millis())
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete user credentials
pub async fn delete_credentials(pool: &SqlitePool, user_id: UserId) -> Result<()> {
    sqlx::query("DELETE FROM user_credentials WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}
