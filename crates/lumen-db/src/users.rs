//! Database operations for the `users` table.

use chrono::{DateTime, Utc};
use lumen_core::{PublicUser, Role};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    /// Stored lowercased and trimmed; unique.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if the stored role is unknown.
    pub fn role(&self) -> Result<Role, DbError> {
        self.role
            .parse::<Role>()
            .map_err(|e| DbError::InvalidRow(e.to_string()))
    }

    /// Sanitized record for API responses.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if the stored role is unknown.
    pub fn to_public(&self) -> Result<PublicUser, DbError> {
        Ok(PublicUser {
            id: self.public_id.to_string(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role()?,
        })
    }
}

const USER_COLUMNS: &str =
    "id, public_id, name, email, password_hash, role, created_at, updated_at";

/// Inserts a new user and returns the stored row.
///
/// `email` must already be normalized.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate email is
/// reported as a unique violation (see [`DbError::is_unique_violation`]).
pub async fn create_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (name, email, password_hash, role) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.to_string())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Looks up a user by normalized email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Changes a user's role.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has that email, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_user_role(pool: &PgPool, email: &str, role: Role) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE email = $1")
        .bind(email)
        .bind(role.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
