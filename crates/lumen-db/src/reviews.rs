//! Database operations for the `reviews` table.

use chrono::{DateTime, Utc};
use lumen_core::NewReview;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub public_id: Uuid,
    pub product_id: String,
    pub product_slug: String,
    pub user_name: String,
    pub user_email: String,
    /// 1–5, enforced by a check constraint.
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

const REVIEW_COLUMNS: &str = "id, public_id, product_id, product_slug, user_name, user_email, \
                              rating, comment, created_at";

/// Stores a validated review and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_review(pool: &PgPool, review: &NewReview) -> Result<ReviewRow, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        "INSERT INTO reviews \
             (product_id, product_slug, user_name, user_email, rating, comment) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(&review.product_id)
    .bind(&review.product_slug)
    .bind(&review.user_name)
    .bind(&review.user_email)
    .bind(review.rating)
    .bind(&review.comment)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Lists reviews newest first. Each present filter must match; absent
/// filters are ignored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews(
    pool: &PgPool,
    product_id: Option<&str>,
    product_slug: Option<&str>,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} \
         FROM reviews \
         WHERE ($1::text IS NULL OR product_id = $1) \
           AND ($2::text IS NULL OR product_slug = $2) \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(product_id)
    .bind(product_slug)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every rating recorded for a product slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn review_ratings_for_slug(pool: &PgPool, product_slug: &str) -> Result<Vec<i16>, DbError> {
    let ratings = sqlx::query_scalar::<_, i16>(
        "SELECT rating FROM reviews WHERE product_slug = $1 ORDER BY created_at DESC",
    )
    .bind(product_slug)
    .fetch_all(pool)
    .await?;

    Ok(ratings)
}
