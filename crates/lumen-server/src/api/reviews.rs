use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use lumen_core::{ReviewQuery, ReviewSubmission};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{json_body, map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ReviewItem {
    id: String,
    product_id: String,
    product_slug: String,
    user_name: String,
    user_email: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

impl From<lumen_db::ReviewRow> for ReviewItem {
    fn from(row: lumen_db::ReviewRow) -> Self {
        Self {
            id: row.public_id.to_string(),
            product_id: row.product_id,
            product_slug: row.product_slug,
            user_name: row.user_name,
            user_email: row.user_email,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// GET /api/v1/reviews: reviews for one product, newest first.
pub(super) async fn list_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewItem>>>, ApiError> {
    let query = query
        .validate()
        .map_err(|e| ApiError::validation(req_id.0.as_str(), &e))?;

    let rows = lumen_db::list_reviews(
        &state.pool,
        query.product_id.as_deref(),
        query.product_slug.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ReviewItem::from).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// POST /api/v1/reviews: store a review.
pub(super) async fn create_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<ReviewSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewItem>>), ApiError> {
    let rid = req_id.0.as_str();
    let review = json_body(rid, body)?
        .validate()
        .map_err(|e| ApiError::validation(rid, &e))?;

    let row = lumen_db::insert_review(&state.pool, &review)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?;
    tracing::info!(product_slug = %row.product_slug, rating = row.rating, "review stored");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, ReviewItem::from(row))),
    ))
}
