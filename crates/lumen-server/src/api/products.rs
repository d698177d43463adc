use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension, Json,
};
use lumen_core::{PriceQuote, Product, ReviewSummary, Wattage};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ProductItem {
    #[serde(flatten)]
    product: Product,
    wattage_options: Vec<Wattage>,
    default_quote: PriceQuote,
}

impl ProductItem {
    fn from_product(product: &Product) -> Self {
        Self {
            wattage_options: product.wattage_options(),
            default_quote: product.default_quote(),
            product: product.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ProductDetail {
    #[serde(flatten)]
    item: ProductItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    review_summary: Option<ReviewSummary>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QuoteQuery {
    pub wattage: Option<Wattage>,
}

fn resolve_product<'a>(
    state: &'a AppState,
    slug: &str,
    request_id: &str,
) -> Result<&'a Product, ApiError> {
    state
        .catalog
        .by_slug(slug)
        .ok_or_else(|| ApiError::new(request_id, "not_found", format!("product '{slug}' not found")))
}

/// GET /api/v1/products: catalog listing, optionally filtered.
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Json<ApiResponse<Vec<ProductItem>>> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let data = state
        .catalog
        .search(query.q.as_deref().unwrap_or_default())
        .into_iter()
        .filter(|p| category.is_none_or(|c| p.category == c))
        .map(ProductItem::from_product)
        .collect();

    Json(ApiResponse::new(req_id.0, data))
}

/// GET /api/v1/products/:slug: product detail with its default quote.
///
/// The review summary is best-effort: a database failure is logged and the
/// summary left out rather than failing the page.
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError> {
    let product = resolve_product(&state, &slug, &req_id.0)?;

    let review_summary = match lumen_db::review_ratings_for_slug(&state.pool, &product.slug).await
    {
        Ok(ratings) => Some(ReviewSummary::from_ratings(&ratings)),
        Err(e) => {
            tracing::warn!(error = %e, slug = %product.slug, "review summary unavailable");
            None
        }
    };

    Ok(Json(ApiResponse::new(
        req_id.0,
        ProductDetail {
            item: ProductItem::from_product(product),
            review_summary,
        },
    )))
}

/// GET /api/v1/products/:slug/quote?wattage=N: price for one wattage.
pub(super) async fn quote_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    query: Result<Query<QuoteQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<PriceQuote>>, ApiError> {
    let Query(query) = query.map_err(|_| {
        ApiError::new(
            req_id.0.as_str(),
            "bad_request",
            "wattage must be a non-negative integer",
        )
    })?;
    let product = resolve_product(&state, &slug, &req_id.0)?;
    let quote = product
        .quote(query.wattage)
        .map_err(|e| ApiError::validation(req_id.0.as_str(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, quote)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, get, send};
    use axum::http::StatusCode;

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_products_includes_wattage_options(pool: sqlx::PgPool) {
        let (status, json) = send(app(pool), get("/api/v1/products")).await;

        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["slug"], "smd-metallic-light");
        assert_eq!(data[0]["wattage_options"], serde_json::json!([7, 12]));
        assert_eq!(data[0]["default_quote"]["price"], 280);
        assert_eq!(data[1]["wattage_options"], serde_json::json!([]));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_products_filters_by_category_and_term(pool: sqlx::PgPool) {
        let (_, json) = send(
            app(pool.clone()),
            get("/api/v1/products?category=gentleman%27s-reserve"),
        )
        .await;
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["slug"], "led-bulb");

        let (_, json) = send(app(pool), get("/api/v1/products?q=metallic")).await;
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], "1");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn product_detail_includes_review_summary(pool: sqlx::PgPool) {
        sqlx::query(
            "INSERT INTO reviews (product_id, product_slug, user_name, user_email, rating, comment) \
             VALUES ('1', 'smd-metallic-light', 'A', 'a@example.com', 4, 'good'), \
                    ('1', 'smd-metallic-light', 'B', 'b@example.com', 5, 'great')",
        )
        .execute(&pool)
        .await
        .expect("seed reviews");

        let (status, json) = send(app(pool), get("/api/v1/products/smd-metallic-light")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["review_summary"]["count"], 2);
        assert_eq!(json["data"]["review_summary"]["average"], 4.5);
        assert_eq!(json["data"]["default_quote"]["selected_wattage"], 7);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_product_is_404(pool: sqlx::PgPool) {
        let (status, json) = send(app(pool), get("/api/v1/products/no-such-light")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn quote_prices_selected_wattage(pool: sqlx::PgPool) {
        let (status, json) = send(
            app(pool.clone()),
            get("/api/v1/products/smd-metallic-light/quote?wattage=12"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["price"], 380);
        assert_eq!(json["data"]["reference_wattage"], 7);

        let (status, json) = send(
            app(pool.clone()),
            get("/api/v1/products/smd-metallic-light/quote"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["price"], 280);

        let (status, _) = send(
            app(pool),
            get("/api/v1/products/smd-metallic-light/quote?wattage=bright"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn quote_rejects_wattage_the_product_does_not_offer(pool: sqlx::PgPool) {
        for uri in [
            "/api/v1/products/smd-metallic-light/quote?wattage=0",
            "/api/v1/products/smd-metallic-light/quote?wattage=1000",
            "/api/v1/products/led-bulb/quote?wattage=50",
        ] {
            let (status, json) = send(app(pool.clone()), get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["error"]["code"], "validation_error", "{uri}");
        }

        let (status, json) = send(app(pool), get("/api/v1/products/led-bulb/quote")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["price"], 180);
    }
}
