use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use lumen_core::{LoginRequest, PublicUser, Role, SignupRequest};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{json_body, map_db_error, ApiError, ApiResponse, AppState};

const EMAIL_TAKEN: &str = "Email already registered. Please use a different email or try logging in.";
const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Serialize)]
pub(super) struct LoginResponse {
    user: PublicUser,
    is_admin: bool,
}

async fn run_blocking<T, F>(request_id: &str, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "password task failed");
        ApiError::new(request_id, "internal_error", "internal error")
    })
}

/// POST /api/v1/auth/signup: register a customer account.
pub(super) async fn signup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>), ApiError> {
    let rid = req_id.0.as_str();
    let request = json_body(rid, body)?;
    let account = request
        .validate()
        .map_err(|e| ApiError::validation(rid, &e))?;

    let password = account.password.clone();
    let password_hash = run_blocking(rid, move || lumen_core::hash_password(&password))
        .await?
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            ApiError::new(rid, "internal_error", "internal error")
        })?;

    let row = lumen_db::create_user(
        &state.pool,
        &account.name,
        &account.email,
        &password_hash,
        Role::Customer,
    )
    .await
    .map_err(|e| {
        if e.is_unique_violation() {
            tracing::info!(email = %account.email, "signup rejected: email already registered");
            ApiError::new(rid, "conflict", EMAIL_TAKEN)
        } else {
            map_db_error(rid.to_owned(), &e)
        }
    })?;

    let user = row
        .to_public()
        .map_err(|e| map_db_error(rid.to_owned(), &e))?;
    tracing::info!(user_id = %user.id, "account created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, user)),
    ))
}

/// POST /api/v1/auth/login: verify credentials and return the account.
pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let rid = req_id.0.as_str();
    let request = json_body(rid, body)?;
    let credentials = request
        .validate()
        .map_err(|e| ApiError::validation(rid, &e))?;

    let Some(row) = lumen_db::find_user_by_email(&state.pool, &credentials.email)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?
    else {
        return Err(ApiError::new(rid, "unauthorized", BAD_CREDENTIALS));
    };

    let stored_hash = row.password_hash.clone();
    let password = credentials.password;
    let verified = run_blocking(rid, move || {
        lumen_core::verify_password(&password, &stored_hash)
    })
    .await?;
    if !verified {
        return Err(ApiError::new(rid, "unauthorized", BAD_CREDENTIALS));
    }

    let user = row
        .to_public()
        .map_err(|e| map_db_error(rid.to_owned(), &e))?;
    let is_admin = user.is_admin();

    Ok(Json(ApiResponse::new(
        req_id.0,
        LoginResponse { user, is_admin },
    )))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, post_json, send};
    use axum::http::StatusCode;
    use lumen_core::Role;
    use serde_json::json;

    async fn sign_up(pool: &sqlx::PgPool, email: &str) -> (StatusCode, serde_json::Value) {
        send(
            app(pool.clone()),
            post_json(
                "/api/v1/auth/signup",
                &json!({ "name": "Hira", "email": email, "password": "lamp123" }),
            ),
        )
        .await
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn signup_returns_public_user(pool: sqlx::PgPool) {
        let (status, json) = sign_up(&pool, "  Hira@Example.COM ").await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["email"], "hira@example.com");
        assert_eq!(json["data"]["role"], "customer");
        assert!(json["data"].get("password").is_none());
        assert!(json["data"].get("password_hash").is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn signup_rejects_duplicate_email(pool: sqlx::PgPool) {
        sign_up(&pool, "dup@example.com").await;
        let (status, json) = sign_up(&pool, "DUP@example.com").await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "conflict");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn signup_validation_errors_are_400(pool: sqlx::PgPool) {
        let (status, json) = send(
            app(pool.clone()),
            post_json(
                "/api/v1/auth/signup",
                &json!({ "name": "Hira", "email": "not-an-email", "password": "lamp123" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "Please enter a valid email address");

        let (status, json) = send(
            app(pool),
            post_json(
                "/api/v1/auth/signup",
                &json!({ "name": "Hira", "email": "hira@example.com", "password": "123" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "Password must be at least 6 characters");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn malformed_body_is_bad_request(pool: sqlx::PgPool) {
        let request = axum::http::Request::builder()
            .method(axum::http::Method::POST)
            .uri("/api/v1/auth/login")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{not json"))
            .expect("request");
        let (status, json) = send(app(pool), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "bad_request");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn login_succeeds_with_correct_password(pool: sqlx::PgPool) {
        sign_up(&pool, "hira@example.com").await;

        let (status, json) = send(
            app(pool),
            post_json(
                "/api/v1/auth/login",
                &json!({ "email": "HIRA@example.com ", "password": "lamp123" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["user"]["name"], "Hira");
        assert_eq!(json["data"]["is_admin"], false);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn login_rejects_bad_password_and_unknown_email(pool: sqlx::PgPool) {
        sign_up(&pool, "hira@example.com").await;

        let (status, _) = send(
            app(pool.clone()),
            post_json(
                "/api/v1/auth/login",
                &json!({ "email": "hira@example.com", "password": "wrong-pass" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app(pool),
            post_json(
                "/api/v1/auth/login",
                &json!({ "email": "ghost@example.com", "password": "lamp123" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn login_missing_fields_is_400(pool: sqlx::PgPool) {
        let (status, json) = send(
            app(pool),
            post_json("/api/v1/auth/login", &json!({ "email": "hira@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "Email and password are required");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn admin_flag_comes_from_stored_role(pool: sqlx::PgPool) {
        sign_up(&pool, "owner@example.com").await;
        lumen_db::set_user_role(&pool, "owner@example.com", Role::Admin)
            .await
            .expect("promote");

        let (status, json) = send(
            app(pool),
            post_json(
                "/api/v1/auth/login",
                &json!({ "email": "owner@example.com", "password": "lamp123" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["is_admin"], true);
        assert_eq!(json["data"]["user"]["role"], "admin");
    }
}
