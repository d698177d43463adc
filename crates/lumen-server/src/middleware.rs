use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter with one window per client address.
///
/// Requests without a peer address (no `ConnectInfo`) share a single window.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<Option<IpAddr>, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &lumen_core::AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }

    /// Counts one request from `client`. Returns `false` once the client has
    /// used up its window.
    async fn admit(&self, client: Option<IpAddr>) -> bool {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();
        clients.retain(|_, w| now.duration_since(w.started_at) < self.window);

        let window = clients.entry(client).or_insert(RateLimitWindow {
            started_at: now,
            count: 0,
        });
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing a fixed request-per-window limit for each client.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if !rate_limit.admit(client).await {
        tracing::warn!(path = %req.uri().path(), client = ?client, "rate limit exceeded");
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone());
        return ApiError::new(request_id, "rate_limited", "rate limit exceeded").into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::StatusCode,
        routing::get,
        Extension, Router,
    };
    use std::net::Ipv4Addr;
    use tower::ServiceExt;

    fn limited_router(max_requests: usize) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimitState::new(max_requests, Duration::from_secs(60)),
                enforce_rate_limit,
            ))
    }

    fn get_root() -> Request {
        Request::builder()
            .uri("/")
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn rate_limit_rejects_after_max_requests() {
        let app = limited_router(2);

        for _ in 0..2 {
            let res = app.clone().oneshot(get_root()).await.expect("response");
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = app.oneshot(get_root()).await.expect("response");
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    fn get_from(last_octet: u8) -> Request {
        let mut req = get_root();
        req.extensions_mut().insert(ConnectInfo(SocketAddr::from((
            Ipv4Addr::new(203, 0, 113, last_octet),
            40_000,
        ))));
        req
    }

    #[tokio::test]
    async fn rate_limit_is_tracked_per_client() {
        let app = limited_router(2);

        for _ in 0..2 {
            let res = app.clone().oneshot(get_from(1)).await.expect("response");
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = app.clone().oneshot(get_from(1)).await.expect("response");
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.clone().oneshot(get_from(2)).await.expect("response");
        assert_eq!(other.status(), StatusCode::OK);
        let unknown = app.oneshot(get_root()).await.expect("response");
        assert_eq!(unknown.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn expired_client_windows_are_pruned() {
        let limiter = RateLimitState::new(1, Duration::from_millis(20));
        assert!(limiter.admit(Some(IpAddr::V4(Ipv4Addr::LOCALHOST))).await);
        assert!(limiter.admit(None).await);
        assert_eq!(limiter.tracked_clients().await, 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.admit(None).await);
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn rate_limited_response_uses_error_envelope() {
        let app = limited_router(0).layer(axum::middleware::from_fn(request_id));

        let res = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "req-429")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["error"]["code"], "rate_limited");
        assert_eq!(json["error"]["message"], "rate limit exceeded");
        assert_eq!(json["meta"]["request_id"], "req-429");
        assert!(json["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn rate_limit_window_resets() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimitState::new(1, Duration::from_millis(20)),
                enforce_rate_limit,
            ));

        let first = app.clone().oneshot(get_root()).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.clone().oneshot(get_root()).await.expect("response");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let third = app.oneshot(get_root()).await.expect("response");
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn request_id_is_echoed_or_generated() {
        let app = Router::new()
            .route(
                "/",
                get(|Extension(id): Extension<RequestId>| async move { id.0 }),
            )
            .layer(axum::middleware::from_fn(request_id));

        let echoed = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "req-abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(
            echoed.headers().get("x-request-id").map(HeaderValue::as_bytes),
            Some(&b"req-abc"[..])
        );

        let generated = app.oneshot(get_root()).await.expect("response");
        let id = generated
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .expect("generated id header");
        assert!(Uuid::parse_str(id).is_ok(), "expected a uuid, got {id}");
    }
}
