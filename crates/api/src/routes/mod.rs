//! HTTP routes for the FreshCart API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database ping)
//!
//! # Auth
//! POST /api/auth/register               - Create account, returns token
//! POST /api/auth/login                  - Returns token
//! POST /api/auth/forgot-password        - Mail a reset link
//! POST /api/auth/reset-password/{token} - Redeem a reset token
//! GET  /api/auth/me                     - Current user (auth)
//! POST /api/auth/change-password        - (auth)
//!
//! # Catalog
//! GET  /api/products                    - Filtered, paginated listing
//! GET  /api/products/featured
//! GET  /api/products/{id}
//! POST /api/products                    - (admin)
//! PUT|DELETE /api/products/{id}         - (admin)
//! GET  /api/categories
//! GET  /api/categories/{id}
//! POST /api/categories                  - (admin)
//! PUT|DELETE /api/categories/{id}       - (admin)
//!
//! # Cart (auth)
//! GET  /api/cart
//! POST /api/cart/add
//! PUT|DELETE /api/cart/item/{id}
//! DELETE /api/cart/clear
//!
//! # Orders
//! POST /api/orders                      - Checkout (auth)
//! GET  /api/orders/my-orders            - (auth)
//! GET  /api/orders/{id}                 - Own order, or any for admins (auth)
//! PUT  /api/orders/{id}/cancel          - (auth)
//! GET  /api/orders                      - (admin)
//! PUT  /api/orders/{id}/status          - (admin)
//!
//! # Users (auth)
//! GET|PUT /api/users/profile
//! PUT  /api/users/change-password
//! GET  /api/users/wishlist
//! POST|DELETE /api/users/wishlist/{product_id}
//!
//! # Admin (admin)
//! GET  /api/admin/dashboard
//! GET  /api/admin/users
//! GET|PUT|DELETE /api/admin/users/{id}
//! GET  /api/admin/orders
//! GET  /api/admin/products/low-stock
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{
        HeaderValue, Method, Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// All `/api` routes.
pub fn api_routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(rate_limit))
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/users", users::router())
        .nest("/admin", admin::router())
}

/// Build the complete application with middleware and state.
pub fn build_router(state: AppState) -> Router {
    let config = state.config();
    let cors = cors_layer(&config.cors_origin);
    let api = api_routes(config.rate_limit);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api)
        .fallback(not_found)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = tracing::field::Empty,
    )
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS origin; cross-origin requests disabled");
            layer
        }
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::tests::test_config;
    use crate::services::LogNotifier;
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn app() -> Router {
        // Never connects: every request below is answered before a query runs.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/freshcart_test")
            .unwrap();
        let state = AppState::with_notifier(test_config(), pool, Arc::new(LogNotifier));
        build_router(state)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_uses_envelope() {
        let response = app()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = app()
            .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["message"], "Not authorized, no token");
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let response = app()
            .oneshot(
                Request::get("/api/admin/dashboard")
                    .header(AUTHORIZATION, "Bearer not.a.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["message"], "Not authorized, token failed");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let response = app()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_invalid_path_id_is_bad_request() {
        let response = app()
            .oneshot(
                Request::get("/api/products/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
