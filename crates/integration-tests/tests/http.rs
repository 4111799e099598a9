//! The full router driven in-process over a migrated database.
//!
//! Run with: `cargo test -p freshcart-integration-tests --test http -- --ignored`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

use freshcart_api::routes::auth::FORGOT_PASSWORD_MESSAGE;
use freshcart_core::UserRole;
use freshcart_integration_tests::{
    RecordingNotifier, TEST_PASSWORD, app, create_product, create_user, stock_of,
};

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn login(router: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

async fn token_for(router: &Router, email: &str) -> String {
    let (status, body) = login(router, email, TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_register_then_me(pool: PgPool) {
    let (router, _) = app(pool, Arc::new(RecordingNotifier::default()));

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "jane@example.com",
            "password": TEST_PASSWORD,
            "firstName": "Jane",
            "lastName": "Doe",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["role"], "user");
    assert!(body["data"]["user"].get("passwordHash").is_none());
    let token = body["data"]["token"].as_str().unwrap();

    let (status, body) = send(&router, "GET", "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert_eq!(body["data"]["firstName"], "Jane");

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "JANE@example.com", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_forgot_and_reset_password(pool: PgPool) {
    let notifier = Arc::new(RecordingNotifier::default());
    let (router, _) = app(pool.clone(), Arc::clone(&notifier));
    create_user(&pool, "jane@example.com", UserRole::User).await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/forgot-password",
        None,
        Some(json!({ "email": "jane@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], FORGOT_PASSWORD_MESSAGE);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.as_str(), "jane@example.com");
    assert!(sent[0].reset_url.starts_with("http://localhost:3000/reset-password/"));
    let token = sent[0].token().to_string();

    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/auth/reset-password/{token}"),
        None,
        Some(json!({ "password": "a-brand-new-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = login(&router, "jane@example.com", TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&router, "jane@example.com", "a-brand-new-secret").await;
    assert_eq!(status, StatusCode::OK);

    // The link only works once.
    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/auth/reset-password/{token}"),
        None,
        Some(json!({ "password": "yet-another-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_forgot_password_does_not_reveal_accounts(pool: PgPool) {
    let notifier = Arc::new(RecordingNotifier::default());
    let (router, _) = app(pool, Arc::clone(&notifier));

    for email in ["ghost@example.com", "not-an-email"] {
        let (status, body) = send(
            &router,
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": email })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], FORGOT_PASSWORD_MESSAGE);
    }
    assert!(notifier.sent().is_empty());
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_routes_require_admin(pool: PgPool) {
    let (router, _) = app(pool.clone(), Arc::new(RecordingNotifier::default()));
    create_user(&pool, "shopper@example.com", UserRole::User).await;
    create_user(&pool, "admin@example.com", UserRole::Admin).await;

    let shopper = token_for(&router, "shopper@example.com").await;
    let (status, body) = send(&router, "GET", "/api/admin/dashboard", Some(&shopper), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized as an admin");

    let admin = token_for(&router, "admin@example.com").await;
    let (status, body) = send(&router, "GET", "/api/admin/dashboard", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 2);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_over_http(pool: PgPool) {
    let (router, _) = app(pool.clone(), Arc::new(RecordingNotifier::default()));
    create_user(&pool, "shopper@example.com", UserRole::User).await;
    let apples = create_product(&pool, "Apples", 199, 10).await;
    let token = token_for(&router, "shopper@example.com").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/cart/add",
        Some(&token),
        Some(json!({ "productId": apples.id, "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["itemCount"], 3);

    let (status, body) = send(
        &router,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({ "shippingAddress": "1 Orchard Rd", "paymentMethod": "card" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Order placed successfully");
    assert_eq!(body["data"]["totalAmount"], "5.97");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(stock_of(&pool, &apples).await, 7);

    let order_id = body["data"]["id"].as_i64().unwrap();
    let (status, body) = send(&router, "GET", "/api/orders/my-orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/orders/{order_id}/cancel"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(stock_of(&pool, &apples).await, 10);

    let (status, _) = send(
        &router,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "shippingAddress": "1 Orchard Rd",
            "paymentMethod": "card",
            "items": [{ "productId": apples.id, "quantity": 11 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&pool, &apples).await, 10);
}
