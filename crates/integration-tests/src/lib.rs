//! Integration test support for FreshCart.
//!
//! # Running Tests
//!
//! ```bash
//! # Database-backed tests: each test gets its own migrated database
//! DATABASE_URL=postgres://localhost/freshcart_test \
//!     cargo test -p freshcart-integration-tests -- --ignored
//!
//! # Smoke tests against a running server
//! FRESHCART_BASE_URL=http://localhost:5000 \
//!     cargo test -p freshcart-integration-tests --test smoke -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart`, `orders`, `identity`, `catalog` - service-level workflows
//! - `http` - the full router driven in-process
//! - `smoke` - a deployed server over HTTP

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use freshcart_api::config::{ApiConfig, AuthConfig, DatabaseConfig, Environment};
use freshcart_api::db::{ProductRepository, UserRepository};
use freshcart_api::models::{NewProduct, NewUser, Product, User};
use freshcart_api::routes::build_router;
use freshcart_api::services::auth::hash_password;
use freshcart_api::services::{EmailError, Notifier, PasswordResetMessage};
use freshcart_api::state::AppState;
use freshcart_core::{Email, UserRole};

/// Password given to every user created by [`create_user`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Configuration for in-process tests. Never used to connect.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 5000,
        environment: Environment::Development,
        frontend_url: "http://localhost:3000".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
        database: DatabaseConfig {
            url: SecretString::from("postgres://localhost/freshcart_test"),
            max_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(5),
        },
        auth: AuthConfig {
            jwt_secret: SecretString::from("kT9#vQ2@zL7!mW4$pR8^xN3&bH6*cF1%"),
            jwt_expiry_hours: 24,
            reset_token_ttl_minutes: 60,
        },
        email: None,
        low_stock_threshold: 10,
        rate_limit: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A password-reset email captured by [`RecordingNotifier`].
#[derive(Debug, Clone)]
pub struct SentReset {
    pub to: Email,
    pub reset_url: String,
}

impl SentReset {
    /// The plaintext token at the end of the reset link.
    #[must_use]
    pub fn token(&self) -> &str {
        self.reset_url.rsplit('/').next().unwrap_or_default()
    }
}

/// Notifier that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentReset>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn sent(&self) -> Vec<SentReset> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_password_reset(
        &self,
        to: &Email,
        message: &PasswordResetMessage,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentReset {
            to: to.clone(),
            reset_url: message.reset_url.clone(),
        });
        Ok(())
    }
}

/// The full application over `pool`, with outgoing mail recorded.
#[must_use]
pub fn app(pool: PgPool, notifier: Arc<RecordingNotifier>) -> (Router, AppState) {
    let state = AppState::with_notifier(test_config(), pool, notifier);
    (build_router(state.clone()), state)
}

/// Insert a user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, role: UserRole) -> User {
    UserRepository::new(pool)
        .create(&NewUser {
            email: Email::parse(email).unwrap(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone: None,
            address: None,
            role,
        })
        .await
        .unwrap()
}

/// Insert an uncategorized product.
pub async fn create_product(pool: &PgPool, name: &str, price_cents: i64, stock: i32) -> Product {
    ProductRepository::new(pool)
        .create(&NewProduct {
            name: name.to_string(),
            description: None,
            price: Decimal::new(price_cents, 2),
            original_price: None,
            category_id: None,
            image_url: None,
            unit: None,
            stock,
            featured: false,
        })
        .await
        .unwrap()
}

/// Current stock of a product.
pub async fn stock_of(pool: &PgPool, product: &Product) -> i32 {
    ProductRepository::new(pool)
        .get(product.id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

/// Count rows in `table`.
pub async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}
