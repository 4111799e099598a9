//! Database operations for the FreshCart `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `users` - Accounts, roles, password-reset token hash + expiry
//! - `categories` / `products` - Catalog
//! - `carts` / `cart_items` - One cart per user, one line per product
//! - `orders` / `order_items` - Checkout snapshots with frozen unit prices
//! - `wishlist_items` - Saved products
//!
//! Repositories borrow the pool for plain reads and writes. Operations that
//! must share a transaction with other components (stock adjustment, cart
//! clearing, order inserts) are free functions taking `&mut PgConnection`, so
//! the caller decides the transaction boundary.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p freshcart-cli -- migrate
//! ```

pub mod carts;
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;
pub mod wishlist;

use std::str::FromStr;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

use crate::config::DatabaseConfig;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn unique_violation(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }

    /// Whether this error is a `CHECK` constraint violation (e.g. `stock >= 0`).
    #[must_use]
    pub fn is_check_violation(&self) -> bool {
        matches!(self, Self::Database(sqlx::Error::Database(db_err)) if db_err.is_check_violation())
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// Every connection is opened with `statement_timeout` and
/// `idle_in_transaction_session_timeout` set from the configuration, so a
/// stuck query or an abandoned transaction cannot hold row locks forever.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let timeout_ms = config.statement_timeout.as_millis().to_string();
    let options = PgConnectOptions::from_str(config.url.expose_secret())?.options([
        ("statement_timeout", timeout_ms.as_str()),
        ("idle_in_transaction_session_timeout", timeout_ms.as_str()),
    ]);

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
}
