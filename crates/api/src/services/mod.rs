//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, bearer tokens, password reset, user management
//! - `catalog` - Products and categories
//! - `cart` - Per-user cart with merge-by-product
//! - `orders` - Transactional checkout and cancellation
//! - `wishlist` - Saved products
//! - `admin` - Dashboard aggregates
//! - `email` - Notification delivery
//!
//! Services borrow the pool for the duration of a request and own no state of
//! their own.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod orders;
pub mod wishlist;

pub use admin::AdminService;
pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService};
pub use email::{EmailError, LogNotifier, Notifier, PasswordResetMessage, SmtpNotifier};
pub use orders::{OrderError, OrderService};
pub use wishlist::{WishlistError, WishlistService};
