//! FreshCart Core - Shared domain types.
//!
//! This crate provides the types shared by every FreshCart component:
//! - `api` - REST backend (auth, catalog, cart, orders, admin)
//! - `cli` - Command-line tools for migrations, seeding and admin bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres`
//! feature so the types can be bound directly in `sqlx` queries.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, roles, order/payment statuses and money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
