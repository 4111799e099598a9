//! FreshCart API library.
//!
//! This crate provides the grocery store backend as a library, so the binary,
//! the CLI and the integration tests share the same services and router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
