//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and account management.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] freshcart_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    DuplicateEmail,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Other invalid input, such as a blank name.
    #[error("{0}")]
    Validation(String),

    /// Password-reset token unknown, already used, or past its expiry.
    #[error("password reset token is invalid or has expired")]
    InvalidOrExpiredToken,

    /// Bearer token missing, malformed, expired, or signed with another key.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The operation would leave the store without an admin.
    #[error("the last admin account cannot be removed or demoted")]
    LastAdminProtected,

    /// An admin tried to delete their own account.
    #[error("you cannot delete your own account")]
    CannotDeleteSelf,

    /// Token signing failed.
    #[error("token signing error: {0}")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
