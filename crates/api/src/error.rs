//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. This is the only place that
//! turns a failure into an HTTP status, and server-side failures are captured
//! to Sentry before the response is built. Failure bodies use the same
//! envelope as successes: `{ "success": false, "message": ... }`.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartError, CatalogError, OrderError, WishlistError};

/// Whether 500 responses carry the underlying error text.
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Allow or forbid internal error details in responses. Set once at start-up
/// from the configured environment.
pub fn expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::Relaxed);
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Wishlist(#[from] WishlistError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// No valid bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Too many requests, please try again later")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
}

impl AppError {
    /// The HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::Validation(_)
                | AuthError::InvalidOrExpiredToken
                | AuthError::CannotDeleteSelf => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::DuplicateEmail | AuthError::LastAdminProtected => StatusCode::CONFLICT,
                AuthError::Repository(err) => repository_status(err),
                AuthError::TokenSigning(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Catalog(err) => match err {
                CatalogError::ProductNotFound | CatalogError::CategoryNotFound => {
                    StatusCode::NOT_FOUND
                }
                CatalogError::CategoryInUse(_) | CatalogError::DuplicateCategory => {
                    StatusCode::CONFLICT
                }
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::Repository(err) => repository_status(err),
            },
            Self::Cart(err) => match err {
                CartError::CartNotFound | CartError::ItemNotFound | CartError::ProductNotFound => {
                    StatusCode::NOT_FOUND
                }
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::Repository(err) => repository_status(err),
            },
            Self::Order(err) => match err {
                OrderError::Validation(_)
                | OrderError::InsufficientStock { .. }
                | OrderError::InvalidTransition { .. }
                | OrderError::InvalidValue(_) => StatusCode::BAD_REQUEST,
                OrderError::OrderNotFound | OrderError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::Repository(err) => repository_status(err),
            },
            Self::Wishlist(err) => match err {
                WishlistError::ProductNotFound | WishlistError::NotInWishlist => {
                    StatusCode::NOT_FOUND
                }
                WishlistError::AlreadyInWishlist => StatusCode::CONFLICT,
                WishlistError::Repository(err) => repository_status(err),
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The client-facing message.
    fn message(&self, status: StatusCode) -> String {
        if status.is_server_error() && !EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
            return "Internal server error".to_string();
        }
        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Invalid email or password".to_string(),
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            other => other.to_string(),
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let message = self.message(status);
        (
            status,
            Json(ErrorBody {
                success: false,
                message: &message,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractor so errors are associated with the caller.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use freshcart_core::{OrderStatus, ProductId};
    use http_body_util::BodyExt;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            get_status(AuthError::DuplicateEmail.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::LastAdminProtected.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::InvalidOrExpiredToken.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(CatalogError::CategoryInUse(3).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CartError::ItemNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                OrderError::InsufficientStock {
                    product_id: ProductId::new(1),
                    requested: 2,
                    available: 1,
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                OrderError::InvalidTransition {
                    from: OrderStatus::Cancelled,
                    to: OrderStatus::Cancelled,
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(WishlistError::AlreadyInWishlist.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("x".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = AppError::from(CartError::CartNotFound).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "cart not found");
    }

    #[tokio::test]
    async fn test_server_error_redacted() {
        expose_internal_errors(false);
        let response = AppError::Internal("pool exhausted".to_string()).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error");
    }
}
