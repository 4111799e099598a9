//! Success envelope shared by every JSON endpoint.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// `{ "success": true, "message"?: ..., "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// `200 OK` with data.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            status: StatusCode::OK,
        }
    }

    /// `201 Created` with data.
    pub const fn created(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            status: StatusCode::CREATED,
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<Option<()>> {
    /// A message with `data: null`.
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(None).with_message(message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
