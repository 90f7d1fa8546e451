//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`fc_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core results.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::middleware::request_id::current_request_id;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: fc_core::Error,
}

impl AppError {
    pub fn new(inner: fc_core::Error) -> Self {
        Self { inner }
    }

    /// Stable machine-readable code for the wrapped error.
    pub fn code(&self) -> &'static str {
        match &self.inner {
            fc_core::Error::NotFound { .. } => "not_found",
            fc_core::Error::NoFrames(_) => "no_frames",
            fc_core::Error::Timeout(_) => "timeout",
            fc_core::Error::Unavailable(_) => "unavailable",
            fc_core::Error::Validation(_) => "validation_error",
            fc_core::Error::Io { .. } => "io_error",
            fc_core::Error::Internal(_) => "internal_error",
        }
    }
}

impl From<fc_core::Error> for AppError {
    fn from(e: fc_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::info!(error = %self.inner, "Request not served");
        } else if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.code(),
            "request_id": current_request_id(),
        });

        (status, axum::Json(body)).into_response()
    }
}
