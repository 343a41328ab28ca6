//! # API Errors
//!
//! Maps `ShopError` onto `{ error, code, details? }` JSON responses.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shop_core::ShopError;
use tracing::error;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A `ShopError` on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError {
    error: ShopError,
    expose_details: bool,
}

impl ApiError {
    pub fn new(error: ShopError) -> Self {
        Self {
            error,
            expose_details: false,
        }
    }

    /// Echo the underlying cause of 5xx errors in `details`
    pub fn with_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn inner(&self) -> &ShopError {
        &self.error
    }
}

impl From<ShopError> for ApiError {
    fn from(error: ShopError) -> Self {
        Self::new(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(ShopError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(ShopError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(ShopError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = status.as_u16();

        let body = if self.error.is_server_error() {
            error!(code, "Request failed: {}", self.error);
            let body = ErrorResponse::new("Internal server error", code);
            if self.expose_details {
                body.with_details(self.error.to_string())
            } else {
                body
            }
        } else {
            ErrorResponse::new(self.error.to_string(), code)
        };

        (status, Json(body)).into_response()
    }
}
