//! # Extractors
//!
//! Request extractors that reject with `ApiError` instead of axum's plain
//! text rejections.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use shop_core::{Claims, ShopError};
use uuid::Uuid;

/// JSON body whose parse failures become 400 `{ error, code }` responses
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path parameters whose parse failures become 400 `{ error, code }` responses
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// Query string whose parse failures become 400 `{ error, code }` responses
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// Verified bearer token of the caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                state.reject(ShopError::Unauthenticated("No token provided".to_string()))
            })?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                state.reject(ShopError::Unauthenticated("Invalid token format".to_string()))
            })?;

        let claims = state
            .auth
            .tokens()
            .verify(token)
            .map_err(|e| state.reject(e))?;

        Ok(AuthUser(claims))
    }
}

/// Parse an id taken from a path segment or body field
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ShopError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ShopError::Validation(format!("Invalid {}", what)))
}
