//! # Shop Error Types
//!
//! Typed error handling for shopfront.
//! Every service and store operation returns `Result<T, ShopError>`.

use thiserror::Error;
use uuid::Uuid;

/// Core error type for all shop operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Registration with an email that is already taken
    #[error("Email already registered")]
    DuplicateEmail,

    /// Registration with a username that is already taken
    #[error("Username already taken")]
    DuplicateUsername,

    /// Unknown email or wrong password (deliberately indistinguishable)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No usable credentials on a protected route
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Token signature, expiry or payload check failed
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Authenticated, but the role does not allow the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Product does not exist
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: Uuid },

    /// User has no cart yet
    #[error("Cart not found")]
    CartNotFound,

    /// Any other missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Underlying persistence failure
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors (missing secrets, invalid values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Shorthand for a validation failure
    pub fn validation(msg: impl Into<String>) -> Self {
        ShopError::Validation(msg.into())
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Validation(_) => 400,
            ShopError::DuplicateEmail => 400,
            ShopError::DuplicateUsername => 400,
            ShopError::InvalidCredentials => 401,
            ShopError::Unauthenticated(_) => 401,
            ShopError::InvalidToken => 401,
            ShopError::Forbidden(_) => 403,
            ShopError::ProductNotFound { .. } => 404,
            ShopError::CartNotFound => 404,
            ShopError::NotFound(_) => 404,
            ShopError::Store(_) => 500,
            ShopError::Configuration(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }

    /// True for failures on our side rather than the caller's
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;
