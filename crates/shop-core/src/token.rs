//! # Access Tokens
//!
//! Stateless HS256 tokens. Verification is a pure function of the signing
//! secret and the token; it never consults a store.

use crate::error::{ShopError, ShopResult};
use crate::user::{PublicUser, Role};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;
pub const MAX_TOKEN_TTL_DAYS: i64 = 7;

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: Uuid,
    /// Legacy duplicate of `sub`, still read by older clients
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}

/// Signs and verifies access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_days", &self.ttl.num_days())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer. `ttl_days` must be within 1..=7.
    pub fn new(secret: &[u8], ttl_days: i64) -> ShopResult<Self> {
        if secret.is_empty() {
            return Err(ShopError::Configuration(
                "Token signing secret must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&ttl_days) {
            return Err(ShopError::Configuration(format!(
                "Token lifetime must be between 1 and {} days, got {}",
                MAX_TOKEN_TTL_DAYS, ttl_days
            )));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl: Duration::days(ttl_days),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for a user
    pub fn issue(&self, user: &PublicUser) -> ShopResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ShopError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> ShopResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                ShopError::InvalidToken
            })?;

        if claims.sub != claims.id {
            debug!("Token rejected: subject and legacy id disagree");
            return Err(ShopError::InvalidToken);
        }

        Ok(claims)
    }
}
