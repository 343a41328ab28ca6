//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the services, the store health check and configuration.

use crate::error::ApiError;
use shop_core::auth::{DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use shop_core::token::{DEFAULT_TOKEN_TTL_DAYS, MAX_TOKEN_TTL_DAYS};
use shop_core::{
    AuthService, CartService, CatalogService, MemoryStore, ShopError, ShopResult, StoreHealth,
    Stores, TokenIssuer,
};
use shop_pg::{DatabaseConfig, PgStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Signing secret used outside production when `JWT_SECRET` is unset
const DEV_JWT_SECRET: &str = "shopfront-development-secret";

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Token lifetime in days
    pub token_ttl_days: i64,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    /// PostgreSQL settings; `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_days", &self.token_ttl_days)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("database", &self.database)
            .finish()
    }
}

impl AppConfig {
    /// Development defaults with the in-memory store
    pub fn development() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            environment: "development".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            database: None,
        }
    }

    /// Load from environment variables
    pub fn from_env() -> ShopResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> ShopResult<Self> {
        let defaults = Self::development();
        let environment = get("ENVIRONMENT").unwrap_or(defaults.environment);
        let is_production = environment == "production";

        let jwt_secret = match get("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if is_production => {
                return Err(ShopError::Configuration(
                    "JWT_SECRET is required in production".to_string(),
                ))
            }
            None => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let port = match get("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| ShopError::Configuration(format!("Invalid PORT value: {}", p)))?,
            None => defaults.port,
        };

        let token_ttl_days = match get("TOKEN_TTL_DAYS") {
            Some(v) => v
                .parse::<i64>()
                .ok()
                .filter(|d| (1..=MAX_TOKEN_TTL_DAYS).contains(d))
                .ok_or_else(|| {
                    ShopError::Configuration(format!(
                        "TOKEN_TTL_DAYS must be between 1 and {}",
                        MAX_TOKEN_TTL_DAYS
                    ))
                })?,
            None => defaults.token_ttl_days,
        };

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|c| (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(c))
                .ok_or_else(|| {
                    ShopError::Configuration(format!(
                        "BCRYPT_COST must be between {} and {}",
                        MIN_BCRYPT_COST, MAX_BCRYPT_COST
                    ))
                })?,
            None => defaults.bcrypt_cost,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            environment,
            jwt_secret,
            token_ttl_days,
            bcrypt_cost,
            database: DatabaseConfig::from_lookup(&get)?,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> ShopResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ShopError::Configuration(format!("Invalid socket address: {}", e)))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Name of the store backend this config selects
    pub fn backend_name(&self) -> &'static str {
        if self.database.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Registration, login and token verification
    pub auth: AuthService,
    /// Product listing and creation
    pub catalog: CatalogService,
    /// Cart mutations
    pub carts: CartService,
    /// Store connectivity check
    pub health: Arc<dyn StoreHealth>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Wire the services over the given stores
    pub fn new(config: AppConfig, stores: Stores) -> ShopResult<Self> {
        let tokens = Arc::new(TokenIssuer::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl_days,
        )?);

        Ok(Self {
            catalog: CatalogService::new(stores.products.clone(), stores.users.clone()),
            auth: AuthService::new(stores.users, tokens, config.bcrypt_cost)?,
            carts: CartService::new(stores.carts, stores.products),
            health: stores.health,
            config,
        })
    }

    /// Pick the backend named by the config. Never connects.
    pub fn from_config(config: AppConfig) -> ShopResult<Self> {
        let stores = match &config.database {
            Some(db) => {
                info!(
                    max_connections = db.max_connections,
                    "Using PostgreSQL store (connects on first request)"
                );
                Stores::from_backend(Arc::new(PgStore::new(db.clone())))
            }
            None => {
                warn!("DATABASE_URL not set, using the in-memory store (data is lost on restart)");
                Stores::from_backend(Arc::new(MemoryStore::new()))
            }
        };
        Self::new(config, stores)
    }

    /// Turn a service error into a response, showing details outside production
    pub fn reject(&self, err: ShopError) -> ApiError {
        ApiError::new(err).with_details(!self.config.is_production())
    }
}
