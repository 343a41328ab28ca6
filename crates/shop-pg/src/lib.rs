//! # shop-pg
//!
//! PostgreSQL backend for shopfront.
//!
//! `PgStore` implements `UserStore`, `ProductStore`, `CartStore` and
//! `StoreHealth` on a single connection pool that is opened on first use.
//! Schema migrations live in `migrations/` and run when the pool opens.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_core::Stores;
//! use shop_pg::{DatabaseConfig, PgStore};
//! use std::sync::Arc;
//!
//! let config = DatabaseConfig::from_env()?.expect("DATABASE_URL not set");
//! let stores = Stores::from_backend(Arc::new(PgStore::new(config)));
//! ```
//!
//! Adding to a cart is one `INSERT ... ON CONFLICT DO UPDATE` against the
//! `(cart_id, product_id)` key, so concurrent adds of the same product sum
//! into one line instead of racing.

pub mod config;
pub mod store;

// Re-exports
pub use config::DatabaseConfig;
pub use store::PgStore;
