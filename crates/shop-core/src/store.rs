//! # Store Traits
//!
//! Persistence contracts for credentials, catalog and carts.
//! Implementations: in-process memory store (`crate::memory`), PostgreSQL (`shop-pg`).
//!
//! ```text
//! ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//! │  UserStore   │ │ ProductStore │ │  CartStore   │ │ StoreHealth  │
//! └──────┬───────┘ └──────┬───────┘ └──────┬───────┘ └──────┬───────┘
//!        └────────────────┴───────┬────────┴────────────────┘
//!                 ┌───────────────┴───────────────┐
//!         ┌───────┴───────┐               ┌───────┴───────┐
//!         │  MemoryStore  │               │    PgStore    │
//!         └───────────────┘               └───────────────┘
//! ```

use crate::cart::Cart;
use crate::error::ShopResult;
use crate::product::{NewProduct, Product, ProductFilter};
use crate::user::{NewUser, User};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Persisted user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up by already case-folded email
    async fn find_user_by_email(&self, email: &str) -> ShopResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> ShopResult<Option<User>>;

    /// Fetch several users at once. Unknown ids are skipped.
    async fn users_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<User>>;

    /// Insert a user.
    ///
    /// Unique conflicts must surface as `DuplicateEmail` or `DuplicateUsername`,
    /// never as a generic store error.
    async fn insert_user(&self, user: NewUser) -> ShopResult<User>;
}

/// Persisted catalog
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_product(&self, id: Uuid) -> ShopResult<Option<Product>>;

    /// Fetch several products at once. Unknown ids are skipped.
    async fn products_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<Product>>;

    /// Full matching set, no pagination
    async fn list_products(&self, filter: &ProductFilter) -> ShopResult<Vec<Product>>;

    async fn products_by_seller(&self, seller_id: Uuid) -> ShopResult<Vec<Product>>;

    async fn insert_product(&self, product: NewProduct) -> ShopResult<Product>;
}

/// Persisted per-user carts
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart_for_user(&self, user_id: Uuid) -> ShopResult<Option<Cart>>;

    /// Add `quantity` units of a product to the user's cart as one atomic step.
    ///
    /// Creates the cart when missing. Increments the existing line for the
    /// product, or appends a new one. Two concurrent calls for the same
    /// product must end with a single line holding the summed quantity.
    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> ShopResult<Cart>;

    /// Drop the line with the given id.
    ///
    /// Returns `None` when the user has no cart. An unknown line id leaves the
    /// cart untouched.
    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> ShopResult<Option<Cart>>;
}

/// Connectivity check for the health endpoint
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn stats(&self) -> ShopResult<StoreStats>;
}

/// Store connectivity report
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Backend name (e.g., "memory", "postgres")
    pub backend: &'static str,
    /// Database name, if the backend has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Record count per collection/table
    pub collections: BTreeMap<String, i64>,
}

/// Anything that can serve every store role
pub trait Backend: UserStore + ProductStore + CartStore + StoreHealth {}

impl<T> Backend for T where T: UserStore + ProductStore + CartStore + StoreHealth {}

/// Store handles injected into the services
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Use one backend for every role
    pub fn from_backend<B: Backend + 'static>(backend: Arc<B>) -> Self {
        Self {
            users: backend.clone(),
            products: backend.clone(),
            carts: backend.clone(),
            health: backend,
        }
    }
}
