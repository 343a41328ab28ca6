//! # shop-core
//!
//! Core types, store traits and services for the shopfront backend.
//!
//! This crate provides:
//! - `User`, `Product`, `Cart` and their client-facing projections
//! - `UserStore`, `ProductStore`, `CartStore` traits for persistence backends
//! - `MemoryStore`, an in-process backend for development and tests
//! - `TokenIssuer` for stateless access tokens
//! - `AuthService`, `CatalogService`, `CartService` holding the business rules
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CartService, MemoryStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let carts = CartService::new(store.clone(), store);
//!
//! // Adding the same product twice yields one line with quantity 5
//! carts.add_item(user_id, product_id, 2).await?;
//! let cart = carts.add_item(user_id, product_id, 3).await?;
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod memory;
pub mod product;
pub mod store;
pub mod token;
pub mod user;

// Re-exports for convenience
pub use auth::{AuthService, AuthSession, Registration};
pub use cart::{Cart, CartLineItem, CartService, ResolvedCart, ResolvedLineItem};
pub use catalog::{CatalogService, ProductDraft};
pub use error::{ShopError, ShopResult};
pub use memory::MemoryStore;
pub use product::{
    ListedProduct, NewProduct, Product, ProductFilter, ProductSummary, SellerSummary,
};
pub use store::{
    Backend, CartStore, ProductStore, StoreHealth, StoreStats, Stores, UserStore,
};
pub use token::{Claims, TokenIssuer};
pub use user::{NewUser, PublicUser, Role, User};
