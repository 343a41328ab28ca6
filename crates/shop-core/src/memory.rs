//! # Memory Store
//!
//! In-process backend for development and tests. Every mutation happens under
//! a single write lock, so cart upserts are atomic.

use crate::cart::Cart;
use crate::error::{ShopError, ShopResult};
use crate::product::{NewProduct, Product, ProductFilter};
use crate::store::{CartStore, ProductStore, StoreHealth, StoreStats, UserStore};
use crate::user::{NewUser, User};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    /// Insertion order doubles as listing order
    products: Vec<Product>,
    /// Keyed by owning user
    carts: HashMap<Uuid, Cart>,
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> ShopResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> ShopResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: NewUser) -> ShopResult<User> {
        let mut inner = self.inner.write().await;

        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(ShopError::DuplicateEmail);
        }
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(ShopError::DuplicateUsername);
        }

        let user = user.into_user();
        inner.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get_product(&self, id: Uuid) -> ShopResult<Option<Product>> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> ShopResult<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn products_by_seller(&self, seller_id: Uuid) -> ShopResult<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect())
    }

    async fn insert_product(&self, product: NewProduct) -> ShopResult<Product> {
        let product = product.into_product();
        self.inner.write().await.products.push(product.clone());
        Ok(product)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_for_user(&self, user_id: Uuid) -> ShopResult<Option<Cart>> {
        let inner = self.inner.read().await;
        Ok(inner.carts.get(&user_id).cloned())
    }

    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> ShopResult<Cart> {
        let mut inner = self.inner.write().await;
        let cart = inner
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::new(user_id));
        cart.add_quantity(product_id, quantity)?;
        Ok(cart.clone())
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> ShopResult<Option<Cart>> {
        let mut inner = self.inner.write().await;
        Ok(inner.carts.get_mut(&user_id).map(|cart| {
            cart.remove_line(item_id);
            cart.clone()
        }))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn stats(&self) -> ShopResult<StoreStats> {
        let inner = self.inner.read().await;
        let mut collections = BTreeMap::new();
        collections.insert("users".to_string(), inner.users.len() as i64);
        collections.insert("products".to_string(), inner.products.len() as i64);
        collections.insert("carts".to_string(), inner.carts.len() as i64);

        Ok(StoreStats {
            backend: "memory",
            name: None,
            collections,
        })
    }
}
