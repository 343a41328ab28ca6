//! # Cart
//!
//! Per-user cart records and the cart service.
//!
//! State per user is `NoCart -> HasCart { items }`. The cart is created lazily
//! by the first add; adding a product that is already in the cart increments
//! its line instead of appending a second one.

use crate::error::{ShopError, ShopResult};
use crate::product::ProductSummary;
use crate::store::{CartStore, ProductStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Largest quantity a single line may hold (fits a signed 32-bit column)
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// A line in a cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Line id, distinct from the product id
    pub id: Uuid,
    pub product_id: Uuid,
    /// Always >= 1
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// A user's cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLineItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Empty cart for a user
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Increment the line for `product_id`, or append one.
    pub fn add_quantity(&mut self, product_id: Uuid, quantity: u32) -> ShopResult<()> {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .filter(|q| *q <= MAX_LINE_QUANTITY)
                    .ok_or_else(|| ShopError::validation("Quantity too large"))?;
            }
            None => self.items.push(CartLineItem {
                id: Uuid::new_v4(),
                product_id,
                quantity,
                added_at: Utc::now(),
            }),
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Drop a line by its own id. Returns whether anything was removed.
    pub fn remove_line(&mut self, item_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        self.updated_at = Utc::now();
        self.items.len() != before
    }

    /// Total number of units across lines
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// A cart line with its product's display fields attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLineItem {
    pub id: Uuid,
    pub product_id: Uuid,
    /// `None` when the product has since disappeared from the catalog
    pub product: Option<ProductSummary>,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// Cart as returned to clients
///
/// A user without a cart gets `{ "items": [] }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedCart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub items: Vec<ResolvedLineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResolvedCart {
    /// The synthetic cart of a user who never added anything
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart operations on top of the cart and catalog stores
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductStore>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartStore>, products: Arc<dyn ProductStore>) -> Self {
        Self { carts, products }
    }

    /// The user's cart, or an empty one if none exists yet
    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Uuid) -> ShopResult<ResolvedCart> {
        match self.carts.cart_for_user(user_id).await? {
            Some(cart) => self.resolve(cart).await,
            None => {
                debug!("No cart yet, returning empty cart");
                Ok(ResolvedCart::empty())
            }
        }
    }

    /// Add `quantity` units of a product, creating the cart when needed
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> ShopResult<ResolvedCart> {
        let quantity = validate_quantity(quantity)?;

        if self.products.get_product(product_id).await?.is_none() {
            return Err(ShopError::ProductNotFound { product_id });
        }

        let cart = self.carts.add_item(user_id, product_id, quantity).await?;
        info!(cart_id = %cart.id, lines = cart.items.len(), "Cart line upserted");

        self.resolve(cart).await
    }

    /// Remove a line by id. Unknown ids are a no-op.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> ShopResult<ResolvedCart> {
        let cart = self
            .carts
            .remove_item(user_id, item_id)
            .await?
            .ok_or(ShopError::CartNotFound)?;

        info!(cart_id = %cart.id, lines = cart.items.len(), "Cart line removed");
        self.resolve(cart).await
    }

    async fn resolve(&self, cart: Cart) -> ShopResult<ResolvedCart> {
        let ids: Vec<Uuid> = cart.items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, ProductSummary> = self
            .products
            .products_by_ids(&ids)
            .await?
            .iter()
            .map(|p| (p.id, ProductSummary::from(p)))
            .collect();

        let items = cart
            .items
            .into_iter()
            .map(|line| ResolvedLineItem {
                id: line.id,
                product_id: line.product_id,
                product: products.get(&line.product_id).cloned(),
                quantity: line.quantity,
                added_at: line.added_at,
            })
            .collect();

        Ok(ResolvedCart {
            id: Some(cart.id),
            user_id: Some(cart.user_id),
            items,
            updated_at: Some(cart.updated_at),
        })
    }
}

fn validate_quantity(quantity: i64) -> ShopResult<u32> {
    if quantity <= 0 {
        return Err(ShopError::validation("Quantity must be a positive integer"));
    }
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| ShopError::validation("Quantity too large"))
}
