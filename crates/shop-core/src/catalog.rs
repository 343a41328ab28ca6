//! # Catalog
//!
//! Product listing, search and seller-side creation.

use crate::error::{ShopError, ShopResult};
use crate::product::{
    ListedProduct, NewProduct, Product, ProductFilter, SellerSummary, DEFAULT_CATEGORY,
    DEFAULT_IMAGE_URL, DEFAULT_STOCK, MAX_PRICE_UNITS, PRICE_SCALE,
};
use crate::store::{ProductStore, UserStore};
use crate::token::Claims;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Seller-supplied product fields, before defaults are applied
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock: Option<i64>,
}

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    users: Arc<dyn UserStore>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductStore>, users: Arc<dyn UserStore>) -> Self {
        Self { products, users }
    }

    /// Search the catalog, attaching each product's seller
    #[instrument(skip(self))]
    pub async fn list(&self, filter: ProductFilter) -> ShopResult<Vec<ListedProduct>> {
        let filter = normalize_filter(filter)?;
        let products = self.products.list_products(&filter).await?;

        let mut seller_ids: Vec<_> = products.iter().map(|p| p.seller_id).collect();
        seller_ids.sort_unstable();
        seller_ids.dedup();

        let sellers: HashMap<_, SellerSummary> = self
            .users
            .users_by_ids(&seller_ids)
            .await?
            .iter()
            .map(|u| (u.id, SellerSummary::from(u)))
            .collect();

        Ok(products
            .into_iter()
            .map(|product| ListedProduct {
                seller: sellers.get(&product.seller_id).cloned(),
                product,
            })
            .collect())
    }

    pub async fn list_by_seller(&self, seller_id: Uuid) -> ShopResult<Vec<Product>> {
        self.products.products_by_seller(seller_id).await
    }

    pub async fn get(&self, product_id: Uuid) -> ShopResult<Product> {
        self.products
            .get_product(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound { product_id })
    }

    /// Create a product owned by the caller. Sellers only.
    #[instrument(skip(self, caller, draft), fields(caller = %caller.sub))]
    pub async fn create(&self, caller: &Claims, draft: ProductDraft) -> ShopResult<Product> {
        if !caller.is_seller() {
            return Err(ShopError::Forbidden(
                "Only sellers can add products".to_string(),
            ));
        }

        let name = non_blank(draft.name)
            .ok_or_else(|| ShopError::validation("Name and price are required"))?;
        let price = draft
            .price
            .ok_or_else(|| ShopError::validation("Name and price are required"))?;
        validate_price(price)?;
        let stock = match draft.stock {
            Some(s) if s < 0 => return Err(ShopError::validation("Stock must not be negative")),
            Some(s) => s,
            None => DEFAULT_STOCK,
        };

        let product = self
            .products
            .insert_product(NewProduct {
                seller_id: caller.user_id(),
                name,
                description: draft
                    .description
                    .map(|d| d.trim().to_string())
                    .unwrap_or_default(),
                price,
                category: non_blank(draft.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                image_url: non_blank(draft.image_url)
                    .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
                stock,
            })
            .await?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Prices must fit `NUMERIC(12, 2)` exactly so every backend stores the same value
fn validate_price(price: Decimal) -> ShopResult<()> {
    if price < Decimal::ZERO {
        return Err(ShopError::validation("Price must not be negative"));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(ShopError::validation(format!(
            "Price must have at most {} decimal places",
            PRICE_SCALE
        )));
    }
    if price >= Decimal::from(MAX_PRICE_UNITS) {
        return Err(ShopError::validation(format!(
            "Price must be less than {}",
            MAX_PRICE_UNITS
        )));
    }
    Ok(())
}

fn normalize_filter(filter: ProductFilter) -> ShopResult<ProductFilter> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(ShopError::validation(
                "minPrice must not be greater than maxPrice",
            ));
        }
    }

    Ok(ProductFilter {
        q: non_blank(filter.q),
        category: non_blank(filter.category),
        ..filter
    })
}
