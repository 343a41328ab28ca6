//! # Product Types
//!
//! Catalog records, the create payload and the listing filter.

use crate::user::User;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_IMAGE_URL: &str = "https://via.placeholder.com/300";
pub const DEFAULT_STOCK: i64 = 100;

/// Prices carry at most this many fractional digits
pub const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound on prices (ten integer digits)
pub const MAX_PRICE_UNITS: i64 = 10_000_000_000;

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Unit price, never negative
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Owning seller
    pub seller_id: Uuid,

    pub category: String,

    pub image_url: String,

    /// Units on hand, never negative
    pub stock: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Validated fields for a new product
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_url: String,
    pub stock: i64,
}

impl NewProduct {
    /// Materialize into a full record with a fresh id
    pub fn into_product(self) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            price: self.price,
            seller_id: self.seller_id,
            category: self.category,
            image_url: self.image_url,
            stock: self.stock,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Display fields of a product as embedded in a cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image_url: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
        }
    }
}

/// Seller fields attached to listed products
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for SellerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// A product as returned by catalog search, with its seller resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedProduct {
    #[serde(flatten)]
    pub product: Product,
    /// `None` when the seller account no longer exists
    pub seller: Option<SellerSummary>,
}

/// Listing filter. All present conditions are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Case-insensitive substring matched against name or description
    pub q: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    /// In-process evaluation, used by the memory store
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(q) = &self.q {
            let needle = q.to_lowercase();
            let hit = product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if &product.category != category {
                return false;
            }
        }

        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }

        true
    }
}
