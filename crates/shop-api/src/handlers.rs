//! # Request Handlers
//!
//! Axum request handlers for the shop API.
//! Protected handlers take an `AuthUser`; bodies arrive through `AppJson`.

use crate::error::{ApiError, ErrorResponse};
use crate::extract::{parse_id, AppJson, AppPath, AppQuery, AuthUser};
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shop_core::{ProductDraft, ProductFilter, Registration, ShopError};
use std::str::FromStr;
use tracing::{error, instrument};

// =============================================================================
// Request Types
// =============================================================================

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// "buyer" (default) or "seller"
    #[serde(default)]
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Product search query (`?q=&category=&minPrice=&maxPrice=`)
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
}

impl ProductQuery {
    fn into_filter(self) -> Result<ProductFilter, ShopError> {
        Ok(ProductFilter {
            q: self.q,
            category: self.category,
            min_price: parse_price(self.min_price, "minPrice")?,
            max_price: parse_price(self.max_price, "maxPrice")?,
        })
    }
}

fn parse_price(raw: Option<String>, name: &str) -> Result<Option<Decimal>, ShopError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => Decimal::from_str(v)
            .map(Some)
            .map_err(|_| ShopError::Validation(format!("{} must be a number", name))),
    }
}

/// New product request
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
}

impl From<CreateProductRequest> for ProductDraft {
    fn from(req: CreateProductRequest) -> Self {
        ProductDraft {
            name: req.name,
            description: req.description,
            price: req.price,
            category: req.category,
            image_url: req.image_url,
            stock: req.stock,
        }
    }
}

/// Add-to-cart request
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

// =============================================================================
// Service endpoints
// =============================================================================

/// Service banner with the endpoint list
pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Shopfront API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /api/auth/register",
            "POST /api/auth/login",
            "GET /api/products",
            "GET /api/products/{productId}",
            "GET /api/products/seller/{sellerId}",
            "POST /api/products/add",
            "GET /api/cart",
            "POST /api/cart/add",
            "DELETE /api/cart/remove/{itemId}"
        ]
    }))
}

/// Health check endpoint. Opens the store connection if needed.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.health.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": "shopfront",
                "version": env!("CARGO_PKG_VERSION"),
                "serverTime": Utc::now().to_rfc3339(),
                "database": stats
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            let mut body = serde_json::json!({ "status": "unhealthy" });
            if !state.config.is_production() {
                body["error"] = serde_json::Value::String(e.to_string());
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            format!("Route {} {} not found", method, uri.path()),
            404,
        )),
    )
}

// =============================================================================
// Auth
// =============================================================================

#[instrument(skip_all, fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .auth
        .register(Registration {
            username: request.username,
            email: request.email,
            password: request.password,
            role: request.role,
        })
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Registration successful",
            "token": session.token,
            "user": session.user
        })),
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .auth
        .login(&request.email, &request.password)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(serde_json::json!({
        "message": "Login successful",
        "token": session.token,
        "user": session.user
    })))
}

// =============================================================================
// Products
// =============================================================================

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter().map_err(|e| state.reject(e))?;
    let products = state.catalog.list(filter).await.map_err(|e| state.reject(e))?;
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product_id = parse_id(&product_id, "product id").map_err(|e| state.reject(e))?;
    let product = state
        .catalog
        .get(product_id)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn list_seller_products(
    State(state): State<AppState>,
    AppPath(seller_id): AppPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let seller_id = parse_id(&seller_id, "seller id").map_err(|e| state.reject(e))?;
    let products = state
        .catalog
        .list_by_seller(seller_id)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(products))
}

#[instrument(skip_all, fields(caller = %caller.sub))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(request): AppJson<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .create(&caller, request.into())
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Product added successfully",
            "product": product
        })),
    ))
}

// =============================================================================
// Cart
// =============================================================================

#[instrument(skip_all, fields(user = %caller.sub))]
pub async fn get_cart(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .carts
        .get(caller.user_id())
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(serde_json::json!({ "cart": cart })))
}

#[instrument(skip_all, fields(user = %caller.sub))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(request): AppJson<AddToCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(product_id), Some(quantity)) = (request.product_id, request.quantity) else {
        return Err(state.reject(ShopError::validation(
            "Product ID and quantity required",
        )));
    };
    let product_id = parse_id(&product_id, "product id").map_err(|e| state.reject(e))?;

    let cart = state
        .carts
        .add_item(caller.user_id(), product_id, quantity)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(serde_json::json!({
        "message": "Item added to cart",
        "cart": cart
    })))
}

#[instrument(skip_all, fields(user = %caller.sub))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(item_id): AppPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item_id = parse_id(&item_id, "item id").map_err(|e| state.reject(e))?;

    let cart = state
        .carts
        .remove_item(caller.user_id(), item_id)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(serde_json::json!({
        "message": "Item removed from cart",
        "cart": cart
    })))
}
