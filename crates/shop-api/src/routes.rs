//! # Routes
//!
//! Axum router configuration for the shop API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Auth:
///   - POST /api/auth/register
///   - POST /api/auth/login
///
/// - Products:
///   - GET  /api/products - List, filtered by `q`, `category`, `minPrice`, `maxPrice`
///   - GET  /api/products/{product_id}
///   - GET  /api/products/seller/{seller_id}
///   - POST /api/products/add - Sellers only
///
/// - Cart (bearer token):
///   - GET    /api/cart
///   - POST   /api/cart/add
///   - DELETE /api/cart/remove/{item_id}
///
/// - Service:
///   - GET / - Endpoint index
///   - GET /health - Store connectivity
pub fn create_router(state: AppState) -> Router {
    // Browser and mobile clients live on other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login));

    let product_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/add", post(handlers::create_product))
        .route(
            "/products/seller/{seller_id}",
            get(handlers::list_seller_products),
        )
        .route("/products/{product_id}", get(handlers::get_product));

    let cart_routes = Router::new()
        .route("/cart", get(handlers::get_cart))
        .route("/cart/add", post(handlers::add_to_cart))
        .route("/cart/remove/{item_id}", delete(handlers::remove_from_cart));

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(product_routes)
        .merge(cart_routes);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .fallback(handlers::not_found)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
