//! # shop-api
//!
//! HTTP API layer for shopfront.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for auth, products and carts
//! - Bearer-token and JSON extractors that reject with `{ error, code }`
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Endpoint index |
//! | GET | `/health` | Store connectivity and counts |
//! | POST | `/api/auth/register` | Create account, returns token |
//! | POST | `/api/auth/login` | Exchange credentials for token |
//! | GET | `/api/products` | List and search products |
//! | GET | `/api/products/{id}` | Get product |
//! | GET | `/api/products/seller/{id}` | Products of one seller |
//! | POST | `/api/products/add` | Create product (sellers) |
//! | GET | `/api/cart` | Caller's cart |
//! | POST | `/api/cart/add` | Add or increment a line |
//! | DELETE | `/api/cart/remove/{id}` | Remove a line |

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
