//! HTTP-level tests over the in-memory store.

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use shop_api::{create_router, AppConfig, AppState};
use shop_core::{MemoryStore, Stores};
use std::sync::Arc;

fn server() -> TestServer {
    let stores = Stores::from_backend(Arc::new(MemoryStore::new()));
    let state = AppState::new(AppConfig::development(), stores).unwrap();
    TestServer::new(create_router(state)).unwrap()
}

/// Register an account and return its token and id
async fn register(server: &TestServer, username: &str, role: &str) -> (String, String) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123",
            "role": role
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let body: Value = response.json();
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn add_product(server: &TestServer, token: &str, name: &str, price: f64) -> String {
    let response = server
        .post("/api/products/add")
        .authorization_bearer(token)
        .json(&json!({ "name": name, "price": price, "description": "test item" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let body: Value = response.json();
    body["product"]["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Service
// =============================================================================

#[tokio::test]
async fn test_index_and_health() {
    let server = server();

    let index: Value = server.get("/").await.json();
    assert!(index["endpoints"].as_array().unwrap().len() >= 8);

    let health = server.get("/health").await;
    assert_eq!(health.status_code(), StatusCode::OK);
    let body: Value = health.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["backend"], "memory");
    assert_eq!(body["database"]["collections"]["users"], 0);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let response = server().get("/api/orders").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert_eq!(body["error"], "Route GET /api/orders not found");
    assert_eq!(body["code"], 404);
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_register_and_login() {
    let server = server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "Alice@Example.com",
            "password": "secret123"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "buyer");
    assert!(body["user"].get("password_hash").is_none());
    assert!(!body["token"].as_str().unwrap().is_empty());

    let login = server
        .post("/api/auth/login")
        .json(&json!({ "email": "alice@example.com", "password": "secret123" }))
        .await;
    assert_eq!(login.status_code(), StatusCode::OK);
    let login: Value = login.json();
    assert_eq!(login["user"]["id"], body["user"]["id"]);
}

#[tokio::test]
async fn test_duplicate_registration() {
    let server = server();
    register(&server, "bob", "buyer").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "bobby",
            "email": "bob@example.com",
            "password": "secret123"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Email already registered");

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "bob",
            "email": "bob2@example.com",
            "password": "secret123"
        }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["error"], "Username already taken");
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let server = server();
    register(&server, "carol", "buyer").await;

    let wrong_password = server
        .post("/api/auth/login")
        .json(&json!({ "email": "carol@example.com", "password": "nope-nope" }))
        .await;
    let unknown_email = server
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": "secret123" }))
        .await;

    assert_eq!(wrong_password.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.text(), unknown_email.text());
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let response = server()
        .post("/api/auth/login")
        .bytes("{\"email\": ".into())
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], 400);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_only_sellers_add_products() {
    let server = server();
    let (buyer, _) = register(&server, "dave", "buyer").await;
    let (seller, seller_id) = register(&server, "erin", "seller").await;

    let response = server
        .post("/api/products/add")
        .authorization_bearer(&buyer)
        .json(&json!({ "name": "Hat", "price": 10.0 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = server
        .post("/api/products/add")
        .json(&json!({ "name": "Hat", "price": 10.0 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/products/add")
        .authorization_bearer(&seller)
        .json(&json!({ "name": "Hat", "price": 12.5 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["product"]["seller_id"], seller_id.as_str());
    assert_eq!(body["product"]["price"], 12.5);
    assert_eq!(body["product"]["stock"], 100);
    assert_eq!(body["product"]["category"], "General");

    let missing_price = server
        .post("/api/products/add")
        .authorization_bearer(&seller)
        .json(&json!({ "name": "Hat" }))
        .await;
    assert_eq!(missing_price.status_code(), StatusCode::BAD_REQUEST);

    let listed: Value = server
        .get(&format!("/api/products/seller/{}", seller_id))
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_product_search() {
    let server = server();
    let (seller, seller_id) = register(&server, "fern", "seller").await;

    add_product(&server, &seller, "Red Shirt", 15.0).await;
    add_product(&server, &seller, "Blue Shirt", 25.0).await;
    add_product(&server, &seller, "Mug", 12.0).await;
    add_product(&server, &seller, "Cheap Shirt", 5.0).await;

    let in_range: Value = server
        .get("/api/products")
        .add_query_param("minPrice", "10")
        .add_query_param("maxPrice", "20")
        .await
        .json();
    let names: Vec<_> = in_range
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Red Shirt", "Mug"]);
    assert_eq!(in_range[0]["seller"]["username"], "fern");
    assert_eq!(in_range[0]["seller"]["id"], seller_id.as_str());
    assert_eq!(in_range[0]["seller"]["email"], "fern@example.com");
    assert!(in_range[0]["seller"].get("password_hash").is_none());

    let shirts: Value = server
        .get("/api/products")
        .add_query_param("q", "shirt")
        .add_query_param("minPrice", "10")
        .add_query_param("maxPrice", "20")
        .await
        .json();
    assert_eq!(shirts.as_array().unwrap().len(), 1);
    assert_eq!(shirts[0]["name"], "Red Shirt");

    let bad = server
        .get("/api/products")
        .add_query_param("minPrice", "ten")
        .await;
    assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

    let repeated = server
        .get("/api/products")
        .add_query_param("q", "a")
        .add_query_param("q", "b")
        .await;
    assert_eq!(repeated.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = repeated.json();
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("duplicate field"));
}

#[tokio::test]
async fn test_price_precision_and_range() {
    let server = server();
    let (seller, _) = register(&server, "ivy", "seller").await;

    for price in [json!(19.999), json!(1e11)] {
        let response = server
            .post("/api/products/add")
            .authorization_bearer(&seller)
            .json(&json!({ "name": "Odd", "price": price }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], 400);
    }
}

#[tokio::test]
async fn test_get_product() {
    let server = server();
    let (seller, _) = register(&server, "gail", "seller").await;
    let id = add_product(&server, &seller, "Lamp", 40.0).await;

    let product: Value = server.get(&format!("/api/products/{}", id)).await.json();
    assert_eq!(product["name"], "Lamp");

    let missing = server
        .get("/api/products/00000000-0000-4000-8000-000000000000")
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    let malformed = server.get("/api/products/lamp").await;
    assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_requires_token() {
    let server = server();

    let response = server.get("/api/cart").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Unauthenticated: No token provided");

    let response = server
        .get("/api/cart")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Token abc"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/cart")
        .authorization_bearer("not.a.token")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_flow() {
    let server = server();
    let (seller, _) = register(&server, "hugo", "seller").await;
    let (buyer, _) = register(&server, "iris", "buyer").await;
    let product_id = add_product(&server, &seller, "Notebook", 3.5).await;

    let empty: Value = server
        .get("/api/cart")
        .authorization_bearer(&buyer)
        .await
        .json();
    assert_eq!(empty, json!({ "cart": { "items": [] } }));

    for quantity in [2, 3] {
        let response = server
            .post("/api/cart/add")
            .authorization_bearer(&buyer)
            .json(&json!({ "product_id": product_id, "quantity": quantity }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let body: Value = server
        .get("/api/cart")
        .authorization_bearer(&buyer)
        .await
        .json();
    let items = body["cart"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);
    assert_eq!(items[0]["product_id"], product_id.as_str());
    assert_eq!(items[0]["product"]["name"], "Notebook");
    assert_eq!(items[0]["product"]["price"], 3.5);

    let line_id = items[0]["id"].as_str().unwrap().to_string();
    for _ in 0..2 {
        let response = server
            .delete(&format!("/api/cart/remove/{}", line_id))
            .authorization_bearer(&buyer)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["message"], "Item removed from cart");
        assert!(body["cart"]["items"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_cart_add_validation() {
    let server = server();
    let (seller, _) = register(&server, "jade", "seller").await;
    let (buyer, _) = register(&server, "kurt", "buyer").await;
    let product_id = add_product(&server, &seller, "Pen", 1.0).await;

    for body in [
        json!({ "product_id": product_id }),
        json!({ "product_id": product_id, "quantity": 0 }),
        json!({ "product_id": product_id, "quantity": -2 }),
        json!({ "product_id": "pen", "quantity": 1 }),
        json!({ "product_id": product_id, "quantity": "3" }),
    ] {
        let response = server
            .post("/api/cart/add")
            .authorization_bearer(&buyer)
            .json(&body)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", body);
    }

    let response = server
        .post("/api/cart/add")
        .authorization_bearer(&buyer)
        .json(&json!({ "product_id": "00000000-0000-4000-8000-000000000000", "quantity": 1 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_without_cart() {
    let server = server();
    let (buyer, _) = register(&server, "lena", "buyer").await;

    let response = server
        .delete("/api/cart/remove/00000000-0000-4000-8000-000000000000")
        .authorization_bearer(&buyer)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Cart not found");
}
