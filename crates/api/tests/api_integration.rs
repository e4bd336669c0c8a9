//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::TokenSettings;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup_with_state() -> (axum::Router, Arc<api::AppState<InMemoryStore>>) {
    let state = api::create_state(InMemoryStore::new(), TokenSettings::default());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn setup() -> axum::Router {
    setup_with_state().0
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &axum::Router, email: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Shopper", "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json["tokens"]["accessToken"].as_str().unwrap().to_string()
}

async fn admin_token(app: &axum::Router, state: &api::AppState<InMemoryStore>) -> String {
    state
        .auth
        .ensure_admin("admin@example.com", "adminpass")
        .await
        .unwrap();
    let (status, json) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "admin@example.com", "password": "adminpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["tokens"]["accessToken"].as_str().unwrap().to_string()
}

/// Creates a category, a brand and one product per (name, cents) pair.
/// Returns product ids in input order.
async fn seed_catalog(app: &axum::Router, admin: &str, items: &[(&str, i64)]) -> Vec<String> {
    let (_, category) = send(
        app,
        "POST",
        "/api/categories",
        Some(admin),
        Some(json!({ "name": "Tools" })),
    )
    .await;
    let (_, brand) = send(
        app,
        "POST",
        "/api/brands",
        Some(admin),
        Some(json!({ "name": "Acme" })),
    )
    .await;

    let mut ids = Vec::new();
    for (name, cents) in items {
        let (status, json) = send(
            app,
            "POST",
            "/api/admin/products",
            Some(admin),
            Some(json!({
                "name": name,
                "priceCents": cents,
                "categoryId": category["category"]["id"],
                "brandId": brand["brand"]["id"],
                "quantity": 5
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        ids.push(json["product"]["id"].as_str().unwrap().to_string());
    }
    ids
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = setup();
    let token = register(&app, "ann@example.com").await;

    let (status, json) = send(&app, "GET", "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["profile"]["user"]["email"], "ann@example.com");
    assert_eq!(json["profile"]["counts"]["cart"], 0);
    assert!(json["profile"]["user"].get("passwordHash").is_none());

    let (status, json) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ann@example.com", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = setup();
    register(&app, "ann@example.com").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Ann", "email": "ANN@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_anonymous_gets_401_on_user_routes() {
    let app = setup();

    for (method, uri) in [
        ("GET", "/api/cart"),
        ("GET", "/api/orders/my"),
        ("GET", "/api/favorites"),
        ("GET", "/api/users/profile"),
    ] {
        let (status, json) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(json["success"], false);
    }

    let (status, _) = send(&app, "GET", "/api/cart", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_gets_403_on_admin_routes() {
    let app = setup();
    let token = register(&app, "ann@example.com").await;

    let (status, json) = send(&app, "GET", "/api/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/products",
        Some(&token),
        Some(json!({ "name": "X", "priceCents": 1, "categoryId": "", "brandId": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cart_to_order_flow() {
    let (app, state) = setup_with_state();
    let admin = admin_token(&app, &state).await;
    let ids = seed_catalog(&app, &admin, &[("A", 10), ("B", 5)]).await;
    let token = register(&app, "ann@example.com").await;

    send(
        &app,
        "POST",
        "/api/cart/add",
        Some(&token),
        Some(json!({ "productId": ids[0], "quantity": 2 })),
    )
    .await;
    let (status, json) = send(
        &app,
        "POST",
        "/api/cart/add",
        Some(&token),
        Some(json!({ "productId": ids[1] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cart"]["totalCents"], 25);
    assert_eq!(json["cart"]["items"][0]["product"]["name"], "A");
    assert_eq!(json["cart"]["items"][0]["product"]["slug"], "a");
    assert_eq!(json["cart"]["items"][1]["product"]["priceCents"], 5);

    let (status, json) = send(
        &app,
        "PATCH",
        "/api/cart",
        Some(&token),
        Some(json!({ "productId": ids[1], "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cart"]["totalCents"], 20);
    assert_eq!(json["cart"]["items"].as_array().unwrap().len(), 1);

    let (status, json) = send(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({ "address": "1 Road", "phone": "555" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["order"]["totalCents"], 20);
    assert_eq!(json["order"]["status"], "pending");
    assert_eq!(json["order"]["items"][0]["product"]["name"], "A");
    let order_id = json["order"]["id"].as_str().unwrap().to_string();

    let (_, json) = send(&app, "GET", "/api/cart", Some(&token), None).await;
    assert_eq!(json["cart"]["totalCents"], 0);
    assert!(json["cart"]["items"].as_array().unwrap().is_empty());

    let (_, json) = send(&app, "GET", "/api/orders/my", Some(&token), None).await;
    assert_eq!(json["orders"].as_array().unwrap().len(), 1);
    assert_eq!(json["orders"][0]["items"][0]["product"]["name"], "A");
    assert!(json["orders"][0].get("user").is_none());

    let (status, json) = send(&app, "GET", "/api/orders", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["orders"][0]["user"]["email"], "ann@example.com");
    assert_eq!(json["orders"][0]["user"]["name"], "Shopper");
    assert_eq!(json["orders"][0]["items"][0]["product"]["slug"], "a");

    let status_uri = format!("/api/orders/{order_id}/status");
    let (status, json) = send(
        &app,
        "PATCH",
        &status_uri,
        Some(&admin),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["status"], "confirmed");

    let (status, _) = send(
        &app,
        "PATCH",
        &status_uri,
        Some(&admin),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "PATCH",
        &status_uri,
        Some(&admin),
        Some(json!({ "status": "lost" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleted_product_leaves_line_without_summary() {
    let (app, state) = setup_with_state();
    let admin = admin_token(&app, &state).await;
    let ids = seed_catalog(&app, &admin, &[("Lamp", 700)]).await;
    let token = register(&app, "ann@example.com").await;

    send(
        &app,
        "POST",
        "/api/cart/add",
        Some(&token),
        Some(json!({ "productId": ids[0] })),
    )
    .await;
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/products/{}", ids[0]),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", "/api/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cart"]["items"][0]["productId"], ids[0].as_str());
    assert!(json["cart"]["items"][0]["product"].is_null());
    assert_eq!(json["cart"]["totalCents"], 700);
}

#[tokio::test]
async fn test_empty_cart_order_is_rejected() {
    let app = setup();
    let token = register(&app, "ann@example.com").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({ "address": "1 Road", "phone": "555" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Cart is empty");
}

#[tokio::test]
async fn test_review_flow() {
    let (app, state) = setup_with_state();
    let admin = admin_token(&app, &state).await;
    let ids = seed_catalog(&app, &admin, &[("Hammer", 1000)]).await;
    let ann = register(&app, "ann@example.com").await;
    let bob = register(&app, "bob@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/reviews",
        Some(&ann),
        Some(json!({ "productId": ids[0], "rating": 6, "text": "wow" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        "POST",
        "/api/reviews",
        Some(&ann),
        Some(json!({ "productId": ids[0], "rating": 4, "text": "solid" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rating"]["ratingCount"], 1);
    assert_eq!(json["rating"]["ratingAvg"], 4.0);
    let review_id = json["review"]["id"].as_str().unwrap().to_string();

    let (_, json) = send(&app, "GET", &format!("/api/reviews/{}", ids[0]), None, None).await;
    assert_eq!(json["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(json["reviews"][0]["userName"], "Shopper");

    let review_uri = format!("/api/reviews/{review_id}");
    let (status, _) = send(&app, "DELETE", &review_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, "DELETE", &review_uri, Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["review"]["id"], review_id.as_str());
    assert_eq!(json["review"]["text"], "solid");
    assert_eq!(json["rating"]["ratingCount"], 0);
    assert_eq!(json["rating"]["ratingAvg"], 0.0);
}

#[tokio::test]
async fn test_compare_limit_and_favorites_toggle() {
    let (app, state) = setup_with_state();
    let admin = admin_token(&app, &state).await;
    let ids = seed_catalog(
        &app,
        &admin,
        &[("P1", 100), ("P2", 100), ("P3", 100), ("P4", 100), ("P5", 100)],
    )
    .await;
    let token = register(&app, "ann@example.com").await;

    for id in &ids[..4] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/compare/add",
            Some(&token),
            Some(json!({ "productId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, json) = send(
        &app,
        "POST",
        "/api/compare/add",
        Some(&token),
        Some(json!({ "productId": ids[4] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let toggle = Some(json!({ "productId": ids[0] }));
    let (_, json) = send(&app, "POST", "/api/favorites/toggle", Some(&token), toggle.clone()).await;
    assert_eq!(json["favorites"].as_array().unwrap().len(), 1);
    let (_, json) = send(&app, "POST", "/api/favorites/toggle", Some(&token), toggle).await;
    assert!(json["favorites"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let app = setup();
    let (_, json) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Ann", "email": "ann@example.com", "password": "secret1" })),
    )
    .await;
    let refresh = json["tokens"]["refreshToken"].as_str().unwrap().to_string();

    let body = Some(json!({ "refreshToken": refresh }));
    let (status, _) = send(&app, "POST", "/api/auth/refresh", None, body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "POST", "/api/auth/refresh", None, body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid refresh token");
}

#[tokio::test]
async fn test_logout_revokes_access_token() {
    let app = setup();
    let token = register(&app, "ann@example.com").await;

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_reads() {
    let (app, state) = setup_with_state();
    let admin = admin_token(&app, &state).await;
    let ids = seed_catalog(&app, &admin, &[("Cordless Drill", 8900), ("Impact Driver", 12900)]).await;

    let (status, json) = send(&app, "GET", "/api/products?page=1&limit=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["products"].as_array().unwrap().len(), 1);
    assert_eq!(json["pagination"]["total"], 2);
    assert_eq!(json["pagination"]["pages"], 2);

    let (status, json) = send(&app, "GET", "/api/products/cordless-drill", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["product"]["priceCents"], 8900);
    assert_eq!(json["product"]["inStock"], true);

    let (_, json) = send(&app, "GET", "/api/products/search?q=DRI", None, None).await;
    assert_eq!(json["products"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "GET", "/api/products/search", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = send(&app, "GET", "/api/products/filter?maxPrice=9000", None, None).await;
    assert_eq!(json["products"].as_array().unwrap().len(), 1);

    let (_, json) = send(&app, "GET", "/api/products/cordless-drill/related", None, None).await;
    assert_eq!(json["products"].as_array().unwrap().len(), 1);

    let (status, json) = send(&app, "GET", "/api/products/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);

    let (status, json) = send(
        &app,
        "PATCH",
        &format!("/api/admin/products/{}/stock", ids[0]),
        Some(&admin),
        Some(json!({ "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["product"]["inStock"], false);
}

#[tokio::test]
async fn test_malformed_input_is_400() {
    let app = setup();
    let token = register(&app, "ann@example.com").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/cart/add",
        Some(&token),
        Some(json!({ "productId": "not-a-uuid" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, json) = send(
        &app,
        "POST",
        "/api/cart/add",
        Some(&token),
        Some(json!({ "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = send(&app, "GET", "/api/reviews/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
