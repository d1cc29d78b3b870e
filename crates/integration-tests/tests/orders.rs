//! Checkout, order visibility and status transitions.

use atelier_api::config::ApiConfig;
use atelier_core::order::TransitionPolicy;
use atelier_core::{Money, ProductId};
use atelier_integration_tests::{Actor, TestApp, decimal};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

async fn place(app: &TestApp, customer: &Actor, product: i64) -> Value {
    let reply = app
        .post(
            "/api/orders",
            Some(customer),
            json!({
                "items": [{ "product": product, "quantity": 2, "price": 10.0 }],
                "total": 20.0,
                "shippingAddress": "1 Loom Lane",
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.body["order"].clone()
}

#[tokio::test]
async fn test_owner_reads_order_and_stranger_is_forbidden() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;
    let bob = app.customer("Bob").await;

    let order = place(&app, &alice, 1).await;
    assert_eq!(order["reference"], "ORD-001");
    assert_eq!(order["customerName"], "Alice");
    assert_eq!(order["customerEmail"], "alice@example.com");
    let path = format!("/api/orders/{}", order["id"]);

    let mine = app.get(&path, Some(&alice)).await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.body["order"]["status"], "pending");
    assert_eq!(decimal(&mine.body["order"]["total"]), Decimal::new(20, 0));

    let theirs = app.get(&path, Some(&bob)).await;
    assert_eq!(theirs.status, StatusCode::FORBIDDEN);
    assert_eq!(theirs.code(), "forbidden");
}

#[tokio::test]
async fn test_items_are_a_snapshot() {
    let app = TestApp::new();
    let designer = app.designer("Ada").await;
    let customer = app.customer("Alice").await;

    let product = app
        .post(
            "/api/products",
            Some(&designer),
            json!({ "title": "Tee", "price": "10.00" }),
        )
        .await;
    let product_id = product.body["id"].as_i64().unwrap();
    let order = place(&app, &customer, product_id).await;

    let id = i32::try_from(product_id).unwrap();
    app.store
        .set_product_price(ProductId::new(id), Money::from_cents(9_999).unwrap())
        .await;

    let reread = app
        .get(&format!("/api/orders/{}", order["id"]), Some(&customer))
        .await;
    let stored = &reread.body["order"];
    assert_eq!(decimal(&stored["total"]), Decimal::new(20, 0));
    assert_eq!(decimal(&stored["items"][0]["price"]), Decimal::new(10, 0));
    assert_eq!(stored["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn test_list_is_scoped_for_customers_and_global_for_admins() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;
    let bob = app.customer("Bob").await;
    let admin = app.admin("Root").await;

    place(&app, &alice, 1).await;
    place(&app, &bob, 2).await;

    let own = app.get("/api/orders", Some(&alice)).await;
    let own = own.body["orders"].as_array().unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0]["userId"], alice.id.to_string());

    let all = app.get("/api/admin/orders", Some(&admin)).await;
    assert_eq!(all.body["orders"].as_array().unwrap().len(), 2);

    let refused = app.get("/api/admin/orders", Some(&alice)).await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_checkout_validation() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;

    let empty = app
        .post(
            "/api/orders",
            Some(&alice),
            json!({ "items": [], "total": 0, "shippingAddress": "1 Loom Lane" }),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let zero_quantity = app
        .post(
            "/api/orders",
            Some(&alice),
            json!({
                "items": [{ "product": 1, "quantity": 0, "price": 5 }],
                "total": 0,
                "shippingAddress": "1 Loom Lane",
            }),
        )
        .await;
    assert_eq!(zero_quantity.status, StatusCode::BAD_REQUEST);

    assert_eq!(zero_quantity.code(), "invalid_request");
}

#[tokio::test]
async fn test_checkout_without_address_is_accepted() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;

    let placed = app
        .post(
            "/api/orders",
            Some(&alice),
            json!({ "items": [{ "product": 1, "quantity": 1, "price": 5 }], "total": 5 }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    assert_eq!(placed.body["order"]["shippingAddress"], "");
    assert_eq!(placed.body["order"]["status"], "pending");
}

#[tokio::test]
async fn test_strict_policy_walks_the_lifecycle() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;
    let admin = app.admin("Root").await;
    let order = place(&app, &alice, 1).await;
    let path = format!("/api/orders/{}/status", order["id"]);

    let skip = app.put(&path, Some(&admin), json!({ "status": "delivered" })).await;
    assert_eq!(skip.status, StatusCode::BAD_REQUEST);

    for status in ["processing", "shipped", "delivered"] {
        let step = app.put(&path, Some(&admin), json!({ "status": status })).await;
        assert_eq!(step.status, StatusCode::OK, "{status}");
        assert_eq!(step.body["order"]["status"], status);
    }

    let frozen = app.put(&path, Some(&admin), json!({ "status": "cancelled" })).await;
    assert_eq!(frozen.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_permissive_policy_allows_any_status() {
    let mut config = ApiConfig::for_tests();
    config.order_transitions = TransitionPolicy::Permissive;
    let app = TestApp::with_config(config);
    let alice = app.customer("Alice").await;
    let admin = app.admin("Root").await;
    let order = place(&app, &alice, 1).await;
    let path = format!("/api/orders/{}/status", order["id"]);

    let jump = app.put(&path, Some(&admin), json!({ "status": "delivered" })).await;
    assert_eq!(jump.status, StatusCode::OK);
    let back = app.put(&path, Some(&admin), json!({ "status": "pending" })).await;
    assert_eq!(back.status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_update_rejects_unknown_status_and_non_admins() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;
    let admin = app.admin("Root").await;
    let order = place(&app, &alice, 1).await;
    let path = format!("/api/orders/{}/status", order["id"]);

    let unknown = app.put(&path, Some(&admin), json!({ "status": "lost" })).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body["message"], "Invalid status");

    let own = app.put(&path, Some(&alice), json!({ "status": "cancelled" })).await;
    assert_eq!(own.status, StatusCode::FORBIDDEN);

    let missing = app
        .put("/api/orders/999/status", Some(&admin), json!({ "status": "processing" }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
