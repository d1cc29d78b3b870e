//! Catalog, cart, signed uploads and try-on.

use atelier_api::config::ApiConfig;
use atelier_integration_tests::{Actor, TestApp, decimal};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::{Value, json};

async fn product(app: &TestApp, owner: &Actor, title: &str, category: &str) -> Value {
    let reply = app
        .post(
            "/api/products",
            Some(owner),
            json!({ "title": title, "price": "25.00", "category": category }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.body
}

#[tokio::test]
async fn test_public_listing_filters_by_category_and_hides_inactive() {
    let app = TestApp::new();
    let designer = app.designer("Ada").await;
    product(&app, &designer, "Tee", "tops").await;
    let coat = product(&app, &designer, "Coat", "outerwear").await;

    let all = app.get("/api/products", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let tops = app.get("/api/products?category=tops", None).await;
    let tops = tops.body.as_array().unwrap();
    assert_eq!(tops.len(), 1);
    assert_eq!(tops[0]["title"], "Tee");

    let path = format!("/api/products/{}", coat["id"]);
    let removed = app.delete(&path, Some(&designer)).await;
    assert_eq!(removed.status, StatusCode::OK);

    let after = app.get("/api/products", None).await;
    assert_eq!(after.body.as_array().unwrap().len(), 1);

    let still_readable = app.get(&path, None).await;
    assert_eq!(still_readable.status, StatusCode::OK);
    assert_eq!(still_readable.body["isActive"], false);
}

#[tokio::test]
async fn test_create_defaults_category_and_requires_fields() {
    let app = TestApp::new();
    let designer = app.designer("Ada").await;

    let created = app
        .post("/api/products", Some(&designer), json!({ "title": "Cap", "price": 12 }))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["category"], "tops");
    assert_eq!(created.body["owner"], designer.id.to_string());

    let untitled = app
        .post("/api/products", Some(&designer), json!({ "price": 12 }))
        .await;
    assert_eq!(untitled.status, StatusCode::BAD_REQUEST);

    let unpriced = app
        .post("/api/products", Some(&designer), json!({ "title": "Cap" }))
        .await;
    assert_eq!(unpriced.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_customers_cannot_sell() {
    let app = TestApp::new();
    let customer = app.customer("Carol").await;

    let reply = app
        .post("/api/products", Some(&customer), json!({ "title": "Cap", "price": 12 }))
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_only_owner_or_admin_edits() {
    let app = TestApp::new();
    let ada = app.designer("Ada").await;
    let grace = app.designer("Grace").await;
    let admin = app.admin("Root").await;
    let tee = product(&app, &ada, "Tee", "tops").await;
    let path = format!("/api/products/{}", tee["id"]);

    let refused = app.put(&path, Some(&grace), json!({ "price": 1 })).await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    let edited = app.put(&path, Some(&ada), json!({ "price": "30.00" })).await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(decimal(&edited.body["price"]), Decimal::new(3_000, 2));
    assert_eq!(edited.body["title"], "Tee");

    let by_admin = app.put(&path, Some(&admin), json!({ "title": "Tee v2" })).await;
    assert_eq!(by_admin.body["title"], "Tee v2");

    let blank = app.put(&path, Some(&ada), json!({ "title": "  " })).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_multipart_create_uploads_image() {
    let app = TestApp::new();
    let designer = app.designer("Ada").await;

    let boundary = "atelier-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n\
         Printed Tee\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"price\"\r\n\r\n\
         19.99\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"tee.JPG\"\r\n\
         Content-Type: image/jpeg\r\n\r\n\
         not-really-a-jpeg\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/products")
        .header(header::AUTHORIZATION, format!("Bearer {}", designer.token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["title"], "Printed Tee");
    assert_eq!(decimal(&reply.body["price"]), Decimal::new(1_999, 2));

    let path = reply.body["storagePath"].as_str().unwrap();
    assert!(path.ends_with(".jpg"));
    assert!(reply.body["imageUrl"].as_str().unwrap().ends_with(path));

    let stored = app.blobs.get("product-images", path).await.unwrap();
    assert_eq!(stored.bytes, b"not-really-a-jpeg");
    assert_eq!(stored.content_type, "image/jpeg");
}

#[tokio::test]
async fn test_cart_add_list_remove() {
    let app = TestApp::new();
    let designer = app.designer("Ada").await;
    let alice = app.customer("Alice").await;
    let bob = app.customer("Bob").await;
    let tee = product(&app, &designer, "Tee", "tops").await;

    let added = app
        .post("/api/cart/add", Some(&alice), json!({ "product_id": tee["id"] }))
        .await;
    assert_eq!(added.status, StatusCode::CREATED);
    assert_eq!(added.body["item"]["quantity"], 1);

    let again = app
        .post(
            "/api/cart/add",
            Some(&alice),
            json!({ "productId": tee["id"], "quantity": 2 }),
        )
        .await;
    assert_eq!(again.body["item"]["quantity"], 3);
    assert_eq!(again.body["item"]["id"], added.body["item"]["id"]);

    let cart = app.get("/api/cart", Some(&alice)).await;
    let items = cart.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product"]["title"], "Tee");

    let item_id = added.body["item"]["id"].clone();
    let stolen = app
        .post("/api/cart/remove", Some(&bob), json!({ "item_id": item_id }))
        .await;
    assert_eq!(stolen.status, StatusCode::NOT_FOUND);

    let removed = app
        .post("/api/cart/remove", Some(&alice), json!({ "item_id": item_id }))
        .await;
    assert_eq!(removed.status, StatusCode::OK);

    let cart = app.get("/api/cart", Some(&alice)).await;
    assert!(cart.body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_rejects_missing_and_inactive_products() {
    let app = TestApp::new();
    let designer = app.designer("Ada").await;
    let alice = app.customer("Alice").await;
    let tee = product(&app, &designer, "Tee", "tops").await;
    app.delete(&format!("/api/products/{}", tee["id"]), Some(&designer))
        .await;

    let inactive = app
        .post("/api/cart/add", Some(&alice), json!({ "product_id": tee["id"] }))
        .await;
    assert_eq!(inactive.status, StatusCode::NOT_FOUND);

    let missing = app
        .post("/api/cart/add", Some(&alice), json!({ "product_id": 999 }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let no_id = app.post("/api/cart/add", Some(&alice), json!({})).await;
    assert_eq!(no_id.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_url() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;

    let signed = app
        .post(
            "/api/upload/sign-url",
            Some(&alice),
            json!({ "path": "avatars/alice.png" }),
        )
        .await;
    assert_eq!(signed.status, StatusCode::OK);
    assert_eq!(signed.body["bucket"], "public");
    assert_eq!(signed.body["expiresIn"], 3600);
    assert!(
        signed.body["signedUrl"]
            .as_str()
            .unwrap()
            .contains("public/avatars/alice.png")
    );

    let missing = app.post("/api/upload/sign-url", Some(&alice), json!({})).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let traversal = app
        .post("/api/upload/sign-url", Some(&alice), json!({ "path": "../x" }))
        .await;
    assert_eq!(traversal.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tryon_without_key_is_a_server_error() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;

    let reply = app.post("/api/tryon", Some(&alice), json!({ "inputs": {} })).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.code(), "internal_error");
    assert_eq!(reply.body["message"], "Internal server error");
}

#[tokio::test]
async fn test_tryon_unreachable_upstream_is_bad_gateway() {
    let mut config = ApiConfig::for_tests();
    config.synthesis.api_key = Some("test-key".to_string().into());
    let app = TestApp::with_config(config);
    let alice = app.customer("Alice").await;

    let reply = app.post("/api/tryon", Some(&alice), json!({ "inputs": {} })).await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert_eq!(reply.code(), "upstream_error");
}
