//! Authentication failures and the JSON error contract.

use atelier_core::ProfileId;
use atelier_integration_tests::{Actor, TestApp};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use uuid::Uuid;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_or_unknown_token_is_unauthenticated() {
    let app = TestApp::new();

    let anonymous = app.get("/api/orders", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.code(), "unauthenticated");

    let stranger = Actor {
        id: ProfileId::new(Uuid::new_v4()),
        token: "forged".to_owned(),
    };
    let forged = app.get("/api/orders", Some(&stranger)).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let basic = Request::builder()
        .uri("/api/orders")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwdw==")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(basic).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_without_profile_is_not_found() {
    let app = TestApp::new();
    let id = app.identity.issue("orphan-token", "orphan@example.com");
    let orphan = Actor {
        id,
        token: "orphan-token".to_owned(),
    };

    let reply = app.get("/api/designs", Some(&orphan)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.code(), "not_found");
    assert_eq!(reply.body["message"], "User not found");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new();

    let reply = app.get("/api/nowhere", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.code(), "not_found");
}

#[tokio::test]
async fn test_malformed_input_is_invalid_request() {
    let app = TestApp::new();
    let alice = app.customer("Alice").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/orders")
        .header(header::AUTHORIZATION, format!("Bearer {}", alice.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.code(), "invalid_request");

    let bad_id = app.get("/api/orders/not-a-number", Some(&alice)).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.code(), "invalid_request");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router(), request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}
