//! End-to-end tests for the Atelier API.
//!
//! Every test drives the full router (extractors, middleware, error
//! rendering) with `tower::ServiceExt::oneshot`. Persistence runs on the
//! in-memory stores, identity on the fixed-token provider and uploads on the
//! in-memory blob store, so no database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use atelier_api::config::ApiConfig;
use atelier_api::db::memory::MemoryStore;
use atelier_api::db::{LedgerStore, ProfileStore, Stores};
use atelier_api::models::NewProfile;
use atelier_api::services::blob::MemoryBlobStore;
use atelier_api::services::identity::StaticIdentityProvider;
use atelier_api::state::AppState;
use atelier_core::ledger::NewLedgerEntry;
use atelier_core::{Email, Money, ProfileId, Role};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

/// A seeded user and the bearer token that authenticates them.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ProfileId,
    pub token: String,
}

/// A response reduced to what the assertions need.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    /// The `code` field of an error body.
    #[must_use]
    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

/// The application wired to in-memory collaborators.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub identity: Arc<StaticIdentityProvider>,
    pub blobs: Arc<MemoryBlobStore>,
    router: Router,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ApiConfig::for_tests())
    }

    #[must_use]
    pub fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        Self::build(config, Stores::from_memory(&store), store)
    }

    /// Use `stores` as given; `store` stays available for seeding.
    #[must_use]
    pub fn build(config: ApiConfig, stores: Stores, store: Arc<MemoryStore>) -> Self {
        let identity = Arc::new(StaticIdentityProvider::new());
        let blobs = Arc::new(MemoryBlobStore::default());
        let state = AppState::new(config, stores, identity.clone(), blobs.clone()).unwrap();

        Self {
            store,
            identity,
            blobs,
            router: atelier_api::app(state),
        }
    }

    /// Seed a profile with `role` and issue a token for it.
    pub async fn actor(&self, role: Role, name: &str) -> Actor {
        let email = format!("{}@example.com", name.to_lowercase());
        let token = format!("token-{}", name.to_lowercase());
        let id = self.identity.issue(&token, &email);
        let profile = NewProfile {
            id,
            name: name.to_owned(),
            email: Email::parse(&email).unwrap(),
            role,
        };
        ProfileStore::insert(self.store.as_ref(), profile).await.unwrap();
        Actor { id, token }
    }

    pub async fn customer(&self, name: &str) -> Actor {
        self.actor(Role::Customer, name).await
    }

    pub async fn designer(&self, name: &str) -> Actor {
        self.actor(Role::Designer, name).await
    }

    pub async fn admin(&self, name: &str) -> Actor {
        self.actor(Role::Admin, name).await
    }

    /// Credit a completed earning straight into the ledger.
    pub async fn credit(&self, designer: &Actor, cents: i64) {
        let entry =
            NewLedgerEntry::earning(designer.id, Money::from_cents(cents).unwrap(), None).unwrap();
        LedgerStore::record(self.store.as_ref(), entry).await.unwrap();
    }

    /// A handle on the router for tests that need the raw response.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a raw request.
    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Reply { status, body }
    }

    /// Send a JSON request, authenticated when `actor` is given.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        actor: Option<&Actor>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(actor) = actor {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", actor.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.unwrap()).await
    }

    pub async fn get(&self, path: &str, actor: Option<&Actor>) -> Reply {
        self.call(Method::GET, path, actor, None).await
    }

    pub async fn post(&self, path: &str, actor: Option<&Actor>, body: Value) -> Reply {
        self.call(Method::POST, path, actor, Some(body)).await
    }

    pub async fn put(&self, path: &str, actor: Option<&Actor>, body: Value) -> Reply {
        self.call(Method::PUT, path, actor, Some(body)).await
    }

    pub async fn delete(&self, path: &str, actor: Option<&Actor>) -> Reply {
        self.call(Method::DELETE, path, actor, None).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a money or balance field, serialized as a decimal string.
#[must_use]
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("expected a decimal, got {other}"),
    }
}
