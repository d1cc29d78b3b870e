//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (database ping)
//!
//! # Auth
//! POST /api/auth/register           - Create identity + profile
//! POST /api/auth/profile            - Complete a missing profile
//! POST /api/auth/login              - Password sign-in
//! GET  /api/auth/me                 - Current identity and profile
//!
//! # Orders (any role; status update admin only)
//! GET  /api/orders                  - Scoped list
//! POST /api/orders                  - Place an order
//! GET  /api/orders/{id}             - Owner or admin
//! PUT  /api/orders/{id}/status      - Transition (admin)
//!
//! # Designs
//! GET  /api/designs                 - Scoped list
//! POST /api/designs                 - Submit (designer, admin)
//! PUT  /api/designs/{id}/approve    - Approve (admin)
//! PUT  /api/designs/{id}/reject     - Reject (admin)
//! DELETE /api/designs/{id}          - Owner or admin
//!
//! # Designer wallet (designer, admin)
//! GET  /api/designer/stats
//! GET  /api/designer/transactions
//! POST /api/designer/withdraw
//! GET  /api/designer/designs
//!
//! # Admin
//! GET  /api/admin/stats
//! GET  /api/admin/designers
//! GET  /api/admin/orders
//!
//! # Catalog and cart
//! GET  /api/products                - Public, active only
//! GET  /api/products/{id}           - Public
//! POST /api/products                - Designer, admin (JSON or multipart)
//! PUT  /api/products/{id}           - Owner or admin
//! DELETE /api/products/{id}         - Owner or admin (soft delete)
//! GET  /api/cart
//! POST /api/cart/add
//! POST /api/cart/remove
//!
//! # Collaborator proxies
//! POST /api/upload/sign-url         - Signed upload URL
//! POST /api/tryon                   - Virtual try-on
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod designer;
pub mod designs;
pub mod extract;
pub mod orders;
pub mod products;
pub mod tryon;
pub mod upload;
pub mod views;

use axum::Router;

use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(orders::router())
        .merge(designs::router())
        .merge(designer::router())
        .merge(admin::router())
        .merge(products::router())
        .merge(cart::router())
        .merge(upload::router())
        .merge(tryon::router())
}
