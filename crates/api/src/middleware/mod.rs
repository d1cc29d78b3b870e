//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (record, tag, echo `x-request-id`)
//! 4. CORS (configured origins)
//!
//! Authentication is not a layer: handlers opt in through the
//! [`Identified`], [`Authenticated`] and [`Authorized`] extractors.

pub mod auth;
pub mod cors;
pub mod request_id;

pub use auth::{
    AdminOnly, AnyRole, Authenticated, Authorized, Capability, DesignerOrAdmin, Identified,
};
pub use cors::cors_layer;
pub use request_id::request_id_middleware;
