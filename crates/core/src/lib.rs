//! Atelier Core - marketplace domain rules.
//!
//! This crate holds the parts of the marketplace that must behave the same no
//! matter where they are called from:
//! - `api` - HTTP service for customers, designers and admins
//! - `cli` - Command-line tools for migrations, ledger maintenance and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Persistence and transport live in `atelier-api`.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, roles, statuses, money and email
//! - [`access`] - Role capability sets and ownership checks
//! - [`design`] - Design review lifecycle
//! - [`order`] - Order lifecycle and transition policy
//! - [`ledger`] - Wallet ledger balances, withdrawal rules and commission

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod design;
pub mod ledger;
pub mod order;
pub mod types;

pub use access::{AccessError, Capabilities, Subject};
pub use types::*;
