//! Domain types owned by the API crate.
//!
//! Lifecycle entities (designs, orders, ledger entries) live in
//! `atelier-core`; the thinner collaborators' records live here.

pub mod cart;
pub mod product;
pub mod profile;

pub use cart::{CartItem, CartLine};
pub use product::{NewProduct, Product, ProductError, ProductPatch};
pub use profile::{NewProfile, Profile};
