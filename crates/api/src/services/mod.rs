//! Collaborator clients and lifecycle services.
//!
//! # Collaborators
//!
//! - `identity` - Bearer verification, user creation, password sign-in
//! - `blob` - Image uploads and signed upload URLs
//! - `synthesis` - Virtual try-on proxy
//!
//! # Lifecycles
//!
//! - `designs` - Submission, review, deletion, scoped listing
//! - `orders` - Placement, status transitions, scoped reads
//! - `wallet` - Designer balances, withdrawals, earnings stats
//! - `registration` - Two-step identity + profile saga
//! - `reports` - Admin totals and designer roster

pub mod blob;
pub mod designs;
pub mod identity;
pub mod orders;
pub mod registration;
pub mod reports;
pub mod synthesis;
pub mod wallet;

pub use blob::{BlobError, BlobStore, SupabaseStorage};
pub use designs::DesignService;
pub use identity::{
    AuthIdentity, IdentityError, IdentityProvider, SupabaseIdentity, TokenGrant, UserMetadata,
};
pub use orders::OrderService;
pub use registration::{Registration, RegistrationService};
pub use reports::{AdminStats, DesignerSummary, ReportService};
pub use synthesis::{SynthesisClient, SynthesisError};
pub use wallet::{DesignerStats, WalletService};
