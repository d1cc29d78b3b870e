//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use atelier_core::order::TransitionPolicy;

use crate::config::ApiConfig;
use crate::db::Stores;
use crate::services::{
    BlobError, BlobStore, IdentityError, IdentityProvider, SupabaseIdentity, SupabaseStorage,
    SynthesisClient, SynthesisError,
};

/// Error building the collaborator clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
    #[error("storage client: {0}")]
    Blob(#[from] BlobError),
    #[error("synthesis client: {0}")]
    Synthesis(#[from] SynthesisError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// stores, collaborator clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    stores: Stores,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStore>,
    synthesis: Option<SynthesisClient>,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the synthesis client cannot be built.
    pub fn new(
        config: ApiConfig,
        stores: Stores,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self, StateError> {
        let synthesis = SynthesisClient::from_config(&config.synthesis)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                identity,
                blobs,
                synthesis,
            }),
        })
    }

    /// Production state: `PostgreSQL` stores and the Supabase adapters.
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator client cannot be built.
    pub fn connect(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let identity = Arc::new(SupabaseIdentity::new(&config.provider)?);
        let blobs = Arc::new(SupabaseStorage::new(&config.provider)?);
        Self::new(config, Stores::postgres(pool), identity, blobs)
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the stores.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Get the identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get the blob store.
    #[must_use]
    pub fn blobs(&self) -> &dyn BlobStore {
        self.inner.blobs.as_ref()
    }

    /// Get the synthesis client, if configured.
    #[must_use]
    pub fn synthesis(&self) -> Option<&SynthesisClient> {
        self.inner.synthesis.as_ref()
    }

    /// Which order transitions admins may make.
    #[must_use]
    pub fn transitions(&self) -> TransitionPolicy {
        self.inner.config.order_transitions
    }
}
