//! Blob storage client for uploaded images.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::ProviderConfig;

/// Errors that can occur when talking to the blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Bucket or path cannot form a valid object URL.
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Stores uploaded files and hands out URLs to them.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` and return the object's public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError>;

    /// A URL a client can upload to directly, valid for `ttl`.
    async fn sign_upload(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<String, BlobError>;
}

/// Validate a bucket/path pair and join it into an object key.
fn object_key(bucket: &str, path: &str) -> Result<String, BlobError> {
    let bucket = bucket.trim_matches('/');
    let path = path.trim_start_matches('/');
    if bucket.is_empty() || bucket.contains('/') {
        return Err(BlobError::InvalidPath(format!("bad bucket '{bucket}'")));
    }
    if path.is_empty() || path.split('/').any(|segment| segment == "..") {
        return Err(BlobError::InvalidPath(format!("bad path '{path}'")));
    }
    Ok(format!("{bucket}/{path}"))
}

// =============================================================================
// Supabase storage adapter
// =============================================================================

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(alias = "signedURL", alias = "signedUrl", alias = "url")]
    signed_url: String,
}

/// Blob store backed by the Supabase storage REST API.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: Url,
    service_role_key: SecretString,
}

impl SupabaseStorage {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ProviderConfig) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.url.clone(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, BlobError> {
        self.base_url
            .join(path)
            .map_err(|e| BlobError::InvalidPath(e.to_string()))
    }

    /// Public URL of an object in a public bucket.
    fn public_url(&self, key: &str) -> Result<String, BlobError> {
        Ok(self.url(&format!("storage/v1/object/public/{key}"))?.to_string())
    }
}

async fn api_error(response: reqwest::Response) -> BlobError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    BlobError::Api { status, message }
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        let key = object_key(bucket, path)?;
        let response = self
            .client
            .post(self.url(&format!("storage/v1/object/{key}"))?)
            .bearer_auth(self.service_role_key.expose_secret())
            .header("apikey", self.service_role_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        self.public_url(&key)
    }

    async fn sign_upload(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<String, BlobError> {
        let key = object_key(bucket, path)?;
        let response = self
            .client
            .post(self.url(&format!("storage/v1/object/sign/{key}"))?)
            .bearer_auth(self.service_role_key.expose_secret())
            .header("apikey", self.service_role_key.expose_secret())
            .json(&serde_json::json!({ "expires_in": ttl.as_secs() }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Parse(e.to_string()))?;

        // The provider returns a path relative to `/storage/v1`.
        if signed.signed_url.starts_with("http") {
            return Ok(signed.signed_url);
        }
        let relative = signed.signed_url.trim_start_matches('/');
        Ok(self.url(&format!("storage/v1/{relative}"))?.to_string())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryBlobStore, StoredBlob};

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use std::collections::HashMap;
    use std::time::Duration;

    use tokio::sync::Mutex;

    use super::{BlobError, BlobStore, async_trait, object_key};

    /// A stored object.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StoredBlob {
        pub bytes: Vec<u8>,
        pub content_type: String,
    }

    /// Blob store that keeps objects in memory and returns `memory://` URLs.
    #[derive(Debug, Default)]
    pub struct MemoryBlobStore {
        objects: Mutex<HashMap<String, StoredBlob>>,
    }

    impl MemoryBlobStore {
        /// The object stored under `bucket/path`, if any.
        pub async fn get(&self, bucket: &str, path: &str) -> Option<StoredBlob> {
            let key = object_key(bucket, path).ok()?;
            self.objects.lock().await.get(&key).cloned()
        }

        /// Number of stored objects.
        pub async fn object_count(&self) -> usize {
            self.objects.lock().await.len()
        }
    }

    #[async_trait]
    impl BlobStore for MemoryBlobStore {
        async fn upload(
            &self,
            bucket: &str,
            path: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> Result<String, BlobError> {
            let key = object_key(bucket, path)?;
            self.objects.lock().await.insert(
                key.clone(),
                StoredBlob {
                    bytes,
                    content_type: content_type.to_owned(),
                },
            );
            Ok(format!("memory://public/{key}"))
        }

        async fn sign_upload(
            &self,
            bucket: &str,
            path: &str,
            ttl: Duration,
        ) -> Result<String, BlobError> {
            let key = object_key(bucket, path)?;
            Ok(format!("memory://sign/{key}?expires_in={}", ttl.as_secs()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_rejects_traversal() {
        assert_eq!(object_key("public", "a/b.png").unwrap(), "public/a/b.png");
        assert_eq!(object_key("/public/", "/a.png").unwrap(), "public/a.png");
        assert!(object_key("public", "../secrets").is_err());
        assert!(object_key("", "a.png").is_err());
        assert!(object_key("a/b", "c.png").is_err());
        assert!(object_key("public", "").is_err());
    }

    #[test]
    fn test_signed_url_aliases() {
        let parsed: SignedUrlResponse =
            serde_json::from_str(r#"{"signedURL":"/object/sign/public/a.png?token=t"}"#).unwrap();
        assert!(parsed.signed_url.starts_with("/object/sign"));
    }

    #[tokio::test]
    async fn test_memory_store_keeps_bytes() {
        let store = MemoryBlobStore::default();
        let url = store
            .upload("product-images", "x.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "memory://public/product-images/x.png");
        let stored = store.get("product-images", "x.png").await.unwrap();
        assert_eq!(stored.bytes, vec![1, 2, 3]);
        assert_eq!(stored.content_type, "image/png");
    }
}
