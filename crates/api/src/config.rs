//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ATELIER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `AUTH_PROVIDER_URL` - Base URL of the Supabase-compatible auth and storage provider
//! - `AUTH_ANON_KEY` - Public (anon) API key for the provider
//! - `AUTH_SERVICE_ROLE_KEY` - Service-role key (high privilege, validated for strength)
//!
//! ## Optional
//! - `ATELIER_HOST` - Bind address (default: 127.0.0.1)
//! - `ATELIER_PORT` - Listen port (default: 5000)
//! - `ATELIER_CORS_ORIGINS` - Comma-separated allowed origins, `*` for any (default: none)
//! - `ATELIER_ORDER_TRANSITIONS` - `strict` or `permissive` (default: strict)
//! - `ATELIER_HTTP_TIMEOUT_SECS` - Timeout for identity and storage calls (default: 30)
//! - `STORAGE_PRODUCT_BUCKET` - Bucket for product images (default: product-images)
//! - `STORAGE_SIGNED_URL_TTL_SECS` - Signed upload URL lifetime (default: 3600)
//! - `SYNTHESIS_API_URL` - Image-synthesis endpoint (default: <https://api.fashn.ai/v1/run>)
//! - `SYNTHESIS_API_KEY` - Image-synthesis key; the try-on proxy is disabled without it
//! - `SYNTHESIS_DEFAULT_MODEL` - Model used when the request names none (default: tryon-v1.6)
//! - `SYNTHESIS_TIMEOUT_SECS` - Try-on proxy timeout (default: 120)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance traces sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use atelier_core::order::TransitionPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_SYNTHESIS_URL: &str = "https://api.fashn.ai/v1/run";
const DEFAULT_SYNTHESIS_MODEL: &str = "tryon-v1.6";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Origins allowed by CORS; empty disables cross-origin access
    pub cors_origins: Vec<String>,
    /// Which order status changes an admin may make
    pub order_transitions: TransitionPolicy,
    /// Auth and storage provider
    pub provider: ProviderConfig,
    /// Blob storage settings
    pub storage: StorageConfig,
    /// Image-synthesis proxy settings
    pub synthesis: SynthesisConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Supabase-compatible identity and storage provider.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Base URL, e.g. `https://project.supabase.co`
    pub url: Url,
    /// Public key sent as `apikey` on user-scoped calls
    pub anon_key: SecretString,
    /// Service-role key for admin user creation and storage writes
    pub service_role_key: SecretString,
    /// Timeout for every provider call
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("service_role_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Blob storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket that receives product images
    pub product_bucket: String,
    /// Lifetime of signed upload URLs
    pub signed_url_ttl: Duration,
}

/// Image-synthesis proxy settings.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct SynthesisConfig {
    /// Endpoint that runs a model
    pub url: Url,
    /// API key; the proxy is disabled when absent
    pub api_key: Option<SecretString>,
    /// Model used when the request does not name one
    pub default_model: String,
    /// Upper bound on a single proxy call
    pub timeout: Duration,
}

impl std::fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ATELIER_DATABASE_URL")?;
        let host = parse_env("ATELIER_HOST", "127.0.0.1")?;
        let port = parse_env("ATELIER_PORT", "5000")?;
        let cors_origins = parse_origins(&get_env_or_default("ATELIER_CORS_ORIGINS", ""));
        let order_transitions = get_env_or_default("ATELIER_ORDER_TRANSITIONS", "strict")
            .parse::<TransitionPolicy>()
            .map_err(|e| ConfigError::InvalidEnvVar("ATELIER_ORDER_TRANSITIONS".to_string(), e))?;
        let http_timeout = Duration::from_secs(parse_env("ATELIER_HTTP_TIMEOUT_SECS", "30")?);

        let provider = ProviderConfig::from_env(http_timeout)?;
        let storage = StorageConfig::from_env()?;
        let synthesis = SynthesisConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            cors_origins,
            order_transitions,
            provider,
            storage,
            synthesis,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configuration for tests: local addresses, placeholder keys, no
    /// synthesis key. Never loaded from the environment.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn for_tests() -> Self {
        let local = |path: &str| {
            Url::parse("http://127.0.0.1:9")
                .and_then(|base| base.join(path))
                .unwrap_or_else(|_| unreachable!("static test URL"))
        };

        Self {
            database_url: SecretString::from("postgres://localhost/atelier_test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
            cors_origins: Vec::new(),
            order_transitions: TransitionPolicy::Strict,
            provider: ProviderConfig {
                url: local("/"),
                anon_key: SecretString::from("anon"),
                service_role_key: SecretString::from("service"),
                timeout: Duration::from_secs(1),
            },
            storage: StorageConfig {
                product_bucket: "product-images".to_string(),
                signed_url_ttl: Duration::from_secs(3600),
            },
            synthesis: SynthesisConfig {
                url: local("/v1/run"),
                api_key: None,
                default_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
                timeout: Duration::from_secs(1),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }
}

impl ProviderConfig {
    fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            url: parse_url("AUTH_PROVIDER_URL", &get_required_env("AUTH_PROVIDER_URL")?)?,
            anon_key: get_required_secret("AUTH_ANON_KEY")?,
            service_role_key: get_validated_secret("AUTH_SERVICE_ROLE_KEY")?,
            timeout,
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            product_bucket: get_env_or_default("STORAGE_PRODUCT_BUCKET", "product-images"),
            signed_url_ttl: Duration::from_secs(parse_env("STORAGE_SIGNED_URL_TTL_SECS", "3600")?),
        })
    }
}

impl SynthesisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = get_env_or_default("SYNTHESIS_API_URL", DEFAULT_SYNTHESIS_URL);
        Ok(Self {
            url: parse_url("SYNTHESIS_API_URL", &url)?,
            api_key: get_optional_env("SYNTHESIS_API_KEY").map(SecretString::from),
            default_model: get_env_or_default("SYNTHESIS_DEFAULT_MODEL", DEFAULT_SYNTHESIS_MODEL),
            timeout: Duration::from_secs(parse_env("SYNTHESIS_TIMEOUT_SECS", "120")?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
