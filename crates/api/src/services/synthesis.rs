//! Image-synthesis (virtual try-on) proxy client.
//!
//! Requests are forwarded verbatim and the upstream JSON is returned as-is.
//! Nothing is stored locally, so a timed-out call leaves no state behind.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use crate::config::SynthesisConfig;

/// Errors that can occur when calling the synthesis API.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// HTTP request failed or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the client or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client for the configured synthesis endpoint.
#[derive(Clone)]
pub struct SynthesisClient {
    client: reqwest::Client,
    endpoint: Url,
    default_model: String,
}

impl SynthesisClient {
    /// Create a client, or `None` when no API key is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn from_config(config: &SynthesisConfig) -> Result<Option<Self>, SynthesisError> {
        let Some(api_key) = &config.api_key else {
            return Ok(None);
        };

        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| SynthesisError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Some(Self {
            client,
            endpoint: config.url.clone(),
            default_model: config.default_model.clone(),
        }))
    }

    /// Run `model` (or the default model) on `inputs`.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, timeout or a non-2xx response.
    pub async fn run(
        &self,
        model: Option<&str>,
        inputs: serde_json::Value,
    ) -> Result<serde_json::Value, SynthesisError> {
        let body = request_body(model.unwrap_or(&self.default_model), inputs);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SynthesisError::Parse(e.to_string()))
    }
}

fn request_body(model: &str, inputs: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "model_name": model,
        "inputs": inputs,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn config(api_key: Option<&str>) -> SynthesisConfig {
        SynthesisConfig {
            url: Url::parse("http://127.0.0.1:9/v1/run").unwrap(),
            api_key: api_key.map(SecretString::from),
            default_model: "tryon-v1.6".to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_disabled_without_key() {
        assert!(SynthesisClient::from_config(&config(None)).unwrap().is_none());
        assert!(SynthesisClient::from_config(&config(Some("k3y"))).unwrap().is_some());
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body("tryon-v1.6", serde_json::json!({ "garment_image": "g" }));
        assert_eq!(body["model_name"], "tryon-v1.6");
        assert_eq!(body["inputs"]["garment_image"], "g");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_http_error() {
        let client = SynthesisClient::from_config(&config(Some("k3y")))
            .unwrap()
            .unwrap();
        let err = client.run(None, serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, SynthesisError::Http(_)));
    }
}
