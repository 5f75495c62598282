//! Shared HTTP plumbing for the provider adapters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use marker::error::ProviderError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

/// Longest upstream error body kept in a [`ProviderError::Http`].
const MAX_ERROR_BODY: usize = 300;

/// Connection settings for one provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Secret sent with every request; never logged.
    pub api_key: String,
    /// Model identifier passed to the API.
    pub model: String,
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
}

impl ProviderSettings {
    /// # Arguments
    ///
    /// * `api_key` - The provider API key.
    /// * `model` - The model identifier.
    /// * `base_url` - The API root; a trailing slash is tolerated.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    /// `base_url` joined with `path`, tolerating a trailing slash on the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// Builds the client shared by every adapter.
///
/// # Arguments
///
/// * `timeout` - Upper bound on each request, connection included.
///
/// # Returns
///
/// * `Ok(Client)` - The configured client.
/// * `Err(ProviderError::Transport)` - If the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Transport {
            provider: "http".into(),
            message: e.to_string(),
        })
}

pub(crate) fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

fn classify(provider: &str, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(provider.to_string())
    } else if err.is_decode() {
        ProviderError::InvalidResponse {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    } else {
        ProviderError::Transport {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

/// Sends `request` and decodes a successful JSON body into `T`.
///
/// # Returns
///
/// * `Ok(T)` - The decoded body of a 2xx response.
/// * `Err(ProviderError::Http)` - For any other status, with a truncated body.
/// * `Err(ProviderError::Timeout | Transport | InvalidResponse)` - From the transport or decoder.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(|e| classify(provider, e))?;
    let status = response.status();
    debug!(provider, status = status.as_u16(), "provider responded");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(provider, status = status.as_u16(), "provider request failed");
        return Err(ProviderError::Http {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        });
    }

    response.json::<T>().await.map_err(|e| classify(provider, e))
}

/// Error for a well-formed response that carried no text.
pub(crate) fn empty_reply(provider: &str) -> ProviderError {
    ProviderError::InvalidResponse {
        provider: provider.to_string(),
        message: "response contained no text".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        let settings = ProviderSettings::new("k", "m", "http://localhost:1234/v1/");
        assert_eq!(settings.endpoint("/messages"), "http://localhost:1234/v1/messages");
        assert_eq!(settings.endpoint("chat/completions"), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(400);
        let cut = truncate(&body, MAX_ERROR_BODY);
        assert_eq!(cut.chars().count(), MAX_ERROR_BODY + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("short", MAX_ERROR_BODY), "short");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = http_client(Duration::from_secs(2)).unwrap();
        let err = send_json::<serde_json::Value>("test", client.post("http://127.0.0.1:9/none"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport { .. } | ProviderError::Timeout(_)));
        assert!(err.is_retryable());
    }
}
