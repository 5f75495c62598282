//! # AI Provider Adapters
//!
//! Concrete [`ChatProvider`] implementations for the hosted model APIs the feedback
//! service can use, and a [`ProviderRegistry`] that builds them from configuration.
//!
//! - [`openai`]: chat completions.
//! - [`anthropic`]: messages.
//! - [`gemini`]: generateContent.

pub mod anthropic;
pub mod client;
pub mod gemini;
pub mod openai;

use crate::anthropic::AnthropicProvider;
use crate::client::{ProviderSettings, http_client};
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;
use marker::error::ProviderError;
use marker::traits::provider::ChatProvider;
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use util::config::AppConfig;

/// Model backends selectable through the `model` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// `openai`, the default.
    OpenAi,
    /// `anthropic`.
    Anthropic,
    /// `gemini`.
    Gemini,
}

impl ProviderKind {
    /// Every kind, in the order they are reported and built.
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
    ];

    /// Lower-case name as accepted in the `model` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => openai::NAME,
            ProviderKind::Anthropic => anthropic::NAME,
            ProviderKind::Gemini => gemini::NAME,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!(
                "unknown model provider '{other}', expected one of: openai, anthropic, gemini"
            )),
        }
    }
}

/// Settings for `kind` from the global configuration.
///
/// # Arguments
///
/// * `kind` - The provider whose key, model and base URL are read.
///
/// # Returns
///
/// * `Some(ProviderSettings)` - If the provider's API key is set.
/// * `None` - If the key is empty, which disables the provider.
pub fn settings_from_config(kind: ProviderKind) -> Option<ProviderSettings> {
    let config = AppConfig::global();
    let (key, model, base_url) = match kind {
        ProviderKind::OpenAi => (
            &config.openai_api_key,
            &config.openai_model,
            &config.openai_base_url,
        ),
        ProviderKind::Anthropic => (
            &config.anthropic_api_key,
            &config.anthropic_model,
            &config.anthropic_base_url,
        ),
        ProviderKind::Gemini => (
            &config.gemini_api_key,
            &config.gemini_model,
            &config.gemini_base_url,
        ),
    };
    if key.trim().is_empty() {
        return None;
    }
    Some(ProviderSettings::new(key.as_str(), model.as_str(), base_url.as_str()))
}

/// Constructs the adapter for `kind`.
///
/// # Arguments
///
/// * `kind` - Which API the adapter speaks.
/// * `client` - Shared HTTP client; its timeout bounds every call.
/// * `settings` - Key, model and base URL for the adapter.
///
/// # Returns
///
/// * `Arc<dyn ChatProvider>` - The adapter, ready to share across requests.
pub fn build_provider(
    kind: ProviderKind,
    client: Client,
    settings: ProviderSettings,
) -> Arc<dyn ChatProvider> {
    match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(client, settings)),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(client, settings)),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(client, settings)),
    }
}

/// Immutable set of ready providers, shared across requests.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every provider that has an API key configured, sharing one HTTP client.
    ///
    /// # Returns
    ///
    /// * `Ok(ProviderRegistry)` - Possibly empty; providers without keys are skipped with a warning.
    /// * `Err(ProviderError::Transport)` - If the HTTP client cannot be built.
    pub fn from_config() -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(util::config::provider_timeout_secs().max(1));
        let client = http_client(timeout)?;
        let mut registry = Self::new();
        for kind in ProviderKind::ALL {
            match settings_from_config(kind) {
                Some(settings) => {
                    info!(provider = %kind, model = %settings.model, "provider configured");
                    registry = registry.with_provider(kind, build_provider(kind, client.clone(), settings));
                }
                None => warn!(provider = %kind, "no API key, provider disabled"),
            }
        }
        Ok(registry)
    }

    /// Registers (or replaces) the provider used for `kind`.
    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn ChatProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    /// Looks up the provider for `kind`.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<dyn ChatProvider>)` - The registered provider.
    /// * `Err(ProviderError::NotConfigured)` - If `kind` has no provider.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ProviderError::NotConfigured(kind.to_string()))
    }

    /// Kinds with a registered provider, in [`ProviderKind::ALL`] order.
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.providers.contains_key(k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn provider_names_parse_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!(" anthropic ".parse::<ProviderKind>(), Ok(ProviderKind::Anthropic));
        assert_eq!("gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        let err = "llama".parse::<ProviderKind>().unwrap_err();
        assert!(err.contains("llama"));
    }

    #[test]
    #[serial]
    fn registry_only_contains_providers_with_keys() {
        AppConfig::set_openai_api_key("sk-test");
        AppConfig::set_anthropic_api_key("");
        AppConfig::set_gemini_api_key("g-test");

        let registry = ProviderRegistry::from_config().unwrap();
        assert_eq!(
            registry.configured(),
            vec![ProviderKind::OpenAi, ProviderKind::Gemini]
        );
        assert_eq!(registry.get(ProviderKind::Gemini).unwrap().name(), "gemini");
        assert!(matches!(
            registry.get(ProviderKind::Anthropic),
            Err(ProviderError::NotConfigured(name)) if name == "anthropic"
        ));

        AppConfig::reset();
    }
}
