use crate::rate_limit::RateLimiter;
use ai::ProviderRegistry;
use marker::error::ProviderError;
use util::config;

/// State handed to every handler. Clones share the same rate-limit table.
#[derive(Clone)]
pub struct AppState {
    providers: ProviderRegistry,
    rate_limiter: RateLimiter,
}

impl AppState {
    /// Wraps `providers` with a rate limiter sized from `RATE_LIMIT_PER_MINUTE`.
    pub fn new(providers: ProviderRegistry) -> Self {
        Self {
            providers,
            rate_limiter: RateLimiter::new(config::rate_limit_per_minute()),
        }
    }

    /// Builds the provider registry from the environment.
    pub fn from_config() -> Result<Self, ProviderError> {
        Ok(Self::new(ProviderRegistry::from_config()?))
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
