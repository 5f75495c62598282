//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub host: String,
    pub port: u16,
    pub upload_root: String,
    pub max_upload_bytes: usize,
    pub default_provider: String,
    pub default_max_completion_tokens: u32,
    pub default_temperature: f32,
    pub provider_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Feedback requests allowed per client IP per minute; `0` disables the limit.
    pub rate_limit_per_minute: u32,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

/// Reads `key` and parses it, falling back to `default` when unset or malformed.
fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring malformed environment value");
                default
            }
        },
        Err(_) => default,
    }
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every value has a default so the server can start without a `.env` file;
    /// missing API keys only surface when the matching provider is used.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "feedback-api".into()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "api=info,marker=info,ai=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: parsed_var("PORT", 5000),
            upload_root: env::var("UPLOAD_ROOT").unwrap_or_else(|_| "uploaded_files".into()),
            max_upload_bytes: parsed_var("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            default_provider: env::var("DEFAULT_PROVIDER").unwrap_or_else(|_| "openai".into()),
            default_max_completion_tokens: parsed_var("DEFAULT_MAX_COMPLETION_TOKENS", 1000),
            default_temperature: parsed_var("DEFAULT_TEMPERATURE", 1.0),
            provider_timeout_secs: parsed_var("PROVIDER_TIMEOUT_SECS", 90),
            request_timeout_secs: parsed_var("REQUEST_TIMEOUT_SECS", 300),
            rate_limit_per_minute: parsed_var("RATE_LIMIT_PER_MINUTE", 10),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-20240620".into()),
            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1".into()),
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into()),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock
                .write()
                .expect("Failed to acquire AppConfig write lock");
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    ///
    /// Used by public per-field setter methods.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    /// Override `env` value.
    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        AppConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }

    pub fn set_upload_root(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.upload_root = value.into());
    }

    pub fn set_max_upload_bytes(value: usize) {
        AppConfig::set_field(|cfg| cfg.max_upload_bytes = value);
    }

    pub fn set_default_provider(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.default_provider = value.into());
    }

    pub fn set_default_max_completion_tokens(value: u32) {
        AppConfig::set_field(|cfg| cfg.default_max_completion_tokens = value);
    }

    pub fn set_default_temperature(value: f32) {
        AppConfig::set_field(|cfg| cfg.default_temperature = value);
    }

    pub fn set_provider_timeout_secs(value: u64) {
        AppConfig::set_field(|cfg| cfg.provider_timeout_secs = value);
    }

    pub fn set_request_timeout_secs(value: u64) {
        AppConfig::set_field(|cfg| cfg.request_timeout_secs = value);
    }

    pub fn set_rate_limit_per_minute(value: u32) {
        AppConfig::set_field(|cfg| cfg.rate_limit_per_minute = value);
    }

    pub fn set_openai_api_key(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.openai_api_key = value.into());
    }

    pub fn set_anthropic_api_key(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.anthropic_api_key = value.into());
    }

    pub fn set_gemini_api_key(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.gemini_api_key = value.into());
    }
}

// --- Free accessors, so call sites read `config::port()` ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn upload_root() -> String {
    AppConfig::global().upload_root.clone()
}

pub fn max_upload_bytes() -> usize {
    AppConfig::global().max_upload_bytes
}

pub fn default_provider() -> String {
    AppConfig::global().default_provider.clone()
}

pub fn default_max_completion_tokens() -> u32 {
    AppConfig::global().default_max_completion_tokens
}

pub fn default_temperature() -> f32 {
    AppConfig::global().default_temperature
}

pub fn provider_timeout_secs() -> u64 {
    AppConfig::global().provider_timeout_secs
}

pub fn request_timeout_secs() -> u64 {
    AppConfig::global().request_timeout_secs
}

pub fn rate_limit_per_minute() -> u32 {
    AppConfig::global().rate_limit_per_minute
}
