//! Marker Error Types
//!
//! This module defines the error enums used across the feedback pipeline:
//!
//! - [`MarkerError`]: a single category's model output could not be turned into records.
//!   These are recoverable; the job logs them and moves on to the next category.
//! - [`ProviderError`]: the upstream model provider failed. These abort the job.
//! - [`FeedbackError`]: what a whole [`crate::FeedbackJob`] can fail with.
//!
//! # Example
//!
//! ```rust
//! use marker::error::MarkerError;
//!
//! fn parse_input(data: &str) -> Result<(), MarkerError> {
//!     if data.trim().is_empty() {
//!         return Err(MarkerError::EmptyOutput);
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Errors raised while repairing and parsing one category's model output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkerError {
    /// The model returned nothing usable.
    #[error("model output is empty")]
    EmptyOutput,
    /// No parse strategy in the fallback chain accepted the text.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// Parsed, but not an object of bullet lists.
    #[error("unexpected structure: {0}")]
    UnexpectedStructure(String),
    /// The lenient literal parser rejected the input.
    #[error("literal parse error at offset {offset}: {message}")]
    Literal { offset: usize, message: String },
}

/// Failures originating from the external model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no API key configured.
    #[error("{0} is not configured")]
    NotConfigured(String),
    /// The call exceeded its deadline.
    #[error("request to {0} timed out")]
    Timeout(String),
    /// The provider answered with a non-success status.
    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },
    /// Connection-level failure.
    #[error("could not reach {provider}: {message}")]
    Transport { provider: String, message: String },
    /// The response body did not have the expected shape.
    #[error("unexpected response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl ProviderError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Transport { .. } => true,
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::NotConfigured(_) | ProviderError::InvalidResponse { .. } => false,
        }
    }
}

/// Errors a feedback job can end with.
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The caller supplied something the job cannot work with.
    #[error("{0}")]
    InvalidInput(String),
}
