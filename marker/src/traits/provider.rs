//!
//! # Chat Provider Trait
//!
//! [`ChatProvider`] is the seam between the feedback pipeline and a concrete LLM API.
//! Adapters (OpenAI, Anthropic, Gemini, or a scripted test double) receive the full
//! conversation so far and return the model's reply as free-form text. Everything
//! after that, repair, parsing and span location, is provider-agnostic.
//!

use crate::error::ProviderError;
use crate::types::{Conversation, GenerationParams};
use async_trait::async_trait;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short identifier used in logs and error messages (`"openai"`, ...).
    fn name(&self) -> &str;

    /// Sends the conversation and returns the assistant's reply text.
    async fn complete(
        &self,
        conversation: &Conversation,
        params: &GenerationParams,
    ) -> Result<String, ProviderError>;
}
