//! # Gemini Adapter
//!
//! Calls `POST {base_url}/models/{model}:generateContent` with the API key as a query
//! parameter. System messages become `system_instruction`; assistant turns use the
//! `model` role. Attachments of any type are sent as `inline_data`.

use crate::client::{ProviderSettings, empty_reply, encode_base64, send_json};
use async_trait::async_trait;
use marker::error::ProviderError;
use marker::traits::provider::ChatProvider;
use marker::types::{Conversation, GenerationParams, MessagePart, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Name reported in logs and errors, and accepted in the `model` field.
pub const NAME: &str = "gemini";

/// [`ChatProvider`] backed by the Gemini API.
pub struct GeminiProvider {
    /// Shared client; its timeout bounds each call.
    client: Client,
    /// Key, model and base URL.
    settings: ProviderSettings,
}

impl GeminiProvider {
    /// Creates the adapter.
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client, usually shared with the other adapters.
    /// * `settings` - Connection settings; `settings.model` names the Gemini model.
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

/// Request body for the Gemini API.
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

/// A single part of the content: prompt text or an inline file.
#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Serialize, Debug, PartialEq)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

/// Response from the Gemini API.
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

fn part(message_part: &MessagePart) -> Part {
    match message_part {
        MessagePart::Text(text) => Part::Text { text: text.clone() },
        MessagePart::Attachment(a) => Part::InlineData {
            inline_data: Blob {
                mime_type: a.media_type.clone(),
                data: encode_base64(&a.data),
            },
        },
    }
}

fn build_request(conversation: &Conversation, params: &GenerationParams) -> GeminiRequest {
    let system_instruction = conversation.system_prompt().map(|text| Content {
        role: None,
        parts: vec![Part::Text { text }],
    });
    let contents = conversation
        .turns()
        .map(|m| Content {
            role: Some(if m.role == Role::Assistant { "model" } else { "user" }),
            parts: m.parts.iter().map(part).collect(),
        })
        .collect();
    GeminiRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            max_output_tokens: params.max_completion_tokens,
            temperature: params.temperature,
        },
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        let url = self
            .settings
            .endpoint(&format!("models/{}:generateContent", self.settings.model));
        let request = self
            .client
            .post(url)
            .query(&[("key", self.settings.api_key.as_str())])
            .json(&build_request(conversation, params));

        let response: GeminiResponse = send_json(NAME, request).await?;
        let text = response
            .candidates
            .into_iter()
            .flat_map(|c| c.content.map(|content| content.parts).unwrap_or_default())
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(empty_reply(NAME));
        }
        Ok(text)
    }
}
