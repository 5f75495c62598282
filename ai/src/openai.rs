//! OpenAI chat completions adapter (`POST {base_url}/chat/completions`).
//!
//! Images are sent as `image_url` parts carrying a base64 data URL; any other binary
//! attachment (PDF mark schemes, uploaded essays) is sent as a `file` part.

use crate::client::{ProviderSettings, empty_reply, encode_base64, send_json};
use async_trait::async_trait;
use marker::error::ProviderError;
use marker::traits::provider::ChatProvider;
use marker::types::{Attachment, Conversation, GenerationParams, MessagePart, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Name reported in logs and errors, and accepted in the `model` field.
pub const NAME: &str = "openai";

/// [`ChatProvider`] backed by the OpenAI API.
pub struct OpenAiProvider {
    /// Shared client; its timeout bounds each call.
    client: Client,
    /// Key, model and base URL.
    settings: ProviderSettings,
}

impl OpenAiProvider {
    /// Creates the adapter.
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client, usually shared with the other adapters.
    /// * `settings` - Connection settings; `settings.model` names the OpenAI model.
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FileData },
}

#[derive(Serialize, Debug, PartialEq)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct FileData {
    filename: String,
    file_data: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn data_url(attachment: &Attachment) -> String {
    format!(
        "data:{};base64,{}",
        attachment.media_type,
        encode_base64(&attachment.data)
    )
}

fn content_part(part: &MessagePart) -> ContentPart {
    match part {
        MessagePart::Text(text) => ContentPart::Text { text: text.clone() },
        MessagePart::Attachment(a) if a.is_image() => ContentPart::ImageUrl {
            image_url: ImageUrl { url: data_url(a) },
        },
        MessagePart::Attachment(a) => ContentPart::File {
            file: FileData {
                filename: a.file_name.clone(),
                file_data: data_url(a),
            },
        },
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn to_messages(conversation: &Conversation) -> Vec<ChatMessage> {
    conversation
        .messages
        .iter()
        .map(|m| ChatMessage {
            role: role_name(m.role),
            content: m.parts.iter().map(content_part).collect(),
        })
        .collect()
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: to_messages(conversation),
            max_completion_tokens: params.max_completion_tokens,
            temperature: params.temperature,
        };
        let request = self
            .client
            .post(self.settings.endpoint("chat/completions"))
            .bearer_auth(&self.settings.api_key)
            .json(&body);

        let response: ChatResponse = send_json(NAME, request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| empty_reply(NAME))
    }
}
