//! Anthropic messages adapter (`POST {base_url}/messages`).
//!
//! System messages become the top-level `system` field. The API requires user and
//! assistant turns to alternate, so consecutive turns with the same role are merged.

use crate::client::{ProviderSettings, empty_reply, encode_base64, send_json};
use async_trait::async_trait;
use marker::error::ProviderError;
use marker::traits::provider::ChatProvider;
use marker::types::{Attachment, Conversation, GenerationParams, MessagePart, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name reported in logs and errors, and accepted in the `model` field.
pub const NAME: &str = "anthropic";
/// Value of the `anthropic-version` header.
pub const API_VERSION: &str = "2023-06-01";

/// [`ChatProvider`] backed by the Anthropic API.
pub struct AnthropicProvider {
    /// Shared client; its timeout bounds each call.
    client: Client,
    /// Key, model and base URL.
    settings: ProviderSettings,
}

impl AnthropicProvider {
    /// Creates the adapter.
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client, usually shared with the other adapters.
    /// * `settings` - Connection settings; `settings.model` names the Anthropic model.
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Turn>,
}

#[derive(Serialize, Debug, PartialEq)]
struct Turn {
    role: &'static str,
    content: Vec<Block>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text { text: String },
    Image { source: Source },
    Document { source: Source },
}

#[derive(Serialize, Debug, PartialEq)]
struct Source {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

fn base64_source(attachment: &Attachment) -> Source {
    Source {
        kind: "base64",
        media_type: attachment.media_type.clone(),
        data: encode_base64(&attachment.data),
    }
}

fn block(part: &MessagePart) -> Block {
    match part {
        MessagePart::Text(text) => Block::Text { text: text.clone() },
        MessagePart::Attachment(a) if a.is_image() => Block::Image {
            source: base64_source(a),
        },
        MessagePart::Attachment(a) if a.media_type == "application/pdf" => Block::Document {
            source: base64_source(a),
        },
        MessagePart::Attachment(a) => {
            warn!(file = %a.file_name, media_type = %a.media_type, "attachment type not supported by anthropic");
            Block::Text {
                text: format!(
                    "[attachment '{}' ({}) could not be included]",
                    a.file_name, a.media_type
                ),
            }
        }
    }
}

fn to_turns(conversation: &Conversation) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    for message in conversation.turns() {
        let role = match message.role {
            Role::Assistant => "assistant",
            _ => "user",
        };
        let blocks = message.parts.iter().map(block);
        match turns.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => turns.push(Turn {
                role,
                content: blocks.collect(),
            }),
        }
    }
    turns
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: params.max_completion_tokens,
            // anthropic caps temperature at 1.0
            temperature: params.temperature.min(1.0),
            system: conversation.system_prompt(),
            messages: to_turns(conversation),
        };
        let request = self
            .client
            .post(self.settings.endpoint("messages"))
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let response: MessagesResponse = send_json(NAME, request).await?;
        let text = response
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(empty_reply(NAME));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marker::types::Message;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn consecutive_same_role_turns_merge() {
        let mut c = Conversation::default();
        c.push(Message::text(Role::System, "rules"));
        c.push(Message::text(Role::User, "one"));
        c.push(Message::text(Role::User, "two"));
        c.push(Message::text(Role::Assistant, "ok"));
        let turns = to_turns(&c);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[0].content.len(), 2);
        assert_eq!(turns[1].role, "assistant");
    }

    #[test]
    fn pdf_becomes_document_block() {
        let pdf = Attachment::new("ms.pdf", "application/pdf", b"pdf".to_vec());
        assert!(matches!(block(&MessagePart::Attachment(pdf)), Block::Document { .. }));
        let docx = Attachment::new(
            "essay.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            vec![1],
        );
        assert!(matches!(block(&MessagePart::Attachment(docx)), Block::Text { .. }));
    }

    #[tokio::test]
    async fn sends_headers_system_and_joins_text_blocks() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "secret")
            .match_header("anthropic-version", API_VERSION)
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-test",
                "max_tokens": 1000,
                "system": "rules",
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"content": [
                    {"type": "text", "text": "{\"SPaG\":"},
                    {"type": "text", "text": "[]}"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let mut c = Conversation::default();
        c.push(Message::text(Role::System, "rules"));
        c.push(Message::text(Role::User, "hi"));
        let provider = AnthropicProvider::new(
            Client::new(),
            ProviderSettings::new("secret", "claude-test", server.url()),
        );
        let reply = provider.complete(&c, &GenerationParams::default()).await.unwrap();
        assert_eq!(reply, "{\"SPaG\":\n[]}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn overloaded_is_retryable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(529)
            .with_body("{\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\"}}")
            .create_async()
            .await;
        let provider = AnthropicProvider::new(
            Client::new(),
            ProviderSettings::new("k", "claude-test", server.url()),
        );
        let mut c = Conversation::default();
        c.push(Message::text(Role::User, "hi"));
        let err = provider.complete(&c, &GenerationParams::default()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
