use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ChatGatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, ChatGatewayError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single content part of a mixed (vision) message, serialized per the
/// OpenAI chat-completions convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlPart },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrlPart {
    pub url: String,
}

/// Message content is either plain text or a list of text/image parts.
/// Image parts are only attached to the final user turn, as a data URI or a
/// remote URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn text_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self::Parts(vec![
            ContentPart::Text { text: text.into() },
            ContentPart::ImageUrl {
                image_url: ImageUrlPart {
                    url: image_url.into(),
                },
            },
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::text(content),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::text(content),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::text(content),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Error)]
pub enum ChatGatewayError {
    #[error("chat provider rate limit exceeded")]
    RateLimited,
    #[error("chat provider usage quota exceeded")]
    QuotaExceeded,
    #[error("chat provider request timed out")]
    Timeout,
    #[error("chat provider request failed: {0}")]
    ProviderFailure(String),
    #[error("chat provider returned an invalid payload: {0}")]
    InvalidPayload(String),
}

/// Non-streaming chat completion: the reply is the raw assistant text.
pub trait ChatGateway: Send + Sync {
    fn complete<'a>(&'a self, request: ChatCompletionRequest) -> ChatGatewayFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, MessageContent};

    #[test]
    fn plain_text_content_serializes_as_string() {
        let message = ChatMessage::user("explain photosynthesis");
        let serialized = serde_json::to_value(&message).expect("message should serialize");

        assert_eq!(serialized["role"], "user");
        assert_eq!(serialized["content"], "explain photosynthesis");
    }

    #[test]
    fn mixed_content_serializes_as_typed_parts() {
        let message = ChatMessage {
            role: super::Role::User,
            content: MessageContent::text_with_image(
                "what is in this picture?",
                "data:image/png;base64,AAAA",
            ),
        };
        let serialized = serde_json::to_value(&message).expect("message should serialize");

        assert_eq!(serialized["content"][0]["type"], "text");
        assert_eq!(serialized["content"][1]["type"], "image_url");
        assert_eq!(
            serialized["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }
}
