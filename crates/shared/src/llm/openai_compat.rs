use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;

use crate::config::ChatGatewayConfig;

use super::gateway::{ChatCompletionRequest, ChatGateway, ChatGatewayError, ChatGatewayFuture};

/// Chat gateway for any OpenAI-compatible chat-completions endpoint. The
/// concrete provider is selected purely by configuration (URL, key, model).
#[derive(Clone)]
pub struct OpenAiCompatGateway {
    client: reqwest::Client,
    config: ChatGatewayConfig,
}

impl OpenAiCompatGateway {
    pub fn new(config: ChatGatewayConfig) -> Result<Self, ChatGatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ChatGatewayError::ProviderFailure(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn complete_with_retries(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, ChatGatewayError> {
        let mut attempt = 0_u32;

        loop {
            match self.send_once(request).await {
                Ok(reply) => return Ok(reply),
                Err(err) => {
                    if is_retryable(&err) && attempt < self.config.max_retries {
                        let backoff_multiplier = 2_u64.saturating_pow(attempt);
                        let backoff_ms = self
                            .config
                            .retry_base_backoff_ms
                            .saturating_mul(backoff_multiplier);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt = attempt.saturating_add(1);
                        continue;
                    }

                    return Err(err);
                }
            }
        }
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<String, ChatGatewayError> {
        let request_body = json!({
            "model": &request.model,
            "messages": &request.messages,
        });

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ChatGatewayError::Timeout
                } else {
                    ChatGatewayError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => ChatGatewayError::RateLimited,
                StatusCode::PAYMENT_REQUIRED => ChatGatewayError::QuotaExceeded,
                other => {
                    ChatGatewayError::ProviderFailure(format!("status={}", other.as_u16()))
                }
            });
        }

        let parsed: ChatSuccessResponse = response.json().await.map_err(|_| {
            ChatGatewayError::InvalidPayload("response_json_parse_failed".to_string())
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatGatewayError::InvalidPayload("missing_choice".to_string()))?
            .message
            .content;

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatGatewayError::InvalidPayload(
                "empty_reply_content".to_string(),
            ));
        }

        Ok(content)
    }
}

impl ChatGateway for OpenAiCompatGateway {
    fn complete<'a>(&'a self, request: ChatCompletionRequest) -> ChatGatewayFuture<'a> {
        Box::pin(async move { self.complete_with_retries(&request).await })
    }
}

// 429 and 402 are surfaced immediately: the handler contract maps them to
// distinct statuses and retrying would only mask that.
fn is_retryable(err: &ChatGatewayError) -> bool {
    match err {
        ChatGatewayError::Timeout => true,
        ChatGatewayError::ProviderFailure(reason) => {
            reason == "request_unavailable"
                || reason
                    .strip_prefix("status=")
                    .and_then(|code| code.parse::<u16>().ok())
                    .is_some_and(|code| code >= 500)
        }
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct ChatSuccessResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::is_retryable;
    use super::ChatGatewayError;

    #[test]
    fn server_errors_and_timeouts_are_retryable() {
        assert!(is_retryable(&ChatGatewayError::Timeout));
        assert!(is_retryable(&ChatGatewayError::ProviderFailure(
            "status=503".to_string()
        )));
        assert!(is_retryable(&ChatGatewayError::ProviderFailure(
            "request_unavailable".to_string()
        )));
    }

    #[test]
    fn rate_limit_and_quota_are_terminal() {
        assert!(!is_retryable(&ChatGatewayError::RateLimited));
        assert!(!is_retryable(&ChatGatewayError::QuotaExceeded));
        assert!(!is_retryable(&ChatGatewayError::ProviderFailure(
            "status=400".to_string()
        )));
    }
}
