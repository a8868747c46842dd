use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::config::TranscriptProviderConfig;

const MAX_TRANSCRIPT_TEXT_CHARS: usize = 150_000;
const TRUNCATION_MARKER: &str = "... [truncated]";

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("failed to build transcript http client: {0}")]
    HttpClient(String),
    #[error("transcript provider request failed after {attempts} attempts: {reason}")]
    ProviderFailure { attempts: u32, reason: String },
    #[error("transcript provider returned an empty or invalid payload")]
    EmptyTranscript,
}

/// Client for the external transcript provider. Non-success statuses and
/// transport errors retry with exponential backoff; an empty payload on a
/// successful response is still an error.
#[derive(Clone)]
pub struct TranscriptClient {
    client: reqwest::Client,
    config: TranscriptProviderConfig,
}

impl TranscriptClient {
    pub fn new(config: TranscriptProviderConfig) -> Result<Self, TranscriptError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| TranscriptError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn cache_ttl_days(&self) -> i64 {
        self.config.cache_ttl_days
    }

    pub async fn fetch(&self, video_id: &str) -> Result<Value, TranscriptError> {
        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut last_reason = String::new();

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(self.config.retry_base_backoff_ms, attempt - 1);
                warn!(
                    video_id = %video_id,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying transcript fetch"
                );
                sleep(delay).await;
            }

            match self.fetch_once(video_id).await {
                Ok(payload) => {
                    if is_empty_payload(&payload) {
                        return Err(TranscriptError::EmptyTranscript);
                    }
                    return Ok(payload);
                }
                Err(reason) => last_reason = reason,
            }
        }

        Err(TranscriptError::ProviderFailure {
            attempts: max_attempts,
            reason: last_reason,
        })
    }

    async fn fetch_once(&self, video_id: &str) -> Result<Value, String> {
        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[("video_id", video_id), ("lang", "en")])
            .header("x-rapidapi-key", &self.config.api_key)
            .header("x-rapidapi-host", &self.config.api_host)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    "request_timeout".to_string()
                } else {
                    "request_unavailable".to_string()
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status={}", status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|_| "response_json_parse_failed".to_string())
    }
}

pub(crate) fn backoff_delay(base_ms: u64, retry_index: u32) -> Duration {
    let multiplier = 2_u64.saturating_pow(retry_index);
    Duration::from_millis(base_ms.saturating_mul(multiplier))
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Flattens the provider payload into plain text for the lesson prompt:
/// segment arrays are joined on their `text`/`content` fields, a flat object
/// contributes its `text` field, anything else is serialized as-is.
pub fn flatten_transcript_text(payload: &Value) -> String {
    let text = match payload {
        Value::Array(items) => items
            .iter()
            .map(segment_text)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(fields) => match fields.get("text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => payload.to_string(),
        },
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    truncate_chars(&text, MAX_TRANSCRIPT_TEXT_CHARS)
}

fn segment_text(segment: &Value) -> String {
    segment
        .get("text")
        .or_else(|| segment.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
