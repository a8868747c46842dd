use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::config::ImageProviderConfig;

pub type ImageGatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, ImageGatewayError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum ImageGatewayError {
    #[error("image provider request failed: {0}")]
    ProviderFailure(String),
    #[error("image provider returned an invalid payload: {0}")]
    InvalidPayload(String),
}

/// One prompt in, one image URL out.
pub trait ImageGateway: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> ImageGatewayFuture<'a>;
}

/// Client for an OpenAI-style `images/generations` endpoint.
#[derive(Clone)]
pub struct ImageApiClient {
    client: reqwest::Client,
    config: ImageProviderConfig,
}

impl ImageApiClient {
    pub fn new(config: ImageProviderConfig) -> Result<Self, ImageGatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ImageGatewayError::ProviderFailure(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, ImageGatewayError> {
        let request_body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "n": 1,
        });

        let response = self
            .client
            .post(&self.config.images_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ImageGatewayError::ProviderFailure("request_timeout".to_string())
                } else {
                    ImageGatewayError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageGatewayError::ProviderFailure(format!(
                "status={}",
                status.as_u16()
            )));
        }

        let parsed: ImageSuccessResponse = response.json().await.map_err(|_| {
            ImageGatewayError::InvalidPayload("response_json_parse_failed".to_string())
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .and_then(|item| item.url)
            .ok_or_else(|| ImageGatewayError::InvalidPayload("missing_image_url".to_string()))
    }
}

impl ImageGateway for ImageApiClient {
    fn generate<'a>(&'a self, prompt: &'a str) -> ImageGatewayFuture<'a> {
        Box::pin(self.generate_once(prompt))
    }
}

/// Concurrent image fan-out over the first `max_images` prompts.
///
/// The result is positional: index i holds prompt i's URL or `None` if that
/// generation failed. Results are collected by index, never by completion
/// order, so a turn's image list stays an order-preserving subset of its
/// prompt list. A failed prompt never aborts the others.
pub async fn generate_images(
    gateway: &dyn ImageGateway,
    prompts: &[String],
    max_images: usize,
) -> Vec<Option<String>> {
    let capped = &prompts[..prompts.len().min(max_images)];

    let tasks = capped.iter().map(|prompt| async move {
        match gateway.generate(prompt).await {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(prompt = %prompt, "image generation failed: {err}");
                None
            }
        }
    });

    join_all(tasks).await
}

#[derive(Debug, Deserialize)]
struct ImageSuccessResponse {
    #[serde(default)]
    data: Vec<ImageDataItem>,
}

#[derive(Debug, Deserialize)]
struct ImageDataItem {
    url: Option<String>,
}
