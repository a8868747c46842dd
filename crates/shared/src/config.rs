use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_CHAT_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_CHAT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_CHAT_MAX_RETRIES: u32 = 2;
const DEFAULT_CHAT_RETRY_BASE_BACKOFF_MS: u64 = 250;

const DEFAULT_TRANSCRIPT_API_URL: &str = "https://youtube-transcriptor.p.rapidapi.com/transcript";
const DEFAULT_TRANSCRIPT_API_HOST: &str = "youtube-transcriptor.p.rapidapi.com";
const DEFAULT_TRANSCRIPT_RETRY_BASE_BACKOFF_MS: u64 = 300;
const DEFAULT_TRANSCRIPT_MAX_RETRIES: u32 = 3;
const DEFAULT_TRANSCRIPT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_TRANSCRIPT_CACHE_TTL_DAYS: i64 = 7;

const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 45_000;
const DEFAULT_MAX_IMAGES_PER_REPLY: usize = 4;
const DEFAULT_CONTEXT_TURNS: u32 = 12;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub migrations_dir: PathBuf,
    pub auth: AuthConfig,
    pub chat_gateway: ChatGatewayConfig,
    pub image_provider: Option<ImageProviderConfig>,
    pub transcripts: TranscriptProviderConfig,
    pub max_images_per_reply: usize,
    pub context_turns: i64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwks_url: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone)]
pub struct ChatGatewayConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
}

/// Image generation is optional: without a key the fan-out is skipped and
/// replies carry empty image lists.
#[derive(Debug, Clone)]
pub struct ImageProviderConfig {
    pub images_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TranscriptProviderConfig {
    pub api_url: String,
    pub api_key: String,
    pub api_host: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
    pub cache_ttl_days: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chat_completions_url = optional_trimmed_env("CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string());
        require_http_url("CHAT_COMPLETIONS_URL", &chat_completions_url)?;

        let image_provider = match optional_trimmed_env("IMAGE_API_KEY") {
            Some(api_key) => {
                let images_url = require_env("IMAGE_API_URL")?;
                require_http_url("IMAGE_API_URL", &images_url)?;
                Some(ImageProviderConfig {
                    images_url,
                    api_key,
                    model: optional_trimmed_env("IMAGE_MODEL")
                        .unwrap_or_else(|| "default".to_string()),
                    timeout_ms: parse_u64_env("IMAGE_TIMEOUT_MS", DEFAULT_IMAGE_TIMEOUT_MS)?,
                })
            }
            None => None,
        };

        Ok(Self {
            bind_addr: env::var("API_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: parse_u32_env("DATABASE_MAX_CONNECTIONS", 10)?,
            migrations_dir: env::var("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../db/migrations")
                }),
            auth: AuthConfig {
                jwks_url: require_env("AUTH_JWKS_URL")?,
                issuer: require_env("AUTH_ISSUER")?,
                audience: require_env("AUTH_AUDIENCE")?,
            },
            chat_gateway: ChatGatewayConfig {
                chat_completions_url,
                api_key: require_env("CHAT_API_KEY")?,
                model: optional_trimmed_env("CHAT_MODEL")
                    .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
                timeout_ms: parse_u64_env("CHAT_TIMEOUT_MS", DEFAULT_CHAT_TIMEOUT_MS)?,
                max_retries: parse_u32_env("CHAT_MAX_RETRIES", DEFAULT_CHAT_MAX_RETRIES)?,
                retry_base_backoff_ms: parse_u64_env(
                    "CHAT_RETRY_BASE_BACKOFF_MS",
                    DEFAULT_CHAT_RETRY_BASE_BACKOFF_MS,
                )?,
            },
            image_provider,
            transcripts: TranscriptProviderConfig {
                api_url: optional_trimmed_env("TRANSCRIPT_API_URL")
                    .unwrap_or_else(|| DEFAULT_TRANSCRIPT_API_URL.to_string()),
                api_key: require_env("TRANSCRIPT_API_KEY")?,
                api_host: optional_trimmed_env("TRANSCRIPT_API_HOST")
                    .unwrap_or_else(|| DEFAULT_TRANSCRIPT_API_HOST.to_string()),
                timeout_ms: parse_u64_env("TRANSCRIPT_TIMEOUT_MS", DEFAULT_TRANSCRIPT_TIMEOUT_MS)?,
                max_retries: parse_u32_env(
                    "TRANSCRIPT_MAX_RETRIES",
                    DEFAULT_TRANSCRIPT_MAX_RETRIES,
                )?,
                retry_base_backoff_ms: parse_u64_env(
                    "TRANSCRIPT_RETRY_BASE_BACKOFF_MS",
                    DEFAULT_TRANSCRIPT_RETRY_BASE_BACKOFF_MS,
                )?,
                cache_ttl_days: DEFAULT_TRANSCRIPT_CACHE_TTL_DAYS,
            },
            max_images_per_reply: parse_usize_env(
                "MAX_IMAGES_PER_REPLY",
                DEFAULT_MAX_IMAGES_PER_REPLY,
            )?,
            context_turns: i64::from(parse_u32_env("CONTEXT_TURNS", DEFAULT_CONTEXT_TURNS)?),
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    let value = env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingVar(key.to_string()));
    }
    Ok(trimmed.to_string())
}

fn require_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{key} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_u32_env(key: &str, default: u32) -> Result<u32, ConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u32>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64, ConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

fn parse_usize_env(key: &str, default: usize) -> Result<usize, ConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}
