use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

const JWKS_CACHE_TTL_SECONDS: i64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub alg: Option<String>,
    pub kty: String,
    pub n: String,
    pub e: String,
    #[serde(default, rename = "use")]
    pub use_: Option<String>,
}

impl Jwks {
    fn contains_key(&self, key_id: &str) -> bool {
        self.keys.iter().any(|key| key.kid == key_id)
    }
}

#[derive(Debug)]
pub enum JwksCacheError {
    UnknownKeyId,
    UpstreamUnavailable,
}

#[derive(Debug, Clone)]
struct CachedJwks {
    jwks: Jwks,
    expires_at: i64,
}

/// In-process TTL cache of the identity provider's JWKS document. A single
/// refresh lock keeps concurrent cache misses from stampeding the endpoint.
#[derive(Clone, Default)]
pub struct JwksCache {
    inner: Arc<JwksCacheInner>,
}

#[derive(Default)]
struct JwksCacheInner {
    entry: RwLock<Option<CachedJwks>>,
    refresh_lock: Mutex<()>,
}

impl JwksCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_for_key(
        &self,
        http_client: &reqwest::Client,
        jwks_url: &str,
        key_id: &str,
    ) -> Result<Jwks, JwksCacheError> {
        let now = chrono::Utc::now().timestamp();
        if let Some(cached) = self.read_entry().await
            && now <= cached.expires_at
            && cached.jwks.contains_key(key_id)
        {
            return Ok(cached.jwks);
        }

        let _refresh_guard = self.inner.refresh_lock.lock().await;

        // Another request may have refreshed while this one waited.
        let now = chrono::Utc::now().timestamp();
        if let Some(cached) = self.read_entry().await
            && now <= cached.expires_at
            && cached.jwks.contains_key(key_id)
        {
            return Ok(cached.jwks);
        }

        let fetched = fetch_jwks(http_client, jwks_url).await?;
        *self.inner.entry.write().await = Some(CachedJwks {
            jwks: fetched.clone(),
            expires_at: now.saturating_add(JWKS_CACHE_TTL_SECONDS),
        });

        if fetched.contains_key(key_id) {
            Ok(fetched)
        } else {
            Err(JwksCacheError::UnknownKeyId)
        }
    }

    async fn read_entry(&self) -> Option<CachedJwks> {
        self.inner.entry.read().await.clone()
    }
}

async fn fetch_jwks(http_client: &reqwest::Client, jwks_url: &str) -> Result<Jwks, JwksCacheError> {
    let jwks: Jwks = http_client
        .get(jwks_url)
        .send()
        .await
        .map_err(|err| {
            warn!("failed to reach identity provider JWKS endpoint: {err}");
            JwksCacheError::UpstreamUnavailable
        })?
        .error_for_status()
        .map_err(|_| JwksCacheError::UpstreamUnavailable)?
        .json()
        .await
        .map_err(|_| JwksCacheError::UpstreamUnavailable)?;

    if jwks.keys.is_empty() {
        return Err(JwksCacheError::UpstreamUnavailable);
    }

    Ok(jwks)
}
