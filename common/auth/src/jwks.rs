use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

/// JSON Web Key Set as published by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// A single published key. Fields are optional so one odd entry does not
/// poison the whole set; entries without a `kid` simply never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl JwkSet {
    /// First key whose `kid` matches. Duplicate ids resolve to the earliest entry.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|key| key.kid.as_deref() == Some(kid))
    }
}

impl Jwk {
    pub fn rsa(kid: impl Into<String>, n: impl Into<String>, e: impl Into<String>) -> Self {
        Self {
            kid: Some(kid.into()),
            kty: Some("RSA".to_string()),
            key_use: Some("sig".to_string()),
            alg: Some("RS256".to_string()),
            n: Some(n.into()),
            e: Some(e.into()),
        }
    }

    /// Builds the RSA verification key from the modulus and exponent.
    pub fn decoding_key(&self) -> AuthResult<DecodingKey> {
        if let Some(kty) = self.kty.as_deref() {
            if kty != "RSA" {
                return Err(AuthError::InvalidHeader);
            }
        }
        let (n, e) = match (self.n.as_deref(), self.e.as_deref()) {
            (Some(n), Some(e)) => (n, e),
            _ => return Err(AuthError::InvalidHeader),
        };
        DecodingKey::from_rsa_components(n, e).map_err(|_| AuthError::InvalidHeader)
    }
}

/// Source of the current signing key set.
#[async_trait]
pub trait KeySetResolver: Send + Sync {
    async fn resolve(&self) -> AuthResult<Arc<JwkSet>>;

    /// Called after a token named a `kid` absent from the resolved set, which
    /// usually means the provider rotated keys. Returns the newest set this
    /// resolver can offer, or `None` when nothing newer can exist.
    async fn refresh_on_miss(&self) -> AuthResult<Option<Arc<JwkSet>>> {
        Ok(None)
    }
}

/// Fetches the key set over HTTP on every call.
#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
    timeout: Duration,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwks_url()).with_timeout(config.jwks_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> AuthResult<JwkSet> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                warn!(url = %self.url, error = %err, "JWKS request failed");
                AuthError::KeySetUnavailable(err.to_string())
            })?;

        if !response.status().is_success() {
            warn!(url = %self.url, status = %response.status(), "JWKS endpoint returned error status");
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let body: JwkSet = response.json().await.map_err(|err| {
            warn!(url = %self.url, error = %err, "JWKS response did not parse");
            AuthError::KeySetUnavailable(err.to_string())
        })?;

        debug!(url = %self.url, keys = body.keys.len(), "fetched JWKS");
        Ok(body)
    }
}

#[async_trait]
impl KeySetResolver for JwksFetcher {
    async fn resolve(&self) -> AuthResult<Arc<JwkSet>> {
        self.fetch().await.map(Arc::new)
    }
}

struct CachedEntry {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Read-through cache over a [`JwksFetcher`].
///
/// Readers only touch the `RwLock`; refreshes are serialised behind an async
/// mutex so concurrent misses trigger a single fetch per TTL window. An unknown
/// `kid` may force an early refetch, at most once per `min_refresh_interval`.
pub struct CachedKeySet {
    fetcher: JwksFetcher,
    ttl: Duration,
    min_refresh_interval: Duration,
    current: RwLock<Option<CachedEntry>>,
    refresh: Mutex<()>,
}

impl CachedKeySet {
    pub fn new(fetcher: JwksFetcher, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            min_refresh_interval: Duration::from_secs(30),
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drops the cached set so the next resolve fetches again.
    pub fn invalidate(&self) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    fn fresh(&self) -> Option<Arc<JwkSet>> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.keys.clone())
    }

    /// Cached set younger than `max_age`, regardless of TTL.
    fn younger_than(&self, max_age: Duration) -> Option<Arc<JwkSet>> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < max_age)
            .map(|entry| entry.keys.clone())
    }

    async fn fetch_and_store(&self) -> AuthResult<Arc<JwkSet>> {
        let keys = Arc::new(self.fetcher.fetch().await?);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(CachedEntry {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }
}

#[async_trait]
impl KeySetResolver for CachedKeySet {
    async fn resolve(&self) -> AuthResult<Arc<JwkSet>> {
        if let Some(keys) = self.fresh() {
            return Ok(keys);
        }

        let _refresh = self.refresh.lock().await;
        // Another task may have refreshed while we waited.
        if let Some(keys) = self.fresh() {
            return Ok(keys);
        }

        self.fetch_and_store().await
    }

    async fn refresh_on_miss(&self) -> AuthResult<Option<Arc<JwkSet>>> {
        let _refresh = self.refresh.lock().await;
        // Rate limit: a recent set (possibly fetched by a concurrent miss) is reused.
        if let Some(keys) = self.younger_than(self.min_refresh_interval) {
            return Ok(Some(keys));
        }

        debug!(url = %self.fetcher.url(), "unknown kid, refetching JWKS early");
        self.fetch_and_store().await.map(Some)
    }
}

/// Fixed key set, for tests and deployments that pin keys out of band.
#[derive(Debug, Clone)]
pub struct StaticKeySet {
    keys: Arc<JwkSet>,
}

impl StaticKeySet {
    pub fn new(keys: JwkSet) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }
}

#[async_trait]
impl KeySetResolver for StaticKeySet {
    async fn resolve(&self) -> AuthResult<Arc<JwkSet>> {
        Ok(self.keys.clone())
    }
}
