//! Signing key cache for identity provider ID tokens.
//!
//! The provider publishes a JSON object mapping key id to a PEM encoded
//! public key (or X.509 certificate). Its cache headers are not a reliable
//! rotation signal, so a lookup miss is what triggers a refetch.
//!
//! # Concurrency
//!
//! Readers clone an `Arc<KeySet>` snapshot; the lock is held only for that
//! clone or for the pointer swap, never across the network fetch. Fetches
//! run on a spawned task so a cancelled request cannot abort a fetch other
//! requests are waiting on. Concurrent misses are coalesced: a caller that
//! finds the snapshot already replaced since its miss reuses the new one.

use crate::auth::error::KeyCacheError;
use crate::observability::metrics::record_key_fetch;
use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// A verification key. Immutable once parsed.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Parse a PEM public key or certificate for RS256 verification.
    ///
    /// # Errors
    ///
    /// Returns `KeyCacheError::Fetch` if the PEM is not a usable RSA key.
    pub fn from_pem(kid: &str, pem: &str) -> Result<Self, KeyCacheError> {
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            tracing::warn!(target: "venue.auth.keys", kid = %kid, error = %e, "Unparseable signing key");
            KeyCacheError::Fetch(format!("invalid key material for kid {kid}"))
        })?;

        Ok(Self {
            kid: kid.to_string(),
            decoding_key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// One complete fetch of the provider's keys.
#[derive(Debug, Default)]
pub struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: Option<DateTime<Utc>>,
}

impl KeySet {
    /// Build a key set from a kid to PEM map. One bad key fails the whole set.
    ///
    /// # Errors
    ///
    /// Returns `KeyCacheError::Fetch` if any PEM fails to parse.
    pub fn from_pem_map(
        pems: HashMap<String, String>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, KeyCacheError> {
        let keys = pems
            .into_iter()
            .map(|(kid, pem)| {
                let key = SigningKey::from_pem(&kid, &pem)?;
                Ok((kid, Arc::new(key)))
            })
            .collect::<Result<HashMap<_, _>, KeyCacheError>>()?;

        Ok(Self {
            keys,
            fetched_at: Some(fetched_at),
        })
    }

    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

struct KeyCacheInner {
    keys_url: String,
    http_client: reqwest::Client,
    snapshot: RwLock<Arc<KeySet>>,
    fetch_lock: Mutex<()>,
}

/// Shared, refetch-on-miss cache of provider signing keys.
///
/// Cloning is cheap and every clone shares the same snapshot.
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<KeyCacheInner>,
}

impl KeyCache {
    /// Create an empty cache for the given key endpoint.
    pub fn new(keys_url: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "venue.auth.keys", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            inner: Arc::new(KeyCacheInner {
                keys_url,
                http_client,
                snapshot: RwLock::new(Arc::new(KeySet::default())),
                fetch_lock: Mutex::new(()),
            }),
        }
    }

    /// A cache already holding `set`, pointed at an unreachable endpoint.
    #[cfg(test)]
    pub(crate) fn preloaded(set: KeySet) -> Self {
        let cache = Self::new("http://127.0.0.1:9/keys".to_string());
        Self {
            inner: Arc::new(KeyCacheInner {
                keys_url: cache.inner.keys_url.clone(),
                http_client: cache.inner.http_client.clone(),
                snapshot: RwLock::new(Arc::new(set)),
                fetch_lock: Mutex::new(()),
            }),
        }
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> Arc<KeySet> {
        Arc::clone(&*self.inner.snapshot.read().await)
    }

    /// Resolve a key id, fetching the key set once if it is missing.
    ///
    /// # Errors
    ///
    /// - `KeyCacheError::NotFound` if the kid is absent after the refetch
    /// - `KeyCacheError::Fetch` if the refetch failed (prior keys are kept)
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn ensure_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyCacheError> {
        let observed = self.snapshot().await;
        if let Some(key) = observed.get(kid) {
            tracing::debug!(target: "venue.auth.keys", kid = %kid, "Signing key cache hit");
            return Ok(key);
        }

        tracing::debug!(target: "venue.auth.keys", kid = %kid, "Signing key cache miss, refetching");
        let refreshed = self.refetch_after(observed).await?;

        refreshed.get(kid).ok_or_else(|| {
            tracing::warn!(target: "venue.auth.keys", kid = %kid, "Signing key not found after refetch");
            KeyCacheError::NotFound
        })
    }

    /// Force a fetch regardless of the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `KeyCacheError::Fetch` on failure; the prior snapshot stays.
    pub async fn refresh(&self) -> Result<(), KeyCacheError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = inner.fetch_lock.lock().await;
            inner.fetch_and_swap().await
        })
        .await
        .map_err(|e| KeyCacheError::Fetch(format!("key fetch task failed: {e}")))?
        .map(|_| ())
    }

    pub async fn key_count(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot().await.fetched_at()
    }

    pub fn keys_url(&self) -> &str {
        &self.inner.keys_url
    }

    async fn refetch_after(&self, observed: Arc<KeySet>) -> Result<Arc<KeySet>, KeyCacheError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = inner.fetch_lock.lock().await;

            let current = Arc::clone(&*inner.snapshot.read().await);
            if !Arc::ptr_eq(&current, &observed) {
                tracing::debug!(target: "venue.auth.keys", "Key set replaced by a concurrent fetch");
                return Ok(current);
            }

            inner.fetch_and_swap().await
        })
        .await
        .map_err(|e| KeyCacheError::Fetch(format!("key fetch task failed: {e}")))?
    }
}

impl KeyCacheInner {
    async fn fetch_and_swap(&self) -> Result<Arc<KeySet>, KeyCacheError> {
        let start = Instant::now();

        match self.fetch().await {
            Ok(set) => {
                let set = Arc::new(set);
                *self.snapshot.write().await = Arc::clone(&set);
                record_key_fetch("success", start.elapsed());
                tracing::info!(
                    target: "venue.auth.keys",
                    key_count = set.len(),
                    "Signing key cache refreshed"
                );
                Ok(set)
            }
            Err(e) => {
                record_key_fetch("error", start.elapsed());
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<KeySet, KeyCacheError> {
        tracing::debug!(target: "venue.auth.keys", url = %self.keys_url, "Fetching signing keys");

        let response = self
            .http_client
            .get(&self.keys_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "venue.auth.keys", error = %e, "Failed to fetch signing keys");
                KeyCacheError::Fetch("request failed".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "venue.auth.keys",
                status = %response.status(),
                "Key endpoint returned error"
            );
            return Err(KeyCacheError::Fetch(format!(
                "status {}",
                response.status().as_u16()
            )));
        }

        let pems: HashMap<String, String> = response.json().await.map_err(|e| {
            tracing::error!(target: "venue.auth.keys", error = %e, "Failed to parse key endpoint response");
            KeyCacheError::Fetch("malformed response".to_string())
        })?;

        if pems.is_empty() {
            tracing::error!(target: "venue.auth.keys", "Key endpoint returned no keys");
            return Err(KeyCacheError::Fetch("empty key set".to_string()));
        }

        KeySet::from_pem_map(pems, Utc::now())
    }
}
