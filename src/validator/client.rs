// src/validator/client.rs

use super::model::{JsonWebKeySet, KeySet};
use crate::clock::Clock;
use crate::error::FetchError;
use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use url::Url;

/// Path of the key-set document on the issuer's domain.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Retrieves an issuer's published key set.
#[async_trait]
pub trait KeySetFetcher: Send + Sync + 'static {
    async fn fetch(&self, domain: &str) -> Result<KeySet, FetchError>;
}

/// Fetches `https://{domain}/.well-known/jwks.json` with a bounded timeout.
#[derive(Clone)]
pub struct HttpKeySetFetcher {
    http_client: reqwest::Client,
    scheme: String,
}

impl HttpKeySetFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self::with_client(http_client))
    }

    /// Uses a caller-supplied client. The caller is responsible for its timeouts.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            scheme: "https".to_string(),
        }
    }

    /// Overrides the URL scheme. Only local test servers should need `http`.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// The JWKS URL for `domain`.
    pub fn jwks_url(&self, domain: &str) -> Result<Url, FetchError> {
        Url::parse(&format!("{}://{}{}", self.scheme, domain, JWKS_PATH))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    #[instrument(skip(self), err(level = "debug"))]
    async fn fetch(&self, domain: &str) -> Result<KeySet, FetchError> {
        let jwks_url = self.jwks_url(domain)?;
        debug!(url = %jwks_url, "Fetching JWKS");

        let response = self.http_client.get(jwks_url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let jwks: JsonWebKeySet = serde_json::from_slice(&body)
            .map_err(|e| FetchError::MalformedBody(e.to_string()))?;

        Ok(jwks.into())
    }
}

/// The outcome of one fetch attempt for a domain.
///
/// Failed attempts are stored too, so that requests queued behind the attempt
/// receive its error instead of fetching again. A failed entry is never fresh.
#[derive(Debug)]
struct CacheEntry {
    outcome: Result<Arc<KeySet>, FetchError>,
    fetched_at: u64,
    generation: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: u64, ttl: Duration) -> bool {
        self.outcome.is_ok() && now < self.fetched_at.saturating_add(ttl.as_secs())
    }
}

/// Per-issuer cache of published key sets.
///
/// Entries are refreshed lazily: the first request to observe an expired or
/// absent entry fetches a new key set, and concurrent requests for the same
/// domain wait for that one fetch and share its result, error included.
/// Lookups for other domains are not held up.
#[derive(Clone)]
pub struct KeySetCache {
    // The cache is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<dyn KeySetFetcher>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: Cache<String, Arc<CacheEntry>>,
    attempts: AtomicU64,
}

impl KeySetCache {
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                clock,
                ttl,
                entries: Cache::new(100), // Max 100 issuers, should be more than enough.
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the key set for `domain`, fetching it if the cached copy is
    /// missing or older than the TTL.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's `FetchError`. A failure is handed to the requests
    /// that were waiting on the same fetch; later requests try again.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn get(&self, domain: &str) -> Result<Arc<KeySet>, FetchError> {
        let now = self.inner.clock.now();
        let seen = self.inner.entries.get(domain).await;
        if let Some(entry) = &seen {
            if entry.is_fresh(now, self.inner.ttl) {
                debug!("JWKS cache hit for {}", domain);
                return entry.outcome.clone();
            }
        }
        let seen_generation = seen.map(|entry| entry.generation);

        debug!("JWKS cache miss for {}. Fetching from issuer.", domain);
        let inner = Arc::clone(&self.inner);
        let owned_domain = domain.to_string();

        // The compute closure runs under a per-key lock. A request queued
        // behind another attempt finds a different generation in the entry
        // and takes that attempt's outcome instead of fetching.
        let result = self
            .inner
            .entries
            .entry(domain.to_string())
            .and_compute_with(|existing| async move {
                let now = inner.clock.now();
                if let Some(entry) = existing {
                    let entry = entry.value();
                    if entry.is_fresh(now, inner.ttl) || Some(entry.generation) != seen_generation {
                        return Op::Nop;
                    }
                }

                let outcome = match inner.fetcher.fetch(&owned_domain).await {
                    Ok(key_set) => {
                        info!(
                            "Fetched {} keys for {}. Caching with TTL: {:?}",
                            key_set.len(),
                            owned_domain,
                            inner.ttl
                        );
                        Ok(Arc::new(key_set))
                    }
                    Err(e) => {
                        error!("Failed to fetch JWKS for {}: {}", owned_domain, e);
                        Err(e)
                    }
                };

                Op::Put(Arc::new(CacheEntry {
                    outcome,
                    fetched_at: now,
                    generation: inner.attempts.fetch_add(1, Ordering::Relaxed) + 1,
                }))
            })
            .await;

        match result {
            CompResult::Inserted(entry)
            | CompResult::ReplacedWith(entry)
            | CompResult::Unchanged(entry) => entry.into_value().outcome.clone(),
            CompResult::Removed(_) | CompResult::StillNone(_) => Err(FetchError::MalformedBody(
                "no key set was stored for the issuer".to_string(),
            )),
        }
    }

    /// Drops the cached key set for `domain`; the next `get` fetches again.
    pub async fn invalidate(&self, domain: &str) {
        self.inner.entries.invalidate(domain).await;
    }
}
