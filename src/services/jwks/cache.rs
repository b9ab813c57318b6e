//! Per-issuer key set cache with single-flight refresh.
//!
//! Readers of a fresh entry only take a shared read lock. When an entry is
//! missing or past its TTL, exactly one fetch task runs per issuer; every caller
//! that arrives meanwhile awaits that same task instead of starting another.
//! A failed refresh falls back to the previous set while it is inside the
//! stale grace window.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::fetcher::KeySetFetcher;
use super::key_set::{KeySet, KeySetError};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<KeySet>, KeySetError>>>;

#[derive(Clone)]
pub struct KeySetCache {
    fetcher: Arc<dyn KeySetFetcher>,
    ttl: Duration,
    stale_grace: Duration,
    entries: Arc<RwLock<HashMap<String, Arc<KeySet>>>>,
    inflight: Arc<Mutex<HashMap<String, SharedFetch>>>,
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("source", &self.fetcher.source_name())
            .field("ttl", &self.ttl)
            .field("stale_grace", &self.stale_grace)
            .finish()
    }
}

impl KeySetCache {
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, ttl: Duration, stale_grace: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            stale_grace,
            entries: Arc::new(RwLock::new(HashMap::new())),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the key set for `issuer`, fetching or refreshing it when needed.
    ///
    /// # Errors
    /// `KeySetError::FetchFailed` when no usable set can be produced: the issuer
    /// was never fetched successfully, or the cached set is past TTL + grace.
    pub async fn get(&self, issuer: &str) -> Result<Arc<KeySet>, KeySetError> {
        let cached = self.entries.read().await.get(issuer).cloned();
        if let Some(keys) = &cached
            && keys.is_fresh(Instant::now())
        {
            return Ok(Arc::clone(keys));
        }

        match self.refresh(issuer).await {
            Ok(keys) => Ok(keys),
            Err(err) => match cached {
                Some(stale) if stale.within_grace(Instant::now(), self.stale_grace) => {
                    warn!(issuer, error = %err, "key set refresh failed, serving stale keys");
                    Ok(stale)
                }
                _ => Err(err),
            },
        }
    }

    /// Fetch the key set once at startup so the first request does not pay for it.
    pub async fn warm(&self, issuer: &str) {
        if let Err(err) = self.get(issuer).await {
            warn!(issuer, error = %err, "initial key set fetch failed");
        }
    }

    async fn refresh(&self, issuer: &str) -> Result<Arc<KeySet>, KeySetError> {
        let fetch = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(issuer) {
                Some(fetch) => fetch.clone(),
                None => {
                    // Another refresh may have completed since the caller's freshness check.
                    if let Some(keys) = self.entries.read().await.get(issuer)
                        && keys.is_fresh(Instant::now())
                    {
                        return Ok(Arc::clone(keys));
                    }

                    let fetch = self.spawn_fetch(issuer.to_string());
                    inflight.insert(issuer.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    // The fetch runs on its own task so it completes (and clears `inflight`)
    // even if every waiting caller is cancelled.
    fn spawn_fetch(&self, issuer: String) -> SharedFetch {
        let fetcher = Arc::clone(&self.fetcher);
        let entries = Arc::clone(&self.entries);
        let inflight = Arc::clone(&self.inflight);
        let ttl = self.ttl;
        let task_issuer = issuer.clone();

        let handle = tokio::spawn(async move {
            let issuer = task_issuer;
            let result = fetcher
                .fetch(&issuer)
                .await
                .and_then(|jwks| KeySet::from_jwks(&issuer, jwks, ttl))
                .map(Arc::new);

            match &result {
                Ok(keys) => {
                    info!(
                        issuer = %issuer,
                        source = fetcher.source_name(),
                        keys = keys.len(),
                        "key set refreshed"
                    );
                    entries.write().await.insert(issuer.clone(), Arc::clone(keys));
                }
                Err(err) => warn!(issuer = %issuer, error = %err, "key set fetch failed"),
            }

            inflight.lock().await.remove(&issuer);
            result
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(KeySetError::fetch_failed(
                    &issuer,
                    format!("refresh task failed: {e}"),
                ))
            })
        }
        .boxed()
        .shared()
    }
}
