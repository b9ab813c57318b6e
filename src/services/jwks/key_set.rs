use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum KeySetError {
    #[error("failed to fetch key set for {issuer}: {reason}")]
    FetchFailed { issuer: String, reason: String },
}

impl KeySetError {
    pub fn fetch_failed(issuer: &str, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            issuer: issuer.to_string(),
            reason: reason.into(),
        }
    }
}

/// Public verification keys of one issuer, indexed by `kid`.
///
/// Never empty. A refresh replaces the whole set.
#[derive(Debug, Clone)]
pub struct KeySet {
    issuer: String,
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
    ttl: Duration,
}

impl KeySet {
    pub fn from_jwks(issuer: &str, jwks: JwkSet, ttl: Duration) -> Result<Self, KeySetError> {
        let mut keys = HashMap::with_capacity(jwks.keys.len());
        for jwk in jwks.keys {
            match jwk.common.key_id.clone() {
                Some(kid) if !kid.trim().is_empty() => {
                    keys.insert(kid, jwk);
                }
                // Without a kid the key can never be selected by a token header.
                _ => debug!(issuer, "ignoring JWK without kid"),
            }
        }

        if keys.is_empty() {
            return Err(KeySetError::fetch_failed(issuer, "key set has no usable keys"));
        }

        Ok(Self {
            issuer: issuer.to_string(),
            keys,
            fetched_at: Instant::now(),
            ttl,
        })
    }

    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < self.ttl
    }

    // Still servable after a failed refresh.
    pub fn within_grace(&self, now: Instant, grace: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < self.ttl + grace
    }
}
