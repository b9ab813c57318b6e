//! Key set sources used by `KeySetCache`.
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use url::Url;

use super::key_set::KeySetError;

/// Where a JWKS document comes from.
///
/// Implementations must not retry; the cache decides what a failure means.
#[async_trait]
pub trait KeySetFetcher: Send + Sync + 'static {
    // Source name (for logging).
    fn source_name(&self) -> &'static str;

    async fn fetch(&self, issuer: &str) -> Result<JwkSet, KeySetError>;
}

/// `<issuer>/.well-known/jwks.json`
pub fn discovery_url(issuer: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/.well-known/jwks.json",
        issuer.trim_end_matches('/')
    ))
}

/// Fetches the key set over HTTPS from the issuer's discovery endpoint.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    http: reqwest::Client,
    // Overrides the discovery URL derived from the issuer.
    jwks_url: Option<Url>,
}

impl HttpKeySetFetcher {
    pub fn new(timeout: Duration, jwks_url: Option<Url>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, jwks_url })
    }

    fn url_for(&self, issuer: &str) -> Result<Url, KeySetError> {
        match &self.jwks_url {
            Some(url) => Ok(url.clone()),
            None => discovery_url(issuer)
                .map_err(|e| KeySetError::fetch_failed(issuer, format!("invalid issuer url: {e}"))),
        }
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, issuer: &str) -> Result<JwkSet, KeySetError> {
        let url = self.url_for(issuer)?;

        self.http
            .get(url)
            .send()
            .await
            .map_err(|e| KeySetError::fetch_failed(issuer, format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| KeySetError::fetch_failed(issuer, format!("bad status: {e}")))?
            .json::<JwkSet>()
            .await
            .map_err(|e| KeySetError::fetch_failed(issuer, format!("invalid JWKS JSON: {e}")))
    }
}

/// Serves a fixed JWKS document (inline configuration, tests).
#[derive(Debug, Clone)]
pub struct StaticKeySetFetcher {
    jwks: JwkSet,
}

impl StaticKeySetFetcher {
    pub fn new(jwks: JwkSet) -> Self {
        Self { jwks }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl KeySetFetcher for StaticKeySetFetcher {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, _issuer: &str) -> Result<JwkSet, KeySetError> {
        Ok(self.jwks.clone())
    }
}
