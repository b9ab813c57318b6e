//! Factory: build the `Authorizer` from application `Config`.
use std::sync::Arc;

use crate::config::{Config, KeySource};
use crate::error::AppError;
use crate::services::authz::Authorizer;
use crate::services::jwks::{HttpKeySetFetcher, KeySetCache, KeySetFetcher, StaticKeySetFetcher};
use crate::services::policy::{PolicyContext, RegoPolicy};
use crate::services::token::TokenValidator;

pub fn build_authorizer(config: &Config) -> Result<Arc<Authorizer>, AppError> {
    let fetcher: Arc<dyn KeySetFetcher> = match &config.key_source {
        KeySource::Inline(json) => Arc::new(
            StaticKeySetFetcher::from_json(json)
                .map_err(|e| AppError::Startup(format!("JWKS_JSON is not a valid JWKS: {e}")))?,
        ),
        KeySource::Discovery { jwks_url } => Arc::new(
            HttpKeySetFetcher::new(config.jwks_fetch_timeout, jwks_url.clone())
                .map_err(|e| AppError::Startup(format!("failed to build JWKS http client: {e}")))?,
        ),
    };
    let keys = KeySetCache::new(fetcher, config.jwks_refresh_ttl, config.jwks_stale_grace);

    let policy = RegoPolicy::load_dir(&config.policy_dir)
        .map_err(|e| AppError::Startup(e.to_string()))?;
    let policy = PolicyContext::new(Arc::new(policy), config.policy_query.clone());

    if config.token_leeway_seconds > 0 {
        tracing::warn!(
            leeway_seconds = config.token_leeway_seconds,
            "clock skew leeway enabled for exp/iat/nbf checks"
        );
    }

    Ok(Arc::new(Authorizer::new(
        keys,
        TokenValidator::new(config.token_leeway_seconds),
        policy,
        config.issuer.clone(),
        config.audience.clone(),
    )))
}
