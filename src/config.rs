/*
 * Responsibility
 * - Load environment configuration (issuer, audience, key discovery, policy bundle, logging)
 * - Validate values once at startup (missing or malformed => refuse to start)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where the trusted signing keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    // Fetch `<issuer>/.well-known/jwks.json`, or an explicit URL when configured.
    Discovery { jwks_url: Option<Url> },
    // Inline JWKS document (local runs / tests).
    Inline(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub log_level: String,

    pub issuer: String,
    pub audience: Option<String>,
    pub token_leeway_seconds: u64,

    pub key_source: KeySource,
    pub jwks_refresh_ttl: Duration,
    pub jwks_stale_grace: Duration,
    pub jwks_fetch_timeout: Duration,

    pub policy_dir: PathBuf,
    pub policy_query: String,

    pub request_timeout: Duration,
}

/// Issuer URL of a Cognito user pool. Its JWKS lives under `/.well-known/jwks.json`.
pub fn cognito_issuer(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{}.amazonaws.com/{}", region, user_pool_id)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Treat blank values the same as unset ones.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port: u16 = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));
        let log_level = get("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_ascii_lowercase();

        let issuer = match (get("ISSUER"), get("AWS_REGION"), get("USER_POOL_ID")) {
            (Some(issuer), _, _) => issuer,
            (None, Some(region), Some(pool)) => cognito_issuer(&region, &pool),
            (None, None, _) => return Err(ConfigError::Missing("ISSUER or AWS_REGION")),
            (None, Some(_), None) => return Err(ConfigError::Missing("USER_POOL_ID")),
        };
        Url::parse(&issuer).map_err(|_| ConfigError::Invalid("ISSUER"))?;

        let audience = get("AUDIENCE");

        let key_source = match get("JWKS_JSON") {
            Some(json) => KeySource::Inline(json),
            None => {
                let jwks_url = get("JWKS_URL")
                    .map(|raw| Url::parse(&raw).map_err(|_| ConfigError::Invalid("JWKS_URL")))
                    .transpose()?;
                KeySource::Discovery { jwks_url }
            }
        };

        let token_leeway_seconds = parse_or(&get, "TOKEN_LEEWAY_SECONDS", 0)?;
        let jwks_refresh_ttl =
            Duration::from_secs(parse_or(&get, "JWKS_REFRESH_TTL_SECONDS", 3600)?);
        let jwks_stale_grace =
            Duration::from_secs(parse_or(&get, "JWKS_STALE_GRACE_SECONDS", 300)?);
        let jwks_fetch_timeout =
            Duration::from_millis(parse_or(&get, "JWKS_FETCH_TIMEOUT_MS", 2000)?);

        let policy_dir = PathBuf::from(get("POLICY_DIR").unwrap_or_else(|| "policies".into()));
        let policy_query = get("POLICY_QUERY").unwrap_or_else(|| "data.authz.allow".into());

        let request_timeout = Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECONDS", 10)?);
        if request_timeout.is_zero() {
            return Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"));
        }

        Ok(Self {
            addr,
            app_env,
            log_level,
            issuer,
            audience,
            token_leeway_seconds,
            key_source,
            jwks_refresh_ttl,
            jwks_stale_grace,
            jwks_fetch_timeout,
            policy_dir,
            policy_query,
            request_timeout,
        })
    }
}

fn parse_or<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}
