use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Verified token claims.
///
/// Only `TokenValidator` produces this type; there is no public constructor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    subject: Option<String>,
    issuer: String,
    audience: Vec<String>,
    issued_at: Option<i64>,
    not_before: Option<i64>,
    expiration: i64,
    token_id: Option<String>,
    custom: Map<String, Value>,
}

impl Claims {
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    pub fn not_before(&self) -> Option<i64> {
        self.not_before
    }

    pub fn expiration(&self) -> i64 {
        self.expiration
    }

    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    /// Non-registered claims (`cognito:groups`, `token_use`, `scope`, ...).
    pub fn custom(&self) -> &Map<String, Value> {
        &self.custom
    }
}

/// Payload as decoded after signature verification, before any claim check.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

// `aud` in a JWT may be a single string or an array of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Audience::One(aud) => vec![aud],
            Audience::Many(auds) => auds,
        }
    }
}

impl RawClaims {
    /// Promote to `Claims`. The caller has already checked `iss` and `exp`.
    pub(crate) fn into_claims(self, issuer: String, expiration: i64, audience: Vec<String>) -> Claims {
        Claims {
            subject: self.sub,
            issuer,
            audience,
            issued_at: self.iat,
            not_before: self.nbf,
            expiration,
            token_id: self.jti,
            custom: self.custom,
        }
    }
}
