#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use opa_authorizer::services::jwks::{KeySet, KeySetCache, StaticKeySetFetcher};
use opa_authorizer::services::policy::{PolicyError, PolicyEvaluator, PolicyInput, ResultSet};
use serde_json::Value;

pub const ISSUER: &str = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_test";
pub const AUDIENCE: &str = "audience";
pub const KID: &str = "test-kid";

pub const PRIVATE_KEY_PEM: &[u8] = include_bytes!("../fixtures/test_rsa_private.pem");
pub const OTHER_PRIVATE_KEY_PEM: &[u8] = include_bytes!("../fixtures/other_rsa_private.pem");
pub const JWKS_JSON: &str = include_str!("../fixtures/test_jwks.json");

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn sign_with(pem: &[u8], kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());

    jsonwebtoken::encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(pem).expect("private key must parse"),
    )
    .expect("token encode should succeed")
}

/// RS256 token signed by the fixture key.
pub fn signed_token(issuer: &str, audience: &str, issued_at: i64, expiration: i64) -> String {
    sign_with(
        PRIVATE_KEY_PEM,
        KID,
        &serde_json::json!({
            "iss": issuer,
            "aud": [audience],
            "sub": "user-123",
            "iat": issued_at,
            "exp": expiration,
            "jti": "token-1",
            "token_use": "id",
        }),
    )
}

pub fn valid_token() -> String {
    signed_token(ISSUER, AUDIENCE, now(), now() + 3600)
}

pub fn jwks() -> JwkSet {
    serde_json::from_str(JWKS_JSON).expect("fixture JWKS must parse")
}

pub fn key_set() -> KeySet {
    KeySet::from_jwks(ISSUER, jwks(), Duration::from_secs(300)).expect("fixture key set")
}

pub fn static_cache() -> KeySetCache {
    KeySetCache::new(
        Arc::new(StaticKeySetFetcher::new(jwks())),
        Duration::from_secs(300),
        Duration::from_secs(60),
    )
}

/// Evaluator that records calls and returns a canned value.
pub struct SpyEvaluator {
    calls: AtomicUsize,
    value: Value,
}

impl SpyEvaluator {
    pub fn returning(value: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            value,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PolicyEvaluator for SpyEvaluator {
    fn evaluate(&self, _query: &str, _input: &PolicyInput) -> Result<Vec<ResultSet>, PolicyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ResultSet {
            expressions: vec![self.value.clone()],
        }])
    }
}
