//! Bearer token verification.
//!
//! Order matters and each step short-circuits:
//! 1. split + decode the header
//! 2. look the `kid` up in the key set and infer the algorithm from the key
//! 3. verify the signature
//! 4. check `iss`, `aud`, `exp`, then `iat`/`nbf`
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::debug;

use super::claims::{Audience, Claims, RawClaims};
use super::error::{MALFORMED_HEADER, MALFORMED_PAYLOAD, TokenError};
use super::raw_token::RawToken;
use crate::services::jwks::KeySet;

/// `Ok(Claims)` for a trusted token, `Err(TokenError)` naming the failed check otherwise.
pub type ValidationOutcome = Result<Claims, TokenError>;

const RSA_FAMILY: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenValidator {
    // Applied to exp/iat/nbf. Zero unless explicitly configured.
    leeway_seconds: i64,
}

impl TokenValidator {
    pub fn new(leeway_seconds: u64) -> Self {
        Self {
            leeway_seconds: i64::try_from(leeway_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Validate against the wall clock.
    pub fn validate(
        &self,
        token: &RawToken,
        keys: &KeySet,
        issuer: &str,
        audience: Option<&str>,
    ) -> ValidationOutcome {
        self.validate_at(token, keys, issuer, audience, chrono::Utc::now().timestamp())
    }

    /// Validate with an explicit "now" (unix seconds).
    pub fn validate_at(
        &self,
        token: &RawToken,
        keys: &KeySet,
        issuer: &str,
        audience: Option<&str>,
        now: i64,
    ) -> ValidationOutcome {
        let token = token.as_str();

        // 1) structure
        if token.split('.').count() != 3 {
            return Err(TokenError::ParseFailed(MALFORMED_HEADER));
        }
        let header = jsonwebtoken::decode_header(token)
            .map_err(|_| TokenError::ParseFailed(MALFORMED_HEADER))?;

        // 2) key lookup; the key decides which algorithms are acceptable
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| TokenError::KeyNotFound("token header has no kid".to_string()))?;
        let jwk = keys
            .get(kid)
            .ok_or_else(|| TokenError::KeyNotFound(format!("kid {kid} is not in the key set")))?;
        let algorithm = infer_algorithm(jwk, header.alg).ok_or_else(|| {
            TokenError::KeyNotFound(format!("alg {:?} does not match key {kid}", header.alg))
        })?;
        let decoding_key = DecodingKey::from_jwk(jwk)
            .map_err(|e| TokenError::KeyNotFound(format!("key {kid} is unusable: {e}")))?;

        // 3) signature
        let data = jsonwebtoken::decode::<RawClaims>(
            token,
            &decoding_key,
            &signature_only(algorithm),
        )
        .map_err(map_decode_error)?;

        // 4) claims
        check_claims(data.claims, issuer, audience, now, self.leeway_seconds)
    }
}

/// The algorithm to verify with: the header's hint, if and only if the key allows it.
fn infer_algorithm(jwk: &Jwk, hinted: Algorithm) -> Option<Algorithm> {
    let allowed: &[Algorithm] = match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => RSA_FAMILY,
        AlgorithmParameters::EllipticCurve(params) => match params.curve {
            EllipticCurve::P256 => &[Algorithm::ES256],
            EllipticCurve::P384 => &[Algorithm::ES384],
            _ => &[],
        },
        AlgorithmParameters::OctetKeyPair(_) => &[Algorithm::EdDSA],
        // Symmetric keys never come from a public key set.
        AlgorithmParameters::OctetKey(_) => &[],
    };

    if !allowed.contains(&hinted) {
        return None;
    }

    // A key that pins its algorithm must be used with exactly that one.
    match &jwk.common.key_algorithm {
        Some(pinned) => (signing_algorithm(pinned) == Some(hinted)).then_some(hinted),
        None => Some(hinted),
    }
}

// Key-management algorithms (RSA-OAEP etc.) never verify a signature.
fn signing_algorithm(key_algorithm: &KeyAlgorithm) -> Option<Algorithm> {
    let algorithm = match key_algorithm {
        KeyAlgorithm::HS256 => Algorithm::HS256,
        KeyAlgorithm::HS384 => Algorithm::HS384,
        KeyAlgorithm::HS512 => Algorithm::HS512,
        KeyAlgorithm::ES256 => Algorithm::ES256,
        KeyAlgorithm::ES384 => Algorithm::ES384,
        KeyAlgorithm::RS256 => Algorithm::RS256,
        KeyAlgorithm::RS384 => Algorithm::RS384,
        KeyAlgorithm::RS512 => Algorithm::RS512,
        KeyAlgorithm::PS256 => Algorithm::PS256,
        KeyAlgorithm::PS384 => Algorithm::PS384,
        KeyAlgorithm::PS512 => Algorithm::PS512,
        KeyAlgorithm::EdDSA => Algorithm::EdDSA,
        _ => return None,
    };
    Some(algorithm)
}

// Signature and algorithm only; claims are checked by `check_claims` in a fixed order.
fn signature_only(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::InvalidToken => TokenError::ParseFailed(MALFORMED_HEADER),
        ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::ParseFailed(MALFORMED_PAYLOAD)
        }
        ErrorKind::InvalidAlgorithm => {
            TokenError::KeyNotFound("algorithm does not match key".to_string())
        }
        other => {
            debug!(error = ?other, "token verification failed");
            TokenError::SignatureInvalid
        }
    }
}

fn check_claims(
    mut raw: RawClaims,
    issuer: &str,
    audience: Option<&str>,
    now: i64,
    leeway: i64,
) -> ValidationOutcome {
    let iss = match raw.iss.as_deref() {
        Some(iss) if iss == issuer => iss.to_string(),
        _ => return Err(TokenError::IssuerMismatch),
    };

    let aud = raw.aud.take().map(Audience::into_vec).unwrap_or_default();
    if let Some(expected) = audience
        && !aud.iter().any(|a| a == expected)
    {
        return Err(TokenError::AudienceMismatch);
    }

    // exp must be strictly in the future
    let exp = match raw.exp {
        Some(exp) if exp.saturating_add(leeway) > now => exp,
        _ => return Err(TokenError::Expired),
    };

    if raw.iat.is_some_and(|iat| iat.saturating_sub(leeway) > now) {
        return Err(TokenError::NotYetValid("iat"));
    }
    if raw.nbf.is_some_and(|nbf| nbf.saturating_sub(leeway) > now) {
        return Err(TokenError::NotYetValid("nbf"));
    }

    Ok(raw.into_claims(iss, exp, aud))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "https://issuer.example";

    fn raw(value: serde_json::Value) -> RawClaims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn claim_checks_run_in_fixed_order() {
        // Everything is wrong; issuer is reported first.
        let err = check_claims(
            raw(serde_json::json!({"iss": "invalid", "aud": "x", "exp": 1, "iat": 500})),
            ISSUER,
            Some("audience"),
            100,
            0,
        )
        .unwrap_err();
        assert_eq!(err, TokenError::IssuerMismatch);

        let err = check_claims(
            raw(serde_json::json!({"iss": ISSUER, "aud": "x", "exp": 1, "iat": 500})),
            ISSUER,
            Some("audience"),
            100,
            0,
        )
        .unwrap_err();
        assert_eq!(err, TokenError::AudienceMismatch);

        let err = check_claims(
            raw(serde_json::json!({"iss": ISSUER, "aud": "audience", "exp": 1, "iat": 500})),
            ISSUER,
            Some("audience"),
            100,
            0,
        )
        .unwrap_err();
        assert_eq!(err, TokenError::Expired);

        let err = check_claims(
            raw(serde_json::json!({"iss": ISSUER, "aud": "audience", "exp": 1000, "iat": 500})),
            ISSUER,
            Some("audience"),
            100,
            0,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "iat not satisfied");
    }

    #[test]
    fn exp_equal_to_now_is_expired() {
        let err = check_claims(
            raw(serde_json::json!({"iss": ISSUER, "exp": 100})),
            ISSUER,
            None,
            100,
            0,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "exp not satisfied");
    }

    #[test]
    fn missing_exp_is_expired_and_missing_iss_mismatches() {
        assert_eq!(
            check_claims(raw(serde_json::json!({"iss": ISSUER})), ISSUER, None, 100, 0)
                .unwrap_err(),
            TokenError::Expired
        );
        assert_eq!(
            check_claims(raw(serde_json::json!({"exp": 1000})), ISSUER, None, 100, 0)
                .unwrap_err(),
            TokenError::IssuerMismatch
        );
    }

    #[test]
    fn audience_is_skipped_when_not_configured() {
        let claims = check_claims(
            raw(serde_json::json!({"iss": ISSUER, "exp": 1000, "sub": "user-1"})),
            ISSUER,
            None,
            100,
            0,
        )
        .unwrap();
        assert_eq!(claims.subject(), Some("user-1"));
        assert!(claims.audience().is_empty());
    }

    #[test]
    fn future_nbf_is_not_yet_valid() {
        let err = check_claims(
            raw(serde_json::json!({"iss": ISSUER, "exp": 1000, "nbf": 200})),
            ISSUER,
            None,
            100,
            0,
        )
        .unwrap_err();
        assert_eq!(err, TokenError::NotYetValid("nbf"));
    }

    #[test]
    fn leeway_widens_time_checks() {
        let claims = check_claims(
            raw(serde_json::json!({"iss": ISSUER, "exp": 95, "iat": 105})),
            ISSUER,
            None,
            100,
            10,
        )
        .unwrap();
        assert_eq!(claims.expiration(), 95);
    }

    #[test]
    fn algorithm_is_inferred_from_key_type() {
        let rsa: Jwk = serde_json::from_value(serde_json::json!({
            "kty": "RSA", "kid": "r", "n": "sXIbZZihSuTziqsn", "e": "AQAB"
        }))
        .unwrap();
        assert_eq!(infer_algorithm(&rsa, Algorithm::RS256), Some(Algorithm::RS256));
        assert_eq!(infer_algorithm(&rsa, Algorithm::HS256), None);
        assert_eq!(infer_algorithm(&rsa, Algorithm::ES256), None);

        let pinned: Jwk = serde_json::from_value(serde_json::json!({
            "kty": "RSA", "kid": "r", "alg": "RS256", "n": "sXIbZZihSuTziqsn", "e": "AQAB"
        }))
        .unwrap();
        assert_eq!(infer_algorithm(&pinned, Algorithm::RS512), None);
        assert_eq!(infer_algorithm(&pinned, Algorithm::RS256), Some(Algorithm::RS256));

        let encryption_key: Jwk = serde_json::from_value(serde_json::json!({
            "kty": "RSA", "kid": "r", "alg": "RSA-OAEP", "n": "sXIbZZihSuTziqsn", "e": "AQAB"
        }))
        .unwrap();
        assert_eq!(infer_algorithm(&encryption_key, Algorithm::RS256), None);

        let okp: Jwk = serde_json::from_value(serde_json::json!({
            "kty": "OKP", "crv": "Ed25519", "kid": "e", "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"
        }))
        .unwrap();
        assert_eq!(infer_algorithm(&okp, Algorithm::EdDSA), Some(Algorithm::EdDSA));
        assert_eq!(infer_algorithm(&okp, Algorithm::RS256), None);
    }
}
