//! Failure taxonomy for the authorization pipeline.
use thiserror::Error;

/// Detail used when the compact token cannot be split or its header cannot be decoded.
pub const MALFORMED_HEADER: &str = "invalid segment or invalid character in encoded header";
/// Detail used when the header is fine but the payload cannot be decoded.
pub const MALFORMED_PAYLOAD: &str = "invalid character in encoded payload";

/// Every way a request can fail to be authorized, for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ParseFailed,
    KeyNotFound,
    SignatureInvalid,
    IssuerMismatch,
    AudienceMismatch,
    Expired,
    NotYetValid,
    PolicyEvaluationError,
    FetchFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseFailed => "parse_failed",
            Self::KeyNotFound => "key_not_found",
            Self::SignatureInvalid => "signature_invalid",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::AudienceMismatch => "audience_mismatch",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::PolicyEvaluationError => "policy_evaluation_error",
            Self::FetchFailed => "fetch_failed",
        }
    }
}

/// Why a bearer token was rejected.
///
/// The `Display` output is the human-readable detail of the violated check; the
/// claim-check strings are stable and asserted on by tests and log queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("failed to parse token: {0}")]
    ParseFailed(&'static str),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("\"iss\" not satisfied: values do not match")]
    IssuerMismatch,

    #[error("aud not satisfied")]
    AudienceMismatch,

    #[error("exp not satisfied")]
    Expired,

    // Carries the claim that is in the future (`iat` or `nbf`).
    #[error("{0} not satisfied")]
    NotYetValid(&'static str),
}

impl TokenError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ParseFailed(_) => FailureKind::ParseFailed,
            Self::KeyNotFound(_) => FailureKind::KeyNotFound,
            Self::SignatureInvalid => FailureKind::SignatureInvalid,
            Self::IssuerMismatch => FailureKind::IssuerMismatch,
            Self::AudienceMismatch => FailureKind::AudienceMismatch,
            Self::Expired => FailureKind::Expired,
            Self::NotYetValid(_) => FailureKind::NotYetValid,
        }
    }
}
