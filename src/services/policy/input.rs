use std::fmt;

use serde::Serialize;

use crate::services::token::RawToken;

/// Input document handed to the policy evaluator.
///
/// Exactly these three fields; the raw token is passed through untouched so the
/// policy, not this crate, decides what to read from it.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PolicyInput {
    token: String,
    method: String,
    path: String,
}

impl PolicyInput {
    pub fn build(token: &RawToken, method: &str, path: &str) -> Self {
        Self {
            token: token.as_str().to_string(),
            method: method.to_string(),
            path: path.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for PolicyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyInput")
            .field("token", &format_args!("<{} bytes>", self.token.len()))
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}
