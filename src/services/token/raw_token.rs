use std::fmt;

/// Compact JWS string exactly as presented by the caller. Never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct RawToken(String);

impl RawToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print credentials
        f.debug_tuple("RawToken")
            .field(&format_args!("<{} bytes>", self.0.len()))
            .finish()
    }
}

impl From<&str> for RawToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}
