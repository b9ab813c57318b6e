//! `Authorization: Bearer <token>` extraction.
use crate::services::token::{RawToken, TokenError};

/// Extract the token from an `Authorization` header value.
///
/// A missing header, a header without a space, a non-Bearer scheme, or an empty
/// token is a parse failure, never a panic.
pub fn bearer_token(header: Option<&str>) -> Result<RawToken, TokenError> {
    let header = header
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(TokenError::ParseFailed("missing Authorization header"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(TokenError::ParseFailed("Authorization must be a Bearer token"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::ParseFailed("Authorization must be a Bearer token"));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::ParseFailed("bearer token is empty"));
    }

    Ok(RawToken::new(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_second_field() {
        assert_eq!(bearer_token(Some("Bearer a.b.c")).unwrap().as_str(), "a.b.c");
        assert_eq!(bearer_token(Some("bearer  a.b.c ")).unwrap().as_str(), "a.b.c");
    }

    #[test]
    fn malformed_headers_are_parse_failures() {
        for header in [None, Some(""), Some("Bearer"), Some("Bearer   "), Some("Basic dXNlcjpwYXNz"), Some("a.b.c")] {
            let err = bearer_token(header).unwrap_err();
            assert!(matches!(err, TokenError::ParseFailed(_)), "{header:?}");
        }
    }
}
