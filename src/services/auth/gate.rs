//! The access gate: bearer token in, `Principal` (or a refusal) out.
//!
//! Stateless per request. The only shared data is the immutable key ring,
//! validation rules and authority converter, so one `Arc<AccessGate>` serves
//! every request concurrently.

use std::sync::Arc;

use axum::http::{HeaderMap, header};

use crate::services::auth::authorities::ClaimsToAuthorities;
use crate::services::auth::error::AuthError;
use crate::services::auth::keys::KeyError;
use crate::services::auth::principal::Principal;
use crate::services::auth::verifier::{GateConfig, TokenVerifier};

/// Outcome of gating one request.
pub type AuthDecision = Result<Principal, AuthError>;

pub struct AccessGate {
    verifier: TokenVerifier,
    authorities: Arc<dyn ClaimsToAuthorities>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    pub fn new(
        config: &GateConfig,
        authorities: Arc<dyn ClaimsToAuthorities>,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            verifier: TokenVerifier::new(config)?,
            authorities,
        })
    }

    /// Authenticate a request from its headers.
    pub fn authorize(&self, headers: &HeaderMap) -> AuthDecision {
        let token = bearer_token(headers)?;
        self.authorize_token(token)
    }

    /// Authenticate a raw bearer token (already stripped of the scheme).
    pub fn authorize_token(&self, token: &str) -> AuthDecision {
        let claims = self.verifier.verify(token)?;
        let authorities = self.authorities.convert(&claims);
        Ok(Principal::from_claims(claims, authorities))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// A missing header or another scheme (Basic, DPoP, ...) means "no bearer
/// credential"; a Bearer header with an unusable value is malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredential)?;

    let (scheme, rest) = value.split_once(' ').unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredential);
    }

    let token = rest.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedCredential("empty bearer token"));
    }
    if !is_token68(token) {
        return Err(AuthError::MalformedCredential("bearer token has invalid characters"));
    }

    Ok(token)
}

// RFC 6750 b64token: 1*( ALPHA / DIGIT / "-" / "." / "_" / "~" / "+" / "/" ) *"="
fn is_token68(token: &str) -> bool {
    let body = token.trim_end_matches('=');
    !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'+' | b'/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn no_header_is_missing() {
        assert_eq!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn other_scheme_is_missing() {
        assert_eq!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("BEARER abc")), Ok("abc"));
    }

    #[test]
    fn bare_scheme_is_malformed() {
        assert!(matches!(
            bearer_token(&headers("Bearer")),
            Err(AuthError::MalformedCredential(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer    ")),
            Err(AuthError::MalformedCredential(_))
        ));
    }

    #[test]
    fn illegal_characters_are_malformed() {
        assert!(matches!(
            bearer_token(&headers("Bearer a b")),
            Err(AuthError::MalformedCredential(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer ===")),
            Err(AuthError::MalformedCredential(_))
        ));
    }

    #[test]
    fn padding_is_allowed() {
        assert_eq!(bearer_token(&headers("Bearer abc==")), Ok("abc=="));
    }
}
