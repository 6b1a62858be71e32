use jsonwebtoken::{Algorithm, Validation, errors::ErrorKind};
use tracing::debug;

use crate::services::auth::error::{AuthError, AuthResult};
use crate::services::auth::keys::{KeyError, KeyRing, KeySource};
use crate::services::auth::principal::TokenClaims;

/// Everything the gate needs to trust a token, passed in explicitly.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub issuer: String,
    // None: `aud` is not checked
    pub audience: Option<String>,
    pub leeway_seconds: u64,
    pub algorithm: Algorithm,
    pub keys: KeySource,
}

/// Signature + registered-claim verification for access tokens.
///
/// Order of checks is fixed: header, key lookup, signature, then claims
/// (`exp`, `nbf`, `iss`, `aud`, `sub`). A token with a bad signature is
/// always `InvalidSignature`, even if it is also expired.
pub struct TokenVerifier {
    keys: KeyRing,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("keys", &self.keys)
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(config: &GateConfig) -> Result<Self, KeyError> {
        let keys = KeyRing::load(&config.keys, config.algorithm)?;

        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[config.issuer.as_str()]);
        match &config.audience {
            Some(aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.validate_nbf = true;
        validation.leeway = config.leeway_seconds;

        Ok(Self { keys, validation })
    }

    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            debug!(error = %e, "undecodable token header");
            AuthError::MalformedCredential("token is not a valid JWT")
        })?;

        let mut tried = 0usize;
        for key in self.keys.candidates(header.kid.as_deref()) {
            tried += 1;
            match jsonwebtoken::decode::<TokenClaims>(token, key, &self.validation) {
                Ok(data) => return check_subject(data.claims),
                // wrong key; try the next one
                Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => continue,
                // signature matched (or alg refused), classification is final
                Err(e) => return Err(classify(e.kind())),
            }
        }

        if tried == 0 {
            debug!(kid = ?header.kid, "no trusted key for token kid");
        }
        Err(AuthError::InvalidSignature)
    }
}

fn check_subject(claims: TokenClaims) -> AuthResult<TokenClaims> {
    if claims.sub.trim().is_empty() {
        return Err(AuthError::InvalidClaims("empty 'sub' claim".into()));
    }
    Ok(claims)
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidIssuer => AuthError::InvalidClaims("unexpected 'iss'".into()),
        ErrorKind::InvalidAudience => AuthError::InvalidClaims("unexpected 'aud'".into()),
        ErrorKind::InvalidSubject => AuthError::InvalidClaims("unexpected 'sub'".into()),
        ErrorKind::ImmatureSignature => AuthError::InvalidClaims("token not yet valid".into()),
        ErrorKind::MissingRequiredClaim(name) => {
            AuthError::InvalidClaims(format!("missing '{name}' claim"))
        }
        ErrorKind::Json(_) => AuthError::InvalidClaims("unreadable claims".into()),
        _ => AuthError::MalformedCredential("token is not a valid JWT"),
    }
}
