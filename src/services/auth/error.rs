use thiserror::Error;

/// Why the access gate refused a request.
///
/// Every variant is terminal for the request; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer ...` header at all (or a different scheme).
    #[error("missing bearer token")]
    MissingCredential,
    #[error("malformed bearer token: {0}")]
    MalformedCredential(&'static str),
    /// Signature did not verify against any trusted key.
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid token claims: {0}")]
    InvalidClaims(String),
}

impl AuthError {
    /// RFC 6750 error code for the `WWW-Authenticate` challenge.
    pub fn bearer_error_code(&self) -> Option<&'static str> {
        match self {
            Self::MissingCredential => None,
            Self::MalformedCredential(_) => Some("invalid_request"),
            Self::InvalidSignature | Self::Expired | Self::InvalidClaims(_) => {
                Some("invalid_token")
            }
        }
    }

    /// Value for the `WWW-Authenticate` response header.
    pub fn challenge(&self) -> String {
        match self.bearer_error_code() {
            None => "Bearer".to_string(),
            Some(code) => {
                // Quotes would break the auth-param syntax.
                let description = self.to_string().replace('"', "'");
                format!("Bearer error=\"{code}\", error_description=\"{description}\"")
            }
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
