/*
 * Responsibility
 * - Token claims as decoded from a verified JWT
 * - Principal: the authenticated identity handed to handlers for one request
 */
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims of a verified access token.
///
/// Registered claims are typed; everything else (scope, scp, realm_access,
/// custom claims) stays in `other` so authority converters can read it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iss: Option<String>,
    // string or array, checked by jsonwebtoken when an audience is configured
    #[serde(default)]
    pub aud: Value,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TokenClaims {
    /// Look up a non-registered claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.other.get(name)
    }
}

/// The authenticated caller bound to the current request.
///
/// Inserted into request extensions by the access middleware; handlers get it
/// through `CurrentPrincipal`.
#[derive(Debug, Clone)]
pub struct Principal {
    pub subject: String,
    pub authorities: BTreeSet<String>,
    pub issuer: Option<String>,
    pub token_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub claims: TokenClaims,
}

impl Principal {
    pub fn from_claims(claims: TokenClaims, authorities: BTreeSet<String>) -> Self {
        Self {
            subject: claims.sub.clone(),
            authorities,
            issuer: claims.iss.clone(),
            token_id: claims.jti.clone(),
            expires_at: DateTime::from_timestamp(claims.exp, 0),
            claims,
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}
