use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::auth::Principal;

/// What the gate derived from the caller's token.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject: String,
    pub authorities: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Principal> for MeResponse {
    fn from(p: Principal) -> Self {
        Self {
            subject: p.subject,
            authorities: p.authorities,
            issuer: p.issuer,
            expires_at: p.expires_at,
        }
    }
}
