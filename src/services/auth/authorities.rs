//! Claims → authorities conversion.
//!
//! The gate never decides what a claim means; it asks an injected
//! `ClaimsToAuthorities` strategy. Plain closures work too:
//!
//! ```ignore
//! let converter = |claims: &TokenClaims| BTreeSet::from([format!("USER_{}", claims.sub)]);
//! let gate = AccessGate::new(config, Arc::new(converter))?;
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::services::auth::principal::TokenClaims;

pub trait ClaimsToAuthorities: Send + Sync {
    fn convert(&self, claims: &TokenClaims) -> BTreeSet<String>;
}

impl<F> ClaimsToAuthorities for F
where
    F: Fn(&TokenClaims) -> BTreeSet<String> + Send + Sync,
{
    fn convert(&self, claims: &TokenClaims) -> BTreeSet<String> {
        self(claims)
    }
}

/// OAuth2 scopes (`scope` / `scp`) as `SCOPE_<scope>` authorities.
#[derive(Debug, Clone)]
pub struct ScopeAuthorities {
    // None: try `scope`, then `scp`
    claim_name: Option<String>,
    prefix: String,
    delimiter: String,
}

impl Default for ScopeAuthorities {
    fn default() -> Self {
        Self {
            claim_name: None,
            prefix: "SCOPE_".to_string(),
            delimiter: " ".to_string(),
        }
    }
}

impl ScopeAuthorities {
    pub fn with_claim_name(mut self, name: impl Into<String>) -> Self {
        self.claim_name = Some(name.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    fn source<'a>(&self, claims: &'a TokenClaims) -> Option<&'a Value> {
        match &self.claim_name {
            Some(name) => claims.claim(name),
            None => ["scope", "scp"]
                .iter()
                .find_map(|name| claims.claim(name).filter(|v| has_content(v))),
        }
    }
}

impl ClaimsToAuthorities for ScopeAuthorities {
    fn convert(&self, claims: &TokenClaims) -> BTreeSet<String> {
        let Some(value) = self.source(claims) else {
            return BTreeSet::new();
        };

        let raw: Vec<&str> = match value {
            Value::String(s) => s.split(self.delimiter.as_str()).collect(),
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };

        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("{}{}", self.prefix, s))
            .collect()
    }
}

/// Keycloak-style roles: `realm_access.roles` and, when a client id is set,
/// `resource_access.<client>.roles`, as `ROLE_<role>` authorities.
#[derive(Debug, Clone)]
pub struct RealmRoleAuthorities {
    client_id: Option<String>,
    prefix: String,
}

impl Default for RealmRoleAuthorities {
    fn default() -> Self {
        Self {
            client_id: None,
            prefix: "ROLE_".to_string(),
        }
    }
}

impl RealmRoleAuthorities {
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl ClaimsToAuthorities for RealmRoleAuthorities {
    fn convert(&self, claims: &TokenClaims) -> BTreeSet<String> {
        let realm = claims
            .claim("realm_access")
            .and_then(|v| v.get("roles"));

        let client = self.client_id.as_deref().and_then(|id| {
            claims
                .claim("resource_access")
                .and_then(|v| v.get(id))
                .and_then(|v| v.get("roles"))
        });

        [realm, client]
            .into_iter()
            .flatten()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|role| format!("{}{}", self.prefix, role.trim()))
            .collect()
    }
}

/// Union of several strategies.
#[derive(Clone, Default)]
pub struct CompositeAuthorities {
    converters: Vec<Arc<dyn ClaimsToAuthorities>>,
}

impl CompositeAuthorities {
    pub fn new(converters: Vec<Arc<dyn ClaimsToAuthorities>>) -> Self {
        Self { converters }
    }

    pub fn push(&mut self, converter: Arc<dyn ClaimsToAuthorities>) {
        self.converters.push(converter);
    }
}

impl ClaimsToAuthorities for CompositeAuthorities {
    fn convert(&self, claims: &TokenClaims) -> BTreeSet<String> {
        self.converters
            .iter()
            .flat_map(|c| c.convert(claims))
            .collect()
    }
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}
