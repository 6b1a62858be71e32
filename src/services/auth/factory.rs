/// Factory: build `AccessGate` from application `Config`.
use std::sync::Arc;

use crate::config::{AuthoritySource, Config};
use crate::services::auth::{
    AccessGate, ClaimsToAuthorities, CompositeAuthorities, RealmRoleAuthorities, ScopeAuthorities,
    keys::KeyError,
};

pub fn build_access_gate(config: &Config) -> Result<Arc<AccessGate>, KeyError> {
    let gate = AccessGate::new(&config.gate_config(), build_authorities(config))?;
    Ok(Arc::new(gate))
}

pub fn build_authorities(config: &Config) -> Arc<dyn ClaimsToAuthorities> {
    let mut composite = CompositeAuthorities::default();

    for source in &config.auth_authorities {
        match source {
            AuthoritySource::Scope => {
                let mut scopes = ScopeAuthorities::default();
                if let Some(prefix) = &config.auth_authority_prefix {
                    scopes = scopes.with_prefix(prefix.clone());
                }
                composite.push(Arc::new(scopes));
            }
            AuthoritySource::RealmRoles => {
                let mut roles = RealmRoleAuthorities::default();
                if let Some(client_id) = &config.auth_client_id {
                    roles = roles.with_client_id(client_id.clone());
                }
                composite.push(Arc::new(roles));
            }
        }
    }

    Arc::new(composite)
}
