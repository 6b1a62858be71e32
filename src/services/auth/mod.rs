pub mod authorities;
pub mod error;
pub mod factory;
pub mod gate;
pub mod keys;
pub mod principal;
pub mod verifier;

pub use authorities::{
    ClaimsToAuthorities, CompositeAuthorities, RealmRoleAuthorities, ScopeAuthorities,
};
pub use error::AuthError;
pub use factory::build_access_gate;
pub use gate::{AccessGate, AuthDecision};
pub use keys::KeySource;
pub use principal::{Principal, TokenClaims};
pub use verifier::GateConfig;
