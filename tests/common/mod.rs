//! Shared helpers: Ed25519 test keys, signed tokens, config and router.
#![allow(dead_code, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use ed25519_dalek::SigningKey;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{EncodePrivateKey, EncodePublicKey};
use jsonwebtoken::{Algorithm, EncodingKey, Header, jwk::JwkSet};
use rand_core::OsRng;
use serde_json::{Value, json};

use user_resource_server::{
    app,
    config::Config,
    repos::MemoryUserRepository,
    services::auth::{AccessGate, GateConfig, KeySource, build_access_gate},
    state::AppState,
};

pub const ISSUER: &str = "https://idp.example.com/realms/tasks";
pub const AUDIENCE: &str = "task-api";

/// An Ed25519 key pair standing in for the identity provider.
pub struct TestKey {
    pub kid: String,
    signing: SigningKey,
}

impl TestKey {
    pub fn generate(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    fn public_bytes(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// PKCS#8 DER of the private key, as `EncodingKey::from_ed_der` takes it.
    fn pkcs8_der(&self) -> Vec<u8> {
        self.signing
            .to_pkcs8_der()
            .expect("encode pkcs8")
            .as_bytes()
            .to_vec()
    }

    /// SubjectPublicKeyInfo PEM of the public key.
    pub fn public_pem(&self) -> String {
        self.signing
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("encode spki pem")
    }

    pub fn jwk(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": URL_SAFE_NO_PAD.encode(self.public_bytes()),
            "kid": self.kid,
            "use": "sig",
            "alg": "EdDSA",
        })
    }

    /// Sign arbitrary claims; `kid` goes into the header.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        let key = EncodingKey::from_ed_der(&self.pkcs8_der());
        jsonwebtoken::encode(&header, claims, &key).expect("failed to sign test token")
    }

    pub fn sign_without_kid(&self, claims: &Value) -> String {
        let header = Header::new(Algorithm::EdDSA);
        let key = EncodingKey::from_ed_der(&self.pkcs8_der());
        jsonwebtoken::encode(&header, claims, &key).expect("failed to sign test token")
    }
}

pub fn jwk_set(keys: &[&TestKey]) -> JwkSet {
    let keys: Vec<Value> = keys.iter().map(|k| k.jwk()).collect();
    serde_json::from_value(json!({ "keys": keys })).expect("valid jwk set")
}

/// Claims of a valid token, one hour left.
pub fn valid_claims(sub: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": sub,
        "iat": now,
        "exp": now + 3600,
        "jti": uuid::Uuid::new_v4().to_string(),
        "scope": "tasks:read tasks:write",
        "realm_access": { "roles": ["user"] },
    })
}

/// Copy of `claims` with `changes` merged over it (`null` removes a claim).
pub fn with(claims: &Value, changes: Value) -> Value {
    let mut out = claims.clone();
    if let (Some(out), Some(changes)) = (out.as_object_mut(), changes.as_object()) {
        for (k, v) in changes {
            if v.is_null() {
                out.remove(k);
            } else {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    out
}

pub fn gate_config(keys: KeySource) -> GateConfig {
    GateConfig {
        issuer: ISSUER.to_string(),
        audience: Some(AUDIENCE.to_string()),
        leeway_seconds: 0,
        algorithm: Algorithm::EdDSA,
        keys,
    }
}

pub fn test_config(key: &TestKey) -> Config {
    let pem = key.public_pem();
    let vars: HashMap<&str, String> = HashMap::from([
        ("AUTH_ISSUER", ISSUER.to_string()),
        ("AUTH_AUDIENCE", AUDIENCE.to_string()),
        ("ACCESS_TOKEN_LEEWAY_SECONDS", "0".to_string()),
        ("ACCESS_JWT_PUBLIC_KEY_PEM", pem),
    ]);
    Config::from_lookup(|k| vars.get(k).cloned()).expect("valid test config")
}

pub fn test_gate(key: &TestKey) -> Arc<AccessGate> {
    build_access_gate(&test_config(key)).expect("gate builds")
}

/// Full router (all middleware) over an in-memory user store.
pub fn test_router(key: &TestKey) -> Router {
    let config = test_config(key);
    let gate = build_access_gate(&config).expect("gate builds");
    let state = AppState::new(gate, Arc::new(MemoryUserRepository::new()));
    app::build_router(state, &config)
}
