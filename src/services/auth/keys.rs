//! Trusted signing keys for access-token verification.
//!
//! Key material is loaded once at startup and never printed.

use std::fmt;

use std::str::FromStr;

use jsonwebtoken::{
    Algorithm, DecodingKey,
    jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, PublicKeyUse},
};

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("symmetric algorithm {0:?} is not accepted for access tokens")]
    SymmetricAlgorithm(Algorithm),
    #[error("invalid public key pem: {0}")]
    InvalidPem(jsonwebtoken::errors::Error),
    #[error("invalid jwk (kid={kid:?}): {source}")]
    InvalidJwk {
        kid: Option<String>,
        source: jsonwebtoken::errors::Error,
    },
    #[error("no usable signing keys")]
    Empty,
}

/// Where the verifier gets its public keys from.
#[derive(Clone)]
pub enum KeySource {
    /// A single public key in PEM (SPKI) form.
    Pem(String),
    /// A JWK set, keys selected by `kid`.
    JwkSet(JwkSet),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pem(_) => f.write_str("KeySource::Pem(..)"),
            Self::JwkSet(set) => write!(f, "KeySource::JwkSet({} keys)", set.keys.len()),
        }
    }
}

struct TrustedKey {
    kid: Option<String>,
    key: DecodingKey,
}

/// Decoding keys for one algorithm.
pub struct KeyRing {
    keys: Vec<TrustedKey>,
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kids: Vec<_> = self.keys.iter().map(|k| k.kid.as_deref()).collect();
        f.debug_struct("KeyRing").field("kids", &kids).finish()
    }
}

impl KeyRing {
    pub fn load(source: &KeySource, algorithm: Algorithm) -> Result<Self, KeyError> {
        if matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(KeyError::SymmetricAlgorithm(algorithm));
        }

        let keys = match source {
            KeySource::Pem(pem) => vec![TrustedKey {
                kid: None,
                key: decoding_key_from_pem(pem, algorithm)?,
            }],
            KeySource::JwkSet(set) => set
                .keys
                .iter()
                .filter(|jwk| {
                    let usable = verifies(jwk, algorithm);
                    if !usable {
                        tracing::debug!(
                            kid = ?jwk.common.key_id,
                            ?algorithm,
                            "skipping jwk that cannot verify the configured algorithm"
                        );
                    }
                    usable
                })
                .map(|jwk| {
                    let kid = jwk.common.key_id.clone();
                    DecodingKey::from_jwk(jwk)
                        .map(|key| TrustedKey {
                            kid: kid.clone(),
                            key,
                        })
                        .map_err(|source| KeyError::InvalidJwk { kid, source })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        if keys.is_empty() {
            return Err(KeyError::Empty);
        }

        Ok(Self { keys })
    }

    /// Candidate keys for a token header `kid`.
    ///
    /// - `Some(kid)`: the key with that id, plus any key loaded without one
    ///   (a single PEM key has no id)
    /// - `None`: every key, in load order
    pub fn candidates<'a>(&'a self, kid: Option<&'a str>) -> impl Iterator<Item = &'a DecodingKey> + 'a {
        self.keys
            .iter()
            .filter(move |k| match kid {
                Some(kid) => k.kid.as_deref().is_none_or(|own| own == kid),
                None => true,
            })
            .map(|k| &k.key)
    }
}

/// Whether a JWK can check signatures made with `algorithm`.
///
/// Encryption keys, keys of another family or curve, and keys pinned to a
/// different `alg` are all unusable.
fn verifies(jwk: &Jwk, algorithm: Algorithm) -> bool {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return false;
    }
    if let Some(pinned) = jwk.common.key_algorithm
        && Algorithm::from_str(&pinned.to_string()).ok() != Some(algorithm)
    {
        return false;
    }

    match (&jwk.algorithm, algorithm) {
        (AlgorithmParameters::OctetKeyPair(okp), Algorithm::EdDSA) => {
            okp.curve == EllipticCurve::Ed25519
        }
        (AlgorithmParameters::EllipticCurve(ec), Algorithm::ES256) => {
            ec.curve == EllipticCurve::P256
        }
        (AlgorithmParameters::EllipticCurve(ec), Algorithm::ES384) => {
            ec.curve == EllipticCurve::P384
        }
        (
            AlgorithmParameters::RSA(_),
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512,
        ) => true,
        _ => false,
    }
}

fn decoding_key_from_pem(pem: &str, algorithm: Algorithm) -> Result<DecodingKey, KeyError> {
    let bytes = pem.as_bytes();
    let key = match algorithm {
        Algorithm::EdDSA => DecodingKey::from_ed_pem(bytes),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(bytes),
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(bytes),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Err(KeyError::SymmetricAlgorithm(algorithm));
        }
    };
    key.map_err(KeyError::InvalidPem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jwk_set(value: serde_json::Value) -> JwkSet {
        serde_json::from_value(value).unwrap()
    }

    const X: &str = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";
    const RSA_N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    #[test]
    fn hs256_is_rejected() {
        let err = KeyRing::load(&KeySource::Pem(String::new()), Algorithm::HS256).unwrap_err();
        assert!(matches!(err, KeyError::SymmetricAlgorithm(Algorithm::HS256)));
    }

    #[test]
    fn garbage_pem_is_rejected() {
        let err = KeyRing::load(&KeySource::Pem("nope".into()), Algorithm::EdDSA).unwrap_err();
        assert!(matches!(err, KeyError::InvalidPem(_)));
    }

    #[test]
    fn jwk_candidates_follow_kid() {
        let ring = KeyRing::load(
            &KeySource::JwkSet(jwk_set(json!({
                "keys": [
                    { "kty": "OKP", "crv": "Ed25519", "x": X, "kid": "a" },
                    { "kty": "OKP", "crv": "Ed25519", "x": X, "kid": "b" }
                ]
            }))),
            Algorithm::EdDSA,
        )
        .unwrap();

        assert_eq!(ring.candidates(Some("a")).count(), 1);
        assert_eq!(ring.candidates(Some("zzz")).count(), 0);
        assert_eq!(ring.candidates(None).count(), 2);
    }

    #[test]
    fn keys_of_another_family_are_skipped() {
        let ring = KeyRing::load(
            &KeySource::JwkSet(jwk_set(json!({
                "keys": [
                    { "kty": "RSA", "n": RSA_N, "e": "AQAB", "kid": "rsa1" },
                    { "kty": "OKP", "crv": "Ed25519", "x": X, "kid": "ed" }
                ]
            }))),
            Algorithm::EdDSA,
        )
        .unwrap();

        assert_eq!(ring.candidates(Some("rsa1")).count(), 0);
        assert_eq!(ring.candidates(Some("ed")).count(), 1);
        assert_eq!(ring.candidates(None).count(), 1);
    }

    #[test]
    fn key_pinned_to_another_alg_is_skipped() {
        let err = KeyRing::load(
            &KeySource::JwkSet(jwk_set(json!({
                "keys": [{ "kty": "RSA", "n": RSA_N, "e": "AQAB", "alg": "RS512" }]
            }))),
            Algorithm::RS256,
        )
        .unwrap_err();
        assert!(matches!(err, KeyError::Empty));
    }

    #[test]
    fn hs256_is_rejected_for_jwk_sets_too() {
        let err = KeyRing::load(
            &KeySource::JwkSet(jwk_set(json!({ "keys": [] }))),
            Algorithm::HS256,
        )
        .unwrap_err();
        assert!(matches!(err, KeyError::SymmetricAlgorithm(Algorithm::HS256)));
    }

    #[test]
    fn encryption_keys_are_skipped() {
        let err = KeyRing::load(
            &KeySource::JwkSet(jwk_set(json!({
                "keys": [{ "kty": "OKP", "crv": "Ed25519", "x": X, "use": "enc" }]
            }))),
            Algorithm::EdDSA,
        )
        .unwrap_err();
        assert!(matches!(err, KeyError::Empty));
    }
}
