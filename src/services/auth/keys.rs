//! Key resolution: which secret verifies a token signed with a given algorithm.
//!
//! Sources are consulted in a fixed order, first match wins:
//! 1. the static secret, when its algorithm matches (case-insensitive)
//! 2. the secret resolver, for any algorithm
//!
//! When neither yields, resolution fails with a `KeyError` naming the algorithm.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey};

use crate::error::KeyError;

/// Multi-algorithm secret provider.
///
/// Trusted as a black box: an unknown algorithm should yield an empty secret, which
/// then fails signature verification rather than key resolution.
pub trait SecretResolver: Send + Sync + 'static {
    /// Algorithms this provider signs with. Becomes the accepted-algorithm list when no
    /// static algorithm is configured.
    fn algorithms(&self) -> Vec<String>;

    fn secret(&self, algorithm: &str) -> String;
}

/// Fixed algorithm → secret table.
#[derive(Clone, Default)]
pub struct StaticSecrets {
    secrets: HashMap<String, String>,
}

impl fmt::Debug for StaticSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        let mut algorithms: Vec<&String> = self.secrets.keys().collect();
        algorithms.sort();
        f.debug_struct("StaticSecrets")
            .field("algorithms", &algorithms)
            .finish()
    }
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, algorithm: impl Into<String>, secret: impl Into<String>) -> Self {
        self.insert(algorithm, secret);
        self
    }

    pub fn insert(&mut self, algorithm: impl Into<String>, secret: impl Into<String>) {
        self.secrets
            .insert(algorithm.into().to_ascii_uppercase(), secret.into());
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl SecretResolver for StaticSecrets {
    fn algorithms(&self) -> Vec<String> {
        let mut algorithms: Vec<String> = self
            .secrets
            .keys()
            .map(|alg| canonical_name(alg).unwrap_or(alg.as_str()).to_string())
            .collect();
        algorithms.sort();
        algorithms
    }

    fn secret(&self, algorithm: &str) -> String {
        self.secrets
            .get(&algorithm.to_ascii_uppercase())
            .cloned()
            .unwrap_or_default()
    }
}

/// Resolved key material: the raw secret plus the algorithm it was resolved for.
pub(crate) struct ResolvedKey {
    pub algorithm: Algorithm,
    pub secret: String,
}

impl ResolvedKey {
    /// HMAC algorithms take the secret bytes as-is; asymmetric algorithms expect a PEM
    /// encoded public key.
    pub fn decoding_key(&self) -> Result<DecodingKey, KeyError> {
        let bytes = self.secret.as_bytes();
        let key = match self.algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                Ok(DecodingKey::from_secret(bytes))
            }
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(bytes),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(bytes),
            // RS*, PS*
            _ => DecodingKey::from_rsa_pem(bytes),
        };

        key.map_err(|source| KeyError::InvalidKeyMaterial {
            algorithm: algorithm_name(self.algorithm),
            source,
        })
    }
}

/// Static secret + optional resolver, bound once at build time.
#[derive(Clone, Default)]
pub struct KeyResolver {
    secret: String,
    algorithm: String,
    resolver: Option<Arc<dyn SecretResolver>>,
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("algorithm", &self.algorithm)
            .field("has_secret", &!self.secret.is_empty())
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl KeyResolver {
    pub fn new(
        secret: impl Into<String>,
        algorithm: impl Into<String>,
        resolver: Option<Arc<dyn SecretResolver>>,
    ) -> Self {
        Self {
            secret: secret.into(),
            algorithm: algorithm.into(),
            resolver,
        }
    }

    /// Whether any source could ever yield a key.
    pub fn has_source(&self) -> bool {
        !self.algorithm.is_empty() || self.resolver.is_some()
    }

    /// Static algorithm if set, else the resolver's list, else empty (nothing accepted).
    pub fn accepted_algorithms(&self) -> Vec<String> {
        if !self.algorithm.is_empty() {
            return vec![self.algorithm.clone()];
        }
        match &self.resolver {
            Some(resolver) => resolver.algorithms(),
            None => Vec::new(),
        }
    }

    pub fn accepts(&self, algorithm: &str) -> bool {
        self.accepted_algorithms()
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(algorithm))
    }

    pub fn resolve(&self, algorithm: &str) -> Result<String, KeyError> {
        self.from_static(algorithm)
            .or_else(|| self.from_resolver(algorithm))
            .ok_or_else(|| KeyError::NoKeySupplied {
                algorithm: algorithm.to_string(),
            })
    }

    pub(crate) fn resolve_key(&self, algorithm: Algorithm) -> Result<ResolvedKey, KeyError> {
        let secret = self.resolve(&algorithm_name(algorithm))?;
        Ok(ResolvedKey { algorithm, secret })
    }

    fn from_static(&self, algorithm: &str) -> Option<String> {
        if !self.secret.is_empty() && self.algorithm.eq_ignore_ascii_case(algorithm) {
            return Some(self.secret.clone());
        }
        None
    }

    fn from_resolver(&self, algorithm: &str) -> Option<String> {
        self.resolver
            .as_ref()
            .map(|resolver| resolver.secret(algorithm))
    }
}

/// JOSE name of an algorithm (`HS256`, `EdDSA`, ...).
pub fn algorithm_name(algorithm: Algorithm) -> String {
    format!("{algorithm:?}")
}

fn canonical_name(upper: &str) -> Option<&'static str> {
    // EdDSA is the only JOSE name that is not all upper-case.
    (upper == "EDDSA").then_some("EdDSA")
}
