use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, Validation};
use serde_json::{Map, Value};

use crate::claims::AuthClaims;
use crate::error::{AuthError, KeyError, TokenError};
use crate::services::auth::keys::{KeyResolver, algorithm_name};

/// Produces the empty claims instance a token payload is laid over.
pub trait ClaimsFactory<C>: Send + Sync + 'static {
    fn create(&self) -> C;
}

impl<C, F> ClaimsFactory<C> for F
where
    F: Fn() -> C + Send + Sync + 'static,
{
    fn create(&self) -> C {
        self()
    }
}

/// Turns a raw token string into verified claims.
///
/// Stateless beyond its configuration; safe to share across requests.
pub struct Parser<C: AuthClaims> {
    keys: KeyResolver,
    factory: Arc<dyn ClaimsFactory<C>>,
    leeway_seconds: u64,
    issuer: Option<String>,
    audience: Option<String>,
}

impl<C: AuthClaims> Clone for Parser<C> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            factory: Arc::clone(&self.factory),
            leeway_seconds: self.leeway_seconds,
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
        }
    }
}

impl<C: AuthClaims> fmt::Debug for Parser<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("keys", &self.keys)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl<C: AuthClaims> Parser<C> {
    pub fn new(keys: KeyResolver) -> Self {
        Self {
            keys,
            factory: Arc::new(C::default),
            leeway_seconds: 0,
            issuer: None,
            audience: None,
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn ClaimsFactory<C>>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn keys(&self) -> &KeyResolver {
        &self.keys
    }

    /// Alias of [`Parser::parse`].
    pub fn validate(&self, token: &str) -> Result<C, AuthError> {
        self.parse(token)
    }

    /// Verify `token` and return its claims.
    ///
    /// Order of checks:
    /// - header decodes (else `TokenError::Malformed`)
    /// - some key source exists at all (else `KeyError::NoSourceConfigured`)
    /// - declared algorithm is accepted (else `TokenError::DisallowedAlgorithm`)
    /// - key resolves for that algorithm (else `KeyError`)
    /// - signature, `exp`/`nbf`, and `iss`/`aud` when configured
    /// - payload fits the claims type (else `TokenError::ClaimsShape`)
    pub fn parse(&self, token: &str) -> Result<C, AuthError> {
        let header = jsonwebtoken::decode_header(token)?;
        let algorithm = algorithm_name(header.alg);

        if !self.keys.has_source() {
            return Err(KeyError::NoSourceConfigured { algorithm }.into());
        }
        if !self.keys.accepts(&algorithm) {
            return Err(TokenError::DisallowedAlgorithm(algorithm).into());
        }

        let key = self.keys.resolve_key(header.alg)?.decoding_key()?;
        let data = jsonwebtoken::decode::<Map<String, Value>>(
            token,
            &key,
            &self.validation(header.alg),
        )?;

        self.populate(data.claims)
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        // Registered claims are checked when present, never required.
        validation.required_spec_claims.clear();
        validation.leeway = self.leeway_seconds;
        validation.validate_nbf = true;

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        validation
    }

    fn populate(&self, payload: Map<String, Value>) -> Result<C, AuthError> {
        let mut merged = match serde_json::to_value(self.factory.create()) {
            Ok(Value::Object(base)) => base,
            Ok(_) => Map::new(),
            Err(e) => return Err(TokenError::ClaimsShape(e).into()),
        };
        merged.extend(payload);

        serde_json::from_value(Value::Object(merged))
            .map_err(|e| TokenError::ClaimsShape(e).into())
    }
}
