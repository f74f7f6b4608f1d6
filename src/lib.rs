//! Bearer-token authentication middleware for axum.
//!
//! A [`JwtAuth`] bundles one verification configuration: static secret/algorithm and/or
//! a [`SecretResolver`], plus pluggable token location, claims construction, fallback
//! for unauthenticated requests, and propagation of verified claims. Layer it onto a
//! router with [`apply`]; handlers read the identity through [`Authenticated`] or
//! [`get_claims`].

pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod services;

pub use claims::{AuthClaims, RegisteredClaims, UserClaims};
pub use config::{AuthSettings, ConfigError};
pub use error::{AuthError, KeyError, TokenError};
pub use extractors::{AuthContext, Authenticated, DefaultSink, USER_ID_HEADER, get_claims};
pub use middleware::auth::{
    AuthResultSink, HeaderLocator, JwtAuth, JwtAuthBuilder, RejectMissingToken, TokenLocator,
    UnauthorizedHandler, apply, authenticate,
};
pub use services::auth::{
    ClaimsFactory, KeyResolver, Parser, SecretResolver, StaticSecrets, build_jwt_auth,
};
