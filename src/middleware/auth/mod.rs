/*
 * Responsibility
 * - JwtAuth: 1 つの設定 (Parser + 差し替え可能な各役割) を束ねたミドルウェア本体
 * - JwtAuthBuilder: オプションを適用して JwtAuth を組み立てる (build 後は不変)
 * - UnauthorizedHandler / AuthResultSink: トークン無し時 / 検証成功時の差し替え点
 */
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::claims::AuthClaims;
use crate::config::ConfigError;
use crate::error::AuthError;
use crate::extractors::auth_ctx::{AuthContext, DefaultSink};
use crate::services::auth::{ClaimsFactory, KeyResolver, Parser, SecretResolver};

pub mod access;
pub mod locator;

pub use access::{apply, authenticate};
pub use locator::{AUTHORIZATION_HEADER, HeaderLocator, TokenLocator};

/// Invoked instead of the downstream handler when a request carries no token.
/// Whatever it returns is the request's outcome; it may call `next` itself.
#[async_trait]
pub trait UnauthorizedHandler: Send + Sync + 'static {
    async fn handle(&self, req: Request, next: Next) -> Result<Response, AuthError>;
}

/// Rejects every request that arrives without a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectMissingToken;

#[async_trait]
impl UnauthorizedHandler for RejectMissingToken {
    async fn handle(&self, _req: Request, _next: Next) -> Result<Response, AuthError> {
        Err(AuthError::MissingCredentials)
    }
}

/// Receives verified claims. A configured sink replaces the default propagation
/// entirely.
pub trait AuthResultSink<C>: Send + Sync + 'static {
    fn attach(&self, ctx: &mut AuthContext<'_>, claims: C);
}

impl<C, F> AuthResultSink<C> for F
where
    F: Fn(&mut AuthContext<'_>, C) + Send + Sync + 'static,
{
    fn attach(&self, ctx: &mut AuthContext<'_>, claims: C) {
        self(ctx, claims)
    }
}

struct Inner<C: AuthClaims> {
    parser: Parser<C>,
    locator: Arc<dyn TokenLocator>,
    unauthorized: Option<Arc<dyn UnauthorizedHandler>>,
    sink: Arc<dyn AuthResultSink<C>>,
}

/// Bearer-token middleware configuration, shared read-only by every request.
pub struct JwtAuth<C: AuthClaims> {
    inner: Arc<Inner<C>>,
}

impl<C: AuthClaims> Clone for JwtAuth<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: AuthClaims> fmt::Debug for JwtAuth<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuth")
            .field("parser", &self.inner.parser)
            .field("has_unauthorized_handler", &self.inner.unauthorized.is_some())
            .finish()
    }
}

impl<C: AuthClaims> JwtAuth<C> {
    pub fn builder() -> JwtAuthBuilder<C> {
        JwtAuthBuilder::default()
    }

    pub fn parser(&self) -> &Parser<C> {
        &self.inner.parser
    }

    pub fn locate(&self, req: &Request) -> Option<String> {
        self.inner.locator.locate(req)
    }

    pub fn unauthorized_handler(&self) -> Option<&dyn UnauthorizedHandler> {
        self.inner.unauthorized.as_deref()
    }

    pub fn set_authorized(&self, ctx: &mut AuthContext<'_>, claims: C) {
        self.inner.sink.attach(ctx, claims);
    }
}

pub struct JwtAuthBuilder<C: AuthClaims> {
    secret: String,
    algorithm: String,
    authorization_header: String,
    unauthorized: Option<Arc<dyn UnauthorizedHandler>>,
    factory: Option<Arc<dyn ClaimsFactory<C>>>,
    locator: Option<Arc<dyn TokenLocator>>,
    sink: Option<Arc<dyn AuthResultSink<C>>>,
    resolver: Option<Arc<dyn SecretResolver>>,
    leeway_seconds: u64,
    issuer: Option<String>,
    audience: Option<String>,
}

impl<C: AuthClaims> Default for JwtAuthBuilder<C> {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: String::new(),
            authorization_header: AUTHORIZATION_HEADER.to_string(),
            unauthorized: None,
            factory: None,
            locator: None,
            sink: None,
            resolver: None,
            leeway_seconds: 0,
            issuer: None,
            audience: None,
        }
    }
}

impl<C: AuthClaims> JwtAuthBuilder<C> {
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Ignored when a custom token locator is set.
    pub fn authorization_header(mut self, header: impl Into<String>) -> Self {
        self.authorization_header = header.into();
        self
    }

    pub fn unauthorized_handler(mut self, handler: impl UnauthorizedHandler) -> Self {
        self.unauthorized = Some(Arc::new(handler));
        self
    }

    pub fn claims_factory(mut self, factory: impl ClaimsFactory<C>) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn token_locator(mut self, locator: impl TokenLocator) -> Self {
        self.locator = Some(Arc::new(locator));
        self
    }

    pub fn auth_result_sink(mut self, sink: impl AuthResultSink<C>) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn secret_resolver(self, resolver: impl SecretResolver) -> Self {
        self.shared_secret_resolver(Arc::new(resolver))
    }

    pub fn shared_secret_resolver(mut self, resolver: Arc<dyn SecretResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn build(self) -> Result<JwtAuth<C>, ConfigError> {
        let locator: Arc<dyn TokenLocator> = match self.locator {
            Some(locator) => locator,
            None => Arc::new(HeaderLocator::new(&self.authorization_header)?),
        };

        let keys = KeyResolver::new(self.secret, self.algorithm, self.resolver);
        let mut parser = Parser::new(keys)
            .with_leeway(self.leeway_seconds)
            .with_issuer(self.issuer)
            .with_audience(self.audience);
        if let Some(factory) = self.factory {
            parser = parser.with_factory(factory);
        }

        let sink: Arc<dyn AuthResultSink<C>> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(DefaultSink),
        };

        Ok(JwtAuth {
            inner: Arc::new(Inner {
                parser,
                locator,
                unauthorized: self.unauthorized,
                sink,
            }),
        })
    }
}
