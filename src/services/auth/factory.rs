/// Factory: build `JwtAuth` from environment-derived `AuthSettings`.
use std::sync::Arc;

use crate::claims::UserClaims;
use crate::config::{AuthSettings, ConfigError};
use crate::middleware::auth::{JwtAuth, RejectMissingToken};
use crate::services::auth::SecretResolver;

pub fn build_jwt_auth(settings: &AuthSettings) -> Result<JwtAuth<UserClaims>, ConfigError> {
    let mut builder = JwtAuth::<UserClaims>::builder()
        .secret(settings.secret.clone())
        .algorithm(settings.algorithm.clone())
        .authorization_header(settings.authorization_header.clone())
        .leeway(settings.leeway_seconds);

    if !settings.secrets.is_empty() {
        let secrets: Arc<dyn SecretResolver> = Arc::new(settings.secrets.clone());
        builder = builder.shared_secret_resolver(secrets);
    }
    if let Some(issuer) = &settings.issuer {
        builder = builder.issuer(issuer.clone());
    }
    if let Some(audience) = &settings.audience {
        builder = builder.audience(audience.clone());
    }
    if settings.require_token {
        builder = builder.unauthorized_handler(RejectMissingToken);
    }

    let auth = builder.build()?;
    tracing::info!(
        accepted = ?auth.parser().keys().accepted_algorithms(),
        require_token = settings.require_token,
        "bearer token verification configured"
    );
    Ok(auth)
}
