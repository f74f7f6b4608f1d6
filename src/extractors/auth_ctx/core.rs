use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use crate::claims::AuthClaims;
use crate::error::AuthError;

use super::get_claims;

/// Handler で検証済み claims を受け取るための extractor
/// middleware が claims を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 (`Option<Authenticated<C>>` なら None)
#[derive(Debug, Clone)]
pub struct Authenticated<C>(pub C);

impl<S, C> FromRequestParts<S> for Authenticated<C>
where
    S: Send + Sync,
    C: AuthClaims,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        get_claims::<C>(&parts.extensions)
            .cloned()
            .map(Authenticated)
            .ok_or(AuthError::MissingCredentials)
    }
}

impl<S, C> OptionalFromRequestParts<S> for Authenticated<C>
where
    S: Send + Sync,
    C: AuthClaims,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(get_claims::<C>(&parts.extensions).cloned().map(Authenticated))
    }
}
