//! bearer token 検証 → claims を extensions に入れる
//!
//! 1 リクエストにつき 1 回、次の順で判定する:
//! - token 無し + UnauthorizedHandler あり → handler の結果がそのまま応答
//! - token 無し + handler 無し → 未認証のまま next へ
//! - token あり → 検証に失敗したら即エラー (handler には回さない)
//! - 検証成功 → AuthResultSink に claims を渡してから next へ

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
};

use crate::claims::AuthClaims;
use crate::error::AuthError;
use crate::extractors::auth_ctx::AuthContext;

use super::JwtAuth;

/// Layer the bearer-token middleware onto `router`.
///
/// ```ignore
/// let auth = JwtAuth::<UserClaims>::builder()
///     .secret("s3cret")
///     .algorithm("HS256")
///     .build()?;
/// let v1 = middleware::auth::apply(api::v1::routes(), auth);
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply<S, C>(router: Router<S>, auth: JwtAuth<C>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    C: AuthClaims,
{
    router.layer(middleware::from_fn_with_state(auth, authenticate::<C>))
}

pub async fn authenticate<C: AuthClaims>(
    State(auth): State<JwtAuth<C>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(token) = auth.locate(&req).filter(|token| !token.is_empty()) else {
        return match auth.unauthorized_handler() {
            Some(handler) => {
                tracing::debug!(uri = %req.uri(), "no bearer token; delegating to unauthorized handler");
                handler.handle(req, next).await
            }
            None => Ok(next.run(req).await),
        };
    };

    // A present token commits the request to the authenticated path.
    let claims = match auth.parser().validate(&token) {
        Ok(claims) => claims,
        Err(err) => {
            if err.is_configuration() {
                tracing::error!(error = %err, "no usable key for bearer token");
            } else {
                tracing::warn!(error = %err, "bearer token verification failed");
            }
            return Err(err);
        }
    };

    let mut ctx = AuthContext::new(req.extensions_mut());
    auth.set_authorized(&mut ctx, claims);
    let marker = ctx.into_response_headers();

    let mut res = next.run(req).await;
    // Headers the handler set itself win over the marker.
    let headers = res.headers_mut();
    for name in marker.keys() {
        if headers.contains_key(name) {
            continue;
        }
        for value in marker.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    Ok(res)
}
