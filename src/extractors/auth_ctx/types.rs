/*
 * Responsibility
 * - middleware → handler へ claims を受け渡すためのリクエスト単位の状態
 * - 既定の伝播 (identity marker ヘッダ + extensions への格納)
 *
 * Notes
 * - claims は非公開のラッパー型で extensions に入るため、他の同型の値とは衝突しない
 * - 取り出しは get_claims のみ。無い場合は None (空の claims とは区別される)
 */
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue};

use crate::claims::AuthClaims;
use crate::middleware::auth::AuthResultSink;

/// Response header carrying the authenticated user id.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-jwt-uid");

#[derive(Clone)]
struct ClaimsSlot<C>(C);

/// Request-scoped state handed to an [`AuthResultSink`].
///
/// Claims go into the request's extensions; response headers are buffered and copied
/// onto the downstream response once it is produced.
pub struct AuthContext<'a> {
    extensions: &'a mut Extensions,
    response_headers: HeaderMap,
}

impl<'a> AuthContext<'a> {
    pub fn new(extensions: &'a mut Extensions) -> Self {
        Self {
            extensions,
            response_headers: HeaderMap::new(),
        }
    }

    pub fn insert_claims<C: AuthClaims>(&mut self, claims: C) {
        self.extensions.insert(ClaimsSlot(claims));
    }

    pub fn claims<C: AuthClaims>(&self) -> Option<&C> {
        get_claims(&*self.extensions)
    }

    pub fn set_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.insert(name, value);
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut *self.extensions
    }

    pub fn into_response_headers(self) -> HeaderMap {
        self.response_headers
    }
}

pub fn get_claims<C: AuthClaims>(extensions: &Extensions) -> Option<&C> {
    extensions.get::<ClaimsSlot<C>>().map(|slot| &slot.0)
}

/// Marks the response with the user id and stores the claims for downstream handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSink;

impl<C: AuthClaims> AuthResultSink<C> for DefaultSink {
    fn attach(&self, ctx: &mut AuthContext<'_>, claims: C) {
        match HeaderValue::from_str(claims.user_id()) {
            Ok(value) => ctx.set_response_header(USER_ID_HEADER, value),
            Err(_) => tracing::warn!("user id is not a valid header value; identity marker skipped"),
        }
        ctx.insert_claims(claims);
    }
}
