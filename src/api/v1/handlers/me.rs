/*
 * Responsibility
 * - GET /api/v1/me: 呼び出し元の identity (匿名なら authenticated=false)
 * - GET /api/v1/profile: 認証必須 (claims が無ければ 401)
 */
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use bearer_gate::{Authenticated, UserClaims};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn me(claims: Option<Authenticated<UserClaims>>) -> Json<MeResponse> {
    let body = match claims {
        Some(Authenticated(claims)) => MeResponse {
            authenticated: true,
            expires_at: claims.expires_at(),
            user_id: Some(claims.user_id),
        },
        None => MeResponse {
            authenticated: false,
            user_id: None,
            expires_at: None,
        },
    };
    Json(body)
}

pub async fn profile(Authenticated(claims): Authenticated<UserClaims>) -> Json<UserClaims> {
    Json(claims)
}
