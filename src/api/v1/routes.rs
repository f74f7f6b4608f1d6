/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - bearer token 検証はこの Router 全体に掛ける (token 無しは設定次第で素通し)
 */
use axum::{Router, routing::get};

use bearer_gate::{JwtAuth, UserClaims, apply};

use crate::api::v1::handlers::me::{me, profile};

pub fn routes(auth: JwtAuth<UserClaims>) -> Router {
    let router = Router::new()
        .route("/me", get(me))
        .route("/profile", get(profile));

    apply(router, auth)
}
