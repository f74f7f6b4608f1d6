use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use bearer_gate::{
    AuthContext, AuthError, JwtAuth, RejectMissingToken, StaticSecrets, USER_ID_HEADER,
    UnauthorizedHandler, UserClaims, apply, get_claims,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;
use tower::ServiceExt;

fn mint(alg: Algorithm, secret: &str, user_id: &str) -> String {
    let claims = json!({
        "user_id": user_id,
        "sub": user_id,
        "iat": Utc::now().timestamp(),
        "exp": Utc::now().timestamp() + 600,
    });
    encode(
        &Header::new(alg),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("sign token")
}

/// Router whose only handler echoes the attached identity and counts invocations.
fn app(auth: JwtAuth<UserClaims>, hits: Arc<AtomicUsize>) -> Router {
    let router = Router::new().route(
        "/whoami",
        get(move |req: Request| {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                match get_claims::<UserClaims>(req.extensions()) {
                    Some(claims) => claims.user_id.clone(),
                    None => "anonymous".to_string(),
                }
            }
        }),
    );
    apply(router, auth)
}

fn static_auth() -> JwtAuth<UserClaims> {
    JwtAuth::<UserClaims>::builder()
        .secret("s3cret")
        .algorithm("HS256")
        .build()
        .expect("build auth")
}

fn get_whoami(header: Option<(&str, String)>) -> Request {
    let mut builder = Request::builder().uri("/whoami").method("GET");
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    builder.body(Body::empty()).expect("request")
}

async fn body_text(res: Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

#[tokio::test]
async fn valid_token_attaches_claims_and_marker() {
    let hits = Arc::new(AtomicUsize::new(0));
    let token = mint(Algorithm::HS256, "s3cret", "u-42");

    let res = app(static_auth(), hits.clone())
        .oneshot(get_whoami(Some(("Authorization", format!("Bearer {token}")))))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(USER_ID_HEADER),
        Some(&HeaderValue::from_static("u-42"))
    );
    assert_eq!(body_text(res).await, "u-42");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lower_case_header_is_located() {
    let token = mint(Algorithm::HS256, "s3cret", "u-42");

    let res = app(static_auth(), Arc::new(AtomicUsize::new(0)))
        .oneshot(get_whoami(Some(("authorization", format!("Bearer {token}")))))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "u-42");
}

#[tokio::test]
async fn wrong_secret_is_rejected_before_downstream() {
    let hits = Arc::new(AtomicUsize::new(0));
    let token = mint(Algorithm::HS256, "not-the-secret", "u-42");

    let res = app(static_auth(), hits.clone())
        .oneshot(get_whoami(Some(("Authorization", format!("Bearer {token}")))))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(USER_ID_HEADER).is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disallowed_algorithm_is_rejected() {
    let token = mint(Algorithm::HS512, "s3cret", "u-42");

    let res = app(static_auth(), Arc::new(AtomicUsize::new(0)))
        .oneshot(get_whoami(Some(("Authorization", format!("Bearer {token}")))))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_key_material_is_rejected() {
    let auth = JwtAuth::<UserClaims>::builder().build().expect("build auth");
    let token = mint(Algorithm::HS256, "s3cret", "u-42");

    let res = app(auth, Arc::new(AtomicUsize::new(0)))
        .oneshot(get_whoami(Some(("Authorization", format!("Bearer {token}")))))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value =
        serde_json::from_str(&body_text(res).await).expect("json body");
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn no_token_without_fallback_continues_anonymously() {
    let hits = Arc::new(AtomicUsize::new(0));

    let res = app(static_auth(), hits.clone())
        .oneshot(get_whoami(None))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(USER_ID_HEADER).is_none());
    assert_eq!(body_text(res).await, "anonymous");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

struct CountingFallback {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl UnauthorizedHandler for CountingFallback {
    async fn handle(&self, _req: Request, _next: Next) -> Result<Response, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((StatusCode::IM_A_TEAPOT, "fallback").into_response())
    }
}

struct PassThrough;

#[async_trait]
impl UnauthorizedHandler for PassThrough {
    async fn handle(&self, req: Request, next: Next) -> Result<Response, AuthError> {
        Ok(next.run(req).await)
    }
}

#[tokio::test]
async fn no_token_with_fallback_uses_fallback_outcome() {
    let hits = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let auth = JwtAuth::<UserClaims>::builder()
        .secret("s3cret")
        .algorithm("HS256")
        .unauthorized_handler(CountingFallback {
            calls: calls.clone(),
        })
        .build()
        .expect("build auth");

    let res = app(auth, hits.clone())
        .oneshot(get_whoami(None))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_text(res).await, "fallback");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fallback_may_continue_downstream() {
    let hits = Arc::new(AtomicUsize::new(0));
    let auth = JwtAuth::<UserClaims>::builder()
        .secret("s3cret")
        .algorithm("HS256")
        .unauthorized_handler(PassThrough)
        .build()
        .expect("build auth");

    let res = app(auth, hits.clone())
        .oneshot(get_whoami(None))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "anonymous");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_token_does_not_consult_fallback() {
    let calls = Arc::new(AtomicUsize::new(0));
    let auth = JwtAuth::<UserClaims>::builder()
        .secret("s3cret")
        .algorithm("HS256")
        .unauthorized_handler(CountingFallback {
            calls: calls.clone(),
        })
        .build()
        .expect("build auth");

    let res = app(auth, Arc::new(AtomicUsize::new(0)))
        .oneshot(get_whoami(Some(("Authorization", "Bearer garbage".to_string()))))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reject_missing_token_handler_returns_unauthorized() {
    let hits = Arc::new(AtomicUsize::new(0));
    let auth = JwtAuth::<UserClaims>::builder()
        .secret("s3cret")
        .algorithm("HS256")
        .unauthorized_handler(RejectMissingToken)
        .build()
        .expect("build auth");

    let res = app(auth, hits.clone())
        .oneshot(get_whoami(None))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[derive(Clone)]
struct Tagged(String);

fn tag_only(ctx: &mut AuthContext<'_>, claims: UserClaims) {
    ctx.extensions_mut().insert(Tagged(claims.user_id));
}

#[tokio::test]
async fn custom_sink_replaces_default_propagation() {
    let auth = JwtAuth::<UserClaims>::builder()
        .secret("s3cret")
        .algorithm("HS256")
        .auth_result_sink(tag_only)
        .build()
        .expect("build auth");

    let router = Router::new().route(
        "/whoami",
        get(|req: Request| async move {
            let tagged = req
                .extensions()
                .get::<Tagged>()
                .map(|t| t.0.clone())
                .unwrap_or_default();
            let has_claims = get_claims::<UserClaims>(req.extensions()).is_some();
            format!("{tagged}:{has_claims}")
        }),
    );
    let token = mint(Algorithm::HS256, "s3cret", "u-7");

    let res = apply(router, auth)
        .oneshot(get_whoami(Some(("Authorization", format!("Bearer {token}")))))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(USER_ID_HEADER).is_none());
    assert_eq!(body_text(res).await, "u-7:false");
}

#[tokio::test]
async fn secret_resolver_and_custom_locator() {
    let auth = JwtAuth::<UserClaims>::builder()
        .secret_resolver(StaticSecrets::new().with("HS384", "three-eight-four"))
        .token_locator(|req: &Request| {
            req.uri()
                .query()
                .and_then(|q| q.strip_prefix("access_token="))
                .map(str::to_string)
        })
        .build()
        .expect("build auth");
    let token = mint(Algorithm::HS384, "three-eight-four", "u-9");

    let req = Request::builder()
        .uri(format!("/whoami?access_token={token}"))
        .body(Body::empty())
        .expect("request");
    let res = app(auth, Arc::new(AtomicUsize::new(0)))
        .oneshot(req)
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "u-9");
}

#[tokio::test]
async fn opaque_header_value_is_rejected_not_anonymous() {
    let hits = Arc::new(AtomicUsize::new(0));
    let req = Request::builder()
        .uri("/whoami")
        .header(
            "authorization",
            HeaderValue::from_bytes(b"Bearer \xffjunk").expect("opaque value"),
        )
        .body(Body::empty())
        .expect("request");

    let res = app(static_auth(), hits.clone())
        .oneshot(req)
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_located_token_counts_as_no_token() {
    let hits = Arc::new(AtomicUsize::new(0));
    let auth = JwtAuth::<UserClaims>::builder()
        .secret("s3cret")
        .algorithm("HS256")
        .token_locator(|_req: &Request| -> Option<String> { Some(String::new()) })
        .build()
        .expect("build auth");

    let res = app(auth, hits.clone())
        .oneshot(get_whoami(None))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "anonymous");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_located_token_goes_to_fallback() {
    let calls = Arc::new(AtomicUsize::new(0));
    let auth = JwtAuth::<UserClaims>::builder()
        .secret("s3cret")
        .algorithm("HS256")
        .token_locator(|_req: &Request| -> Option<String> { Some(String::new()) })
        .unauthorized_handler(CountingFallback {
            calls: calls.clone(),
        })
        .build()
        .expect("build auth");

    let res = app(auth, Arc::new(AtomicUsize::new(0)))
        .oneshot(get_whoami(None))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handler_can_override_identity_marker() {
    let router = Router::new().route(
        "/whoami",
        get(|| async { ([(USER_ID_HEADER, "overridden")], "ok") }),
    );
    let token = mint(Algorithm::HS256, "s3cret", "u-42");

    let res = apply(router, static_auth())
        .oneshot(get_whoami(Some(("Authorization", format!("Bearer {token}")))))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    let markers: Vec<_> = res.headers().get_all(USER_ID_HEADER).iter().collect();
    assert_eq!(markers, vec![&HeaderValue::from_static("overridden")]);
}
