/*
 * Responsibility
 * - 認証ミドルウェアのエラー定義 (設定エラー / トークン不正 / 資格情報なし)
 * - IntoResponse 実装 (常に 401 + JSON error body)
 * - jsonwebtoken::errors::Error を理由ごとに分類する
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;
use serde::Serialize;
use thiserror::Error;

/// Key material could not be resolved. Operator misconfiguration, not a client fault.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no key source configured (algorithm {algorithm})")]
    NoSourceConfigured { algorithm: String },

    #[error("algo({algorithm}) key not supplied")]
    NoKeySupplied { algorithm: String },

    #[error("invalid key material for {algorithm}: {source}")]
    InvalidKeyMaterial {
        algorithm: String,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// The presented token is unacceptable. Client-caused.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("signing algorithm {0} is not accepted")]
    DisallowedAlgorithm(String),

    #[error("signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    #[error("payload does not match claims type: {0}")]
    ClaimsShape(#[source] serde_json::Error),

    #[error("token verification failed: {0}")]
    Other(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        let classified = match e.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Some(Self::Malformed),
            ErrorKind::InvalidSignature => Some(Self::BadSignature),
            ErrorKind::InvalidAlgorithm => Some(Self::DisallowedAlgorithm("unknown".to_string())),
            ErrorKind::ExpiredSignature => Some(Self::Expired),
            ErrorKind::ImmatureSignature => Some(Self::NotYetValid),
            ErrorKind::InvalidIssuer => Some(Self::InvalidClaims("iss".to_string())),
            ErrorKind::InvalidAudience => Some(Self::InvalidClaims("aud".to_string())),
            ErrorKind::MissingRequiredClaim(name) => Some(Self::InvalidClaims(name.clone())),
            _ => None,
        };

        match classified {
            Some(err) => err,
            None => Self::Other(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Configuration(#[from] KeyError),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("missing credentials")]
    MissingCredentials,
}

impl AuthError {
    /// True when the failure is on the operator's side (no usable key), not the client's.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn token_error(&self) -> Option<&TokenError> {
        match self {
            Self::InvalidToken(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidToken(e.into())
    }
}

#[derive(Serialize)]
struct ErrorResponseBody {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // The reason stays in the logs; clients only learn that they are unauthorized.
        let body = ErrorResponseBody {
            error: ErrorBody {
                code: "UNAUTHORIZED",
                message: "unauthorized".to_string(),
            },
        };

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}
