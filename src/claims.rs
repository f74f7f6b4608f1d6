/*
 * Responsibility
 * - 検証済みトークンが運ぶ identity payload の型 (Claims)
 * - ミドルウェアが要求する契約 (AuthClaims) と既定実装 (UserClaims)
 */
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// What the middleware needs from a claims type.
///
/// `Default` is the empty instance handed out at request start; the verified payload is
/// laid over its serialized form, so fields missing from the token keep their default.
pub trait AuthClaims:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    fn user_id(&self) -> &str;
}

/// Registered JWT fields. Passed through untouched; only `exp`/`nbf` (and `iss`/`aud`
/// when configured) take part in verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    // string or array of strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(flatten)]
    pub registered: RegisteredClaims,
    #[serde(default)]
    pub user_id: String,
}

impl UserClaims {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            registered: RegisteredClaims::default(),
            user_id: user_id.into(),
        }
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.registered
            .exp
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

impl AuthClaims for UserClaims {
    fn user_id(&self) -> &str {
        &self.user_id
    }
}
