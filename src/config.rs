/*
 * Responsibility
 * - 環境変数からの設定読み込み (listen addr, APP_ENV, JWT 検証設定)
 * - 設定値のバリデーション (不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::middleware::auth::AUTHORIZATION_HEADER;
use crate::services::auth::StaticSecrets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Token verification settings, as read from the environment.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub algorithm: String,
    pub authorization_header: String,
    pub secrets: StaticSecrets,
    pub leeway_seconds: u64,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    // reject requests without a token instead of passing them through
    pub require_token: bool,
}

impl AuthSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup("JWT_SECRET").unwrap_or_default();
        let algorithm = lookup("JWT_ALGORITHM")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let authorization_header = lookup("JWT_AUTH_HEADER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| AUTHORIZATION_HEADER.to_string());

        let secrets = match lookup("JWT_SECRETS") {
            Some(table) => parse_secret_table(&table)?,
            None => StaticSecrets::new(),
        };

        let leeway_seconds = match lookup("JWT_LEEWAY_SECONDS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("JWT_LEEWAY_SECONDS"))?,
            None => 0,
        };

        let issuer = lookup("JWT_ISSUER").filter(|s| !s.trim().is_empty());
        let audience = lookup("JWT_AUDIENCE").filter(|s| !s.trim().is_empty());

        let require_token = lookup("JWT_REQUIRE_TOKEN")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        if !secret.is_empty() && algorithm.is_empty() {
            return Err(ConfigError::Missing("JWT_ALGORITHM"));
        }

        Ok(Self {
            secret,
            algorithm,
            authorization_header,
            secrets,
            leeway_seconds,
            issuer,
            audience,
            require_token,
        })
    }
}

/// `HS256=secret-a,HS512=secret-b`
fn parse_secret_table(table: &str) -> Result<StaticSecrets, ConfigError> {
    let mut secrets = StaticSecrets::new();
    for entry in table.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (algorithm, secret) = entry
            .split_once('=')
            .ok_or(ConfigError::Invalid("JWT_SECRETS"))?;
        let algorithm = algorithm.trim();
        if algorithm.is_empty() || secret.is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRETS"));
        }
        secrets.insert(algorithm, secret);
    }
    Ok(secrets)
}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub auth: AuthSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(std::env::var("APP_ENV").ok());
        let auth = AuthSettings::from_lookup(|key| std::env::var(key).ok())?;

        Ok(Self {
            addr,
            app_env,
            auth,
        })
    }
}
