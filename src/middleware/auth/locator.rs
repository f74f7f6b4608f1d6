use axum::extract::Request;
use axum::http::HeaderName;

use crate::config::ConfigError;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Pulls the raw token out of an inbound request. `None` means no credential was
/// supplied, which is not an error.
pub trait TokenLocator: Send + Sync + 'static {
    fn locate(&self, req: &Request) -> Option<String>;
}

impl<F> TokenLocator for F
where
    F: Fn(&Request) -> Option<String> + Send + Sync + 'static,
{
    fn locate(&self, req: &Request) -> Option<String> {
        self(req)
    }
}

/// Default locator: reads one header (name matched case-insensitively) and strips an
/// optional `Bearer` scheme.
#[derive(Debug, Clone)]
pub struct HeaderLocator {
    header: HeaderName,
}

impl HeaderLocator {
    pub fn new(header: &str) -> Result<Self, ConfigError> {
        // HeaderName normalizes to lower-case, so lookups ignore the caller's casing.
        let header = HeaderName::from_bytes(header.trim().as_bytes())
            .map_err(|_| ConfigError::Invalid("authorization header"))?;
        Ok(Self { header })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self {
            header: axum::http::header::AUTHORIZATION,
        }
    }
}

impl TokenLocator for HeaderLocator {
    fn locate(&self, req: &Request) -> Option<String> {
        // Opaque bytes still count as a present credential; verification rejects them.
        let raw = req.headers().get(&self.header)?;
        let value = String::from_utf8_lossy(raw.as_bytes());
        let token = strip_bearer(value.trim());
        if token.is_empty() {
            return None;
        }
        Some(token.to_string())
    }
}

fn strip_bearer(value: &str) -> &str {
    if value.eq_ignore_ascii_case("bearer") {
        return "";
    }
    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    }
}
