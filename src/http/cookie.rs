//! Cookie transport on top of the `cookie` crate: read the `Cookie` request
//! header, write `Set-Cookie` response headers.
//!
//! Names and values are percent-encoded on the way out and decoded on the way
//! in, so a value can never smuggle in extra attributes.

use std::collections::HashMap;
use std::time::Duration;

use axum::http::{HeaderMap, header};
use cookie::time::{self, OffsetDateTime};
use cookie::{Cookie, SameSite};

// Browsers cap cookie lifetimes at 400 days.
const MAX_AGE_CAP_SECONDS: i64 = 400 * 24 * 60 * 60;

/// Parse every `Cookie` header into name → value. Later duplicates win,
/// malformed pairs are skipped.
pub fn parse_cookie_header(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse_encoded(v))
        .filter_map(Result::ok)
        .map(|c| (c.name().to_string(), c.value_trimmed().to_string()))
        .collect()
}

/// An outbound cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: Duration,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, max_age: Duration) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age,
        }
    }

    /// `Set-Cookie` header value: `Path=/`, `HttpOnly`, `SameSite=Lax`,
    /// `Max-Age` plus a matching `Expires`, and `Secure` when asked.
    pub fn to_header_value(&self, secure: bool) -> String {
        let seconds = i64::try_from(self.max_age.as_secs())
            .unwrap_or(i64::MAX)
            .min(MAX_AGE_CAP_SECONDS);
        let max_age = time::Duration::seconds(seconds);

        Cookie::build((self.name.as_str(), self.value.as_str()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .max_age(max_age)
            .expires(OffsetDateTime::now_utc() + max_age)
            .build()
            .encoded()
            .to_string()
    }
}
