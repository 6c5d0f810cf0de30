//! Session cookie parsing and `Set-Cookie` construction.
//!
//! Every session cookie is `HttpOnly; Secure; SameSite=Strict; Path=/`.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

/// Cookie carrying the ID token.
pub const ID_TOKEN_COOKIE: &str = "idToken";

/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; Secure; SameSite=Strict";

const SECONDS_PER_DAY: i64 = 86_400;

/// Read a cookie value from the request's `Cookie` headers.
///
/// Empty values count as absent.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a session cookie expiring at `expires`.
pub fn session_cookie(name: &str, value: &str, expires: DateTime<Utc>) -> String {
    format!(
        "{name}={value}; Expires={}; {COOKIE_ATTRIBUTES}",
        http_date(expires)
    )
}

/// `Set-Cookie` value for a session cookie expiring at a Unix timestamp.
pub fn session_cookie_at(name: &str, value: &str, expires_unix: i64) -> String {
    session_cookie(
        name,
        value,
        DateTime::from_timestamp(expires_unix, 0).unwrap_or_default(),
    )
}

/// `Set-Cookie` value for a refresh token living `ttl_days` past `now_unix`.
pub fn refresh_cookie(value: &str, now_unix: i64, ttl_days: i64) -> String {
    session_cookie_at(
        REFRESH_TOKEN_COOKIE,
        value,
        now_unix.saturating_add(ttl_days.saturating_mul(SECONDS_PER_DAY)),
    )
}

/// `Set-Cookie` value that removes a cookie from the browser.
pub fn cleared_cookie(name: &str) -> String {
    format!(
        "{name}=; Max-Age=0; Expires={}; {COOKIE_ATTRIBUTES}",
        http_date(DateTime::<Utc>::default())
    )
}

/// Both session cookies, cleared.
pub fn cleared_session_cookies() -> [String; 2] {
    [
        cleared_cookie(ID_TOKEN_COOKIE),
        cleared_cookie(REFRESH_TOKEN_COOKIE),
    ]
}

/// Append `Set-Cookie` headers. Values that are not valid header text are
/// dropped with a warning.
pub fn append_set_cookies<I>(headers: &mut HeaderMap, cookies: I)
where
    I: IntoIterator<Item = String>,
{
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(_) => {
                tracing::warn!(target: "venue.middleware.cookies", "Dropping malformed Set-Cookie value");
            }
        }
    }
}

/// True if `headers` already carry a `Set-Cookie` for `name`.
pub fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.split_once('=').is_some_and(|(key, _)| key == name))
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
