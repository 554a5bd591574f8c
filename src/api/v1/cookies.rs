//! The `jwt` refresh cookie.
//!
//! Set:     `jwt=<token>; Path=/; Max-Age=86400; HttpOnly; SameSite=None[; Secure]`
//! Cleared: `jwt=; Path=/; Max-Age=-1; HttpOnly; SameSite=None[; Secure]`

use axum::http::{HeaderMap, HeaderValue, header};

use crate::error::AppError;
use crate::services::auth::jwt::REFRESH_TOKEN_TTL_SECONDS;

pub const REFRESH_COOKIE_NAME: &str = "jwt";

pub fn refresh_cookie(token: &str, secure: bool) -> Result<HeaderValue, AppError> {
    build(token, REFRESH_TOKEN_TTL_SECONDS, secure)
}

pub fn cleared_refresh_cookie(secure: bool) -> HeaderValue {
    // An empty value with fixed attributes is always a valid header value.
    build("", -1, secure).unwrap_or_else(|_| HeaderValue::from_static("jwt=; Path=/; Max-Age=-1"))
}

fn build(value: &str, max_age: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{REFRESH_COOKIE_NAME}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=None"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|_| AppError::Internal)
}

/// Read a cookie value from the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
}
