//! Refresh-credential cookie construction and parsing.
//!
//! The refresh secret travels only in an HTTP-only cookie scoped to `/`;
//! it never appears in response bodies or the credential listing.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use planeja_types::config::CookieConfig;

const SECONDS_PER_DAY: i64 = 86_400;

/// Build the Set-Cookie value carrying a refresh secret.
pub fn build_refresh_cookie(config: &CookieConfig, secret: &str) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite={}",
        config.name,
        secret,
        config.max_age_days * SECONDS_PER_DAY,
        config.same_site,
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    if let Some(domain) = &config.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    cookie
}

/// Build the Set-Cookie value that clears the refresh cookie.
pub fn clear_refresh_cookie(config: &CookieConfig) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; SameSite={}",
        config.name, config.same_site,
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    if let Some(domain) = &config.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    cookie
}

/// Pull a named cookie value out of the request's Cookie headers.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
        .next()
}
