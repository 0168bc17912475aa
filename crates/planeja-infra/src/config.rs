//! Environment configuration loading.
//!
//! `load_config` reads the process environment; `load_config_with` takes an
//! injectable lookup so tests never touch real environment variables.
//! Unparseable values keep the default and are logged.

use planeja_types::config::AppConfig;
use tracing::warn;

pub fn load_config() -> AppConfig {
    load_config_with(|key| std::env::var(key).ok())
}

pub fn load_config_with(lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    let mut config = AppConfig::default();

    if let Some(host) = lookup("HOST") {
        config.server.host = host;
    }
    if let Some(port) = parse(&lookup, "PORT") {
        config.server.port = port;
    }

    if let Some(name) = lookup("REFRESH_COOKIE_NAME") {
        config.cookie.name = name;
    }
    if let Some(secure) = parse_bool(&lookup, "COOKIE_SECURE") {
        config.cookie.secure = secure;
    }
    if let Some(same_site) = lookup("COOKIE_SAMESITE") {
        config.cookie.same_site = same_site;
    }
    if let Some(domain) = lookup("COOKIE_DOMAIN") {
        config.cookie.domain = Some(domain);
    }
    if let Some(days) = parse(&lookup, "REFRESH_TOKEN_EXPIRY_DAYS") {
        config.cookie.max_age_days = days;
    }

    if let Some(secret) = lookup("SESSION_SECRET") {
        config.auth.token_secret = secret;
    }
    if let Some(minutes) = parse(&lookup, "ACCESS_TOKEN_TTL_MINUTES") {
        config.auth.access_ttl_minutes = minutes;
    }

    if let Some(secs) = parse(&lookup, "TOKEN_CLEANUP_INTERVAL_SECS") {
        config.sweep.interval_secs = secs;
    }
    if let Some(secs) = parse(&lookup, "SWEEP_PROBE_TIMEOUT_SECS") {
        config.sweep.probe_timeout_secs = secs;
    }

    config
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "unparseable environment value, keeping default");
            None
        }
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => {
            warn!(key, value = %raw, "unparseable boolean, keeping default");
            None
        }
    }
}
