//! Application configuration.
//!
//! Defaults: cookie `refreshToken`, SameSite=Lax, 7-day refresh expiry,
//! hourly sweep. Values are loaded from the environment by
//! `planeja_infra::config`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cookie: CookieConfig,
    pub auth: AuthConfig,
    pub sweep: SweepConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cookie: CookieConfig::default(),
            auth: AuthConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Refresh-credential cookie attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
    pub same_site: String,
    pub domain: Option<String>,
    pub max_age_days: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "refreshToken".to_string(),
            secure: false,
            same_site: "Lax".to_string(),
            domain: None,
            max_age_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for access-token signing.
    pub token_secret: String,
    /// Access token lifetime in minutes.
    pub access_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: "change-this-in-production".to_string(),
            access_ttl_minutes: 15,
        }
    }
}

/// Expiry sweeper timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub interval_secs: u64,
    /// Upper bound on the connectivity probe before a cycle is skipped.
    pub probe_timeout_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            probe_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cookie.name, "refreshToken");
        assert_eq!(config.cookie.same_site, "Lax");
        assert_eq!(config.cookie.max_age_days, 7);
        assert!(!config.cookie.secure);
        assert_eq!(config.sweep.interval_secs, 3600);
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"cookie":{"secure":true}}"#).unwrap();
        assert!(config.cookie.secure);
        assert_eq!(config.cookie.name, "refreshToken");
        assert_eq!(config.auth.access_ttl_minutes, 15);
    }
}
