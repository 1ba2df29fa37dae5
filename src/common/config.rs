// src/common/config.rs
//! Process configuration, read once at startup and immutable afterwards.

use std::env;
use std::time::Duration;
use thiserror::Error;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Minimum HS256 key length in bytes.
const MIN_JWT_SECRET_LEN: usize = 32;

/// Longest session token lifetime we accept (one year).
const MAX_JWT_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// OAuth client settings for the Google identity provider
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub google: GoogleConfig,
    pub oauth_timeout: Duration,
    pub session_ttl: Duration,
    pub session_cookie_secure: bool,
    pub require_verified_email: bool,
    pub cors_origins: Vec<String>,
    pub reset_db: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                reason: format!("must be at least {} bytes", MIN_JWT_SECRET_LEN),
            });
        }

        let jwt_ttl_secs = parse_or(get("JWT_EXPIRATION_TIME"), "JWT_EXPIRATION_TIME", 86_400)?;
        if jwt_ttl_secs == 0 || jwt_ttl_secs > MAX_JWT_TTL_SECS {
            return Err(ConfigError::Invalid {
                key: "JWT_EXPIRATION_TIME",
                reason: format!("must be between 1 and {} seconds", MAX_JWT_TTL_SECS),
            });
        }

        let google = GoogleConfig {
            client_id: get("GOOGLE_CLIENT_ID").ok_or(ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            client_secret: get("GOOGLE_CLIENT_SECRET")
                .ok_or(ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            redirect_url: or(
                "GOOGLE_REDIRECT_URL",
                "http://localhost:8080/api/v1/auth/google/callback",
            ),
            auth_url: or("GOOGLE_AUTH_URL", GOOGLE_AUTH_URL),
            token_url: or("GOOGLE_TOKEN_URL", GOOGLE_TOKEN_URL),
            userinfo_url: or("GOOGLE_USERINFO_URL", GOOGLE_USERINFO_URL),
        };

        Ok(Self {
            port: parse_or(get("PORT"), "PORT", 8080)?,
            database_url: or("DATABASE_URL", "sqlite://pets_api.db"),
            jwt_secret,
            jwt_ttl: Duration::from_secs(jwt_ttl_secs),
            google,
            oauth_timeout: Duration::from_secs(parse_or(
                get("OAUTH_TIMEOUT_SECONDS"),
                "OAUTH_TIMEOUT_SECONDS",
                10,
            )?),
            session_ttl: Duration::from_secs(parse_or(
                get("SESSION_TTL_SECONDS"),
                "SESSION_TTL_SECONDS",
                600,
            )?),
            session_cookie_secure: parse_or(
                get("SESSION_COOKIE_SECURE"),
                "SESSION_COOKIE_SECURE",
                false,
            )?,
            require_verified_email: parse_or(
                get("REQUIRE_VERIFIED_EMAIL"),
                "REQUIRE_VERIFIED_EMAIL",
                true,
            )?,
            cors_origins: or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            reset_db: parse_or(get("RESET_DB"), "RESET_DB", false)?,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("GOOGLE_CLIENT_ID", "client-id"),
            ("GOOGLE_CLIENT_SECRET", "client-secret"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base()).expect("config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_ttl, Duration::from_secs(86_400));
        assert_eq!(config.session_ttl, Duration::from_secs(600));
        assert!(config.require_verified_email);
        assert!(!config.session_cookie_secure);
        assert_eq!(config.google.token_url, GOOGLE_TOKEN_URL);
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
    }

    #[test]
    fn test_missing_secret_rejected() {
        let mut vars = base();
        vars.remove("JWT_SECRET");

        assert!(matches!(load(&vars), Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut vars = base();
        vars.insert("JWT_SECRET", "too-short");

        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { key: "JWT_SECRET", .. })
        ));
    }

    #[test]
    fn test_overrides_parsed() {
        let mut vars = base();
        vars.insert("JWT_EXPIRATION_TIME", "3600");
        vars.insert("REQUIRE_VERIFIED_EMAIL", "FALSE");
        vars.insert("CORS_ORIGINS", "http://a.test, http://b.test,");

        let config = load(&vars).expect("config should load");
        assert_eq!(config.jwt_ttl, Duration::from_secs(3600));
        assert!(!config.require_verified_email);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_token_lifetime_bounded() {
        for value in ["0", "1000000000000000", "31536001"] {
            let mut vars = base();
            vars.insert("JWT_EXPIRATION_TIME", value);
            assert!(matches!(
                load(&vars),
                Err(ConfigError::Invalid { key: "JWT_EXPIRATION_TIME", .. })
            ));
        }

        let mut vars = base();
        vars.insert("JWT_EXPIRATION_TIME", "31536000");
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn test_bad_number_rejected() {
        let mut vars = base();
        vars.insert("PORT", "eighty");

        assert!(matches!(load(&vars), Err(ConfigError::Invalid { key: "PORT", .. })));
    }
}
