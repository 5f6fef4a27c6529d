use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use brochure_core::auth::{Account, AccountDirectory, Role, TokenSettings};
use brochure_core::rate_limit::{Limit, RateLimitConfig};
use brochure_core::upload::{UploadPolicy, DEFAULT_MAX_UPLOAD_BYTES};

const DEV_JWT_SECRET: &str = "dev-secret-change-me-in-production";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub upload_token_ttl_secs: i64,
    pub csrf_token_ttl_secs: i64,
    /// The administrator account. Login is disabled when unset.
    pub admin_email: Option<String>,
    /// argon2 PHC string for `admin_email`.
    pub admin_password_hash: Option<String>,
    /// Directory uploaded files are written to.
    pub upload_dir: PathBuf,
    /// Public URL prefix the upload directory is served under.
    pub upload_base_url: String,
    pub upload_max_bytes: usize,
    pub upload_allow_pdf: bool,
    pub login_rate_limit: u32,
    pub contact_rate_limit: u32,
    pub rate_limit_window_secs: u64,
    /// Key rate limits on `X-Forwarded-For` / `X-Real-IP`. Only set behind a
    /// reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    /// Mark session cookies `Secure` (HTTPS only).
    pub secure_cookies: bool,
    /// Add internal error detail to 500 responses.
    pub debug: bool,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
            database_url: String::new(),
            db_max_connections: 20,
            db_min_connections: 1,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 7 * 24 * 3600,
            upload_token_ttl_secs: 900,
            csrf_token_ttl_secs: brochure_core::csrf::DEFAULT_TOKEN_TTL_SECS,
            admin_email: None,
            admin_password_hash: None,
            upload_dir: PathBuf::from("./public/uploads"),
            upload_base_url: "/uploads".to_string(),
            upload_max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_allow_pdf: false,
            login_rate_limit: 5,
            contact_rate_limit: 3,
            rate_limit_window_secs: 900,
            trust_proxy_headers: false,
            secure_cookies: false,
            debug: false,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let debug = parse_bool(&var, "DEBUG", defaults.debug)?;
        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if debug => defaults.jwt_secret.clone(),
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse(&var, "PORT", defaults.port)?,
            database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            db_max_connections: parse(&var, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_min_connections: parse(&var, "DB_MIN_CONNECTIONS", defaults.db_min_connections)?,
            jwt_secret,
            access_token_ttl_secs: parse(&var, "ACCESS_TOKEN_TTL_SECS", defaults.access_token_ttl_secs)?,
            refresh_token_ttl_secs: parse(&var, "REFRESH_TOKEN_TTL_SECS", defaults.refresh_token_ttl_secs)?,
            upload_token_ttl_secs: parse(&var, "UPLOAD_TOKEN_TTL_SECS", defaults.upload_token_ttl_secs)?,
            csrf_token_ttl_secs: parse(&var, "CSRF_TOKEN_TTL_SECS", defaults.csrf_token_ttl_secs)?,
            admin_email: var("ADMIN_EMAIL"),
            admin_password_hash: var("ADMIN_PASSWORD_HASH"),
            upload_dir: var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            upload_base_url: var("UPLOAD_BASE_URL").unwrap_or(defaults.upload_base_url),
            upload_max_bytes: parse(&var, "UPLOAD_MAX_BYTES", defaults.upload_max_bytes)?,
            upload_allow_pdf: parse_bool(&var, "UPLOAD_ALLOW_PDF", defaults.upload_allow_pdf)?,
            login_rate_limit: parse(&var, "LOGIN_RATE_LIMIT", defaults.login_rate_limit)?,
            contact_rate_limit: parse(&var, "CONTACT_RATE_LIMIT", defaults.contact_rate_limit)?,
            rate_limit_window_secs: parse(&var, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs)?,
            trust_proxy_headers: parse_bool(&var, "TRUST_PROXY_HEADERS", defaults.trust_proxy_headers)?,
            secure_cookies: parse_bool(&var, "SECURE_COOKIES", defaults.secure_cookies)?,
            debug,
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            secret: self.jwt_secret.clone(),
            access_ttl_secs: self.access_token_ttl_secs,
            refresh_ttl_secs: self.refresh_token_ttl_secs,
            upload_ttl_secs: self.upload_token_ttl_secs,
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.upload_max_bytes,
            allow_pdf: self.upload_allow_pdf,
        }
    }

    pub fn rate_limits(&self) -> RateLimitConfig {
        let window = Duration::from_secs(self.rate_limit_window_secs);
        RateLimitConfig {
            login: Limit {
                max_requests: self.login_rate_limit,
                window,
            },
            contact: Limit {
                max_requests: self.contact_rate_limit,
                window,
            },
        }
    }

    pub fn accounts(&self) -> AccountDirectory {
        match (&self.admin_email, &self.admin_password_hash) {
            (Some(email), Some(hash)) => AccountDirectory::new(vec![Account {
                email: email.clone(),
                password_hash: hash.clone(),
                role: Role::Admin,
            }]),
            _ => AccountDirectory::default(),
        }
    }
}

fn parse<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn parse_bool(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/cms"), ("JWT_SECRET", "k")]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:3030");
        assert_eq!(config.upload_max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.rate_limits().login.max_requests, 5);
        assert!(config.accounts().is_empty());
        assert!(!config.trust_proxy_headers);

        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/cms"),
            ("JWT_SECRET", "k"),
            ("TRUST_PROXY_HEADERS", "true"),
        ])
        .unwrap();
        assert!(config.trust_proxy_headers);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/cms"),
            ("JWT_SECRET", "k"),
            ("PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/cms"),
            ("JWT_SECRET", "k"),
            ("SECURE_COOKIES", "maybe"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SECURE_COOKIES", .. }));
    }

    #[test]
    fn secrets_are_required_outside_debug() {
        assert!(matches!(
            load(&[("JWT_SECRET", "k")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://x")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
        let config = load(&[("DATABASE_URL", "postgres://x"), ("DEBUG", "true")]).unwrap();
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
    }
}
