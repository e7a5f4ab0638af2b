use std::env;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_AUTH_BURST: u32 = 10;
const DEFAULT_AUTH_REPLENISH_MS: u64 = 500;
const DEV_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("demo verification modes cannot be enabled when RUST_ENV=production")]
    DemoInProduction,
}

/// How signup proves ownership of an email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Send the code by email. The only mode allowed in production.
    Email,
    /// Skip the email and return the code in the API response.
    DemoExposeCode,
    /// Verify accounts at signup and hand out a session right away.
    DemoAutoVerify,
}

impl VerificationMode {
    pub fn is_demo(&self) -> bool {
        !matches!(self, VerificationMode::Email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Per-client token bucket for the `/auth` routes. Both values are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub burst_size: u32,
    pub replenish_ms: u64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            burst_size: DEFAULT_AUTH_BURST,
            replenish_ms: DEFAULT_AUTH_REPLENISH_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub production: bool,
    pub jwt_secret: String,
    pub verification_mode: VerificationMode,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout: Duration,
    pub auth_rate_limit: RateLimit,
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/ticketa".to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            port: DEFAULT_PORT,
            production: false,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            verification_mode: VerificationMode::Email,
            cors_allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            auth_rate_limit: RateLimit::default(),
            smtp: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| var(key).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let production = var("RUST_ENV")
            .is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let database_url = var("DATABASE_URL")
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => DEV_JWT_SECRET.to_string(),
        };

        let verification_mode = if flag("DEMO_AUTO_VERIFY") {
            VerificationMode::DemoAutoVerify
        } else if flag("DEMO_MODE") {
            VerificationMode::DemoExposeCode
        } else {
            VerificationMode::Email
        };
        if production && verification_mode.is_demo() {
            return Err(ConfigError::DemoInProduction);
        }

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", var("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
                from: var("MAIL_FROM").ok_or(ConfigError::Missing("MAIL_FROM"))?,
            }),
            None if production => return Err(ConfigError::Missing("SMTP_HOST")),
            None => None,
        };

        let cors_allowed_origins = match var("CORS_ALLOWED_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => split_origins(DEFAULT_ALLOWED_ORIGINS),
        };

        let timeout_secs = parse_or(
            "REQUEST_TIMEOUT_SECS",
            var("REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let auth_rate_limit = RateLimit {
            burst_size: parse_non_zero(
                "AUTH_RATE_LIMIT_BURST",
                var("AUTH_RATE_LIMIT_BURST"),
                DEFAULT_AUTH_BURST,
            )?,
            replenish_ms: parse_non_zero(
                "AUTH_RATE_LIMIT_REPLENISH_MS",
                var("AUTH_RATE_LIMIT_REPLENISH_MS"),
                DEFAULT_AUTH_REPLENISH_MS,
            )?,
        };

        Ok(Self {
            database_url,
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                var("DB_MAX_CONNECTIONS"),
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            production,
            jwt_secret,
            verification_mode,
            cors_allowed_origins,
            request_timeout: Duration::from_secs(timeout_secs),
            auth_rate_limit,
            smtp,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var: name, value }),
        None => Ok(default),
    }
}

fn parse_non_zero<T>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq + ToString,
{
    let value = parse_or(name, raw, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var: name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Every listed origin must be usable as a header value.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins = split_origins(raw);
    if origins.is_empty() {
        return Err(ConfigError::Invalid {
            var: "CORS_ALLOWED_ORIGINS",
            value: raw.to_string(),
        });
    }
    for origin in &origins {
        if origin.parse::<HeaderValue>().is_err() {
            return Err(ConfigError::Invalid {
                var: "CORS_ALLOWED_ORIGINS",
                value: origin.clone(),
            });
        }
    }
    Ok(origins)
}
