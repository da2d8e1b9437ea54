//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub public_url: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub pg_pool_max: u32,
    pub log_level: Level,
    pub redis_url: String,
    pub policy_path: PathBuf,
    pub cors_origin: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub media: MediaConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database Settings ---
        let bind_address = parse::<SocketAddr>("BIND_ADDRESS", &or_default("BIND_ADDRESS", "0.0.0.0:8080"))?;
        let database_url = required("DATABASE_URL")?;
        let pg_pool_max = parse::<u32>("PG_POOL_MAX", &or_default("PG_POOL_MAX", "10"))?;
        if pg_pool_max == 0 {
            return Err(ConfigError::InvalidValue(
                "PG_POOL_MAX".to_string(),
                "pool size must be at least 1".to_string(),
            ));
        }

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let redis_url = or_default("REDIS_URL", "redis://127.0.0.1:6379");
        let policy_path = PathBuf::from(or_default("POLICY_PATH", "./config/policy.csv"));
        let cors_origin = or_default("CORS_ORIGIN", "*");

        // --- Token Settings ---
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            ttl_hours: parse::<i64>("JWT_TTL_HOURS", &or_default("JWT_TTL_HOURS", "720"))?,
        };
        if jwt.ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "JWT_TTL_HOURS".to_string(),
                "token lifetime must be positive".to_string(),
            ));
        }

        // --- SMTP Relay ---
        let smtp_username = required("SMTP_USERNAME")?;
        let smtp = SmtpConfig {
            host: or_default("SMTP_HOST", "smtp.gmail.com"),
            port: parse::<u16>("SMTP_PORT", &or_default("SMTP_PORT", "587"))?,
            password: required("SMTP_PASSWORD")?,
            from: lookup("SMTP_FROM").unwrap_or_else(|| smtp_username.clone()),
            username: smtp_username,
        };

        // --- Object Storage ---
        let media_endpoint = or_default("MEDIA_ENDPOINT", "http://minio:9000");
        let media = MediaConfig {
            region: or_default("MEDIA_REGION", "us-east-1"),
            bucket: or_default("MEDIA_BUCKET", "photos"),
            access_key: required("MEDIA_ACCESS_KEY")?,
            secret_key: required("MEDIA_SECRET_KEY")?,
            public_url: lookup("MEDIA_PUBLIC_URL").unwrap_or_else(|| media_endpoint.clone()),
            endpoint: media_endpoint,
        };

        Ok(Self {
            bind_address,
            database_url,
            pg_pool_max,
            log_level,
            redis_url,
            policy_path,
            cors_origin,
            jwt,
            smtp,
            media,
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
