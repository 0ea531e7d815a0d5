use std::env;
use std::str::FromStr;

use chrono::{Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
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
    /// HS256 secret for admin bearer tokens.
    pub jwt_secret: String,
    /// Event bus channel capacity.
    pub event_bus_capacity: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    /// Origin used when building shareable preview URLs.
    pub public_base_url: String,
    /// Lifetime of a preview link when the request names no expiry.
    pub preview_default_ttl_hours: i64,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_var("PORT", "3030", "u16")?;
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "20", "u32")?,
            db_min_connections: parse_var("DB_MIN_CONNECTIONS", "5", "u32")?,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me-in-production".to_string()),
            event_bus_capacity: parse_var("EVENT_BUS_CAPACITY", "1024", "usize")?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            preview_default_ttl_hours: parse_ttl_hours("PREVIEW_DEFAULT_TTL_HOURS", "72")?,
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public URL of a preview token.
    pub fn preview_url(&self, token: &str) -> String {
        format!("{}/preview/{token}", self.public_base_url.trim_end_matches('/'))
    }
}

fn parse_var<T: FromStr>(
    name: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value,
    })
}

/// A positive hour count that still yields a representable expiry.
fn parse_ttl_hours(name: &'static str, default: &str) -> Result<i64, ConfigError> {
    let hours: i64 = parse_var(name, default, "positive hour count")?;
    let representable = Duration::try_hours(hours)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .is_some();
    if hours <= 0 || !representable {
        return Err(ConfigError::Invalid {
            name,
            expected: "positive hour count",
            value: hours.to_string(),
        });
    }
    Ok(hours)
}
