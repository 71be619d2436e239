//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;

use crate::constants::{
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_LOG_FILTER, DEFAULT_STATUS_WRITE_ATTEMPTS,
};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub homework: HomeworkConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter, overridden by RUST_LOG at subscriber init
    pub rust_log: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// Homework registry behavior
#[derive(Debug, Clone)]
pub struct HomeworkConfig {
    /// Attempts for a status-table compare-and-set before giving up with a conflict
    pub status_write_attempts: u32,
    /// Whether the startup reconciliation pass repairs what it finds
    pub repair_on_reconcile: bool,
}

impl Default for HomeworkConfig {
    fn default() -> Self {
        Self {
            status_write_attempts: DEFAULT_STATUS_WRITE_ATTEMPTS,
            repair_on_reconcile: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            homework: HomeworkConfig::from_env()?,
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DEFAULT_DATABASE_MAX_CONNECTIONS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()))?,
        })
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

impl HomeworkConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let status_write_attempts = parse_attempts(
            &env::var("HOMEWORK_STATUS_WRITE_ATTEMPTS")
                .unwrap_or_else(|_| DEFAULT_STATUS_WRITE_ATTEMPTS.to_string()),
        )?;

        let repair_on_reconcile = match env::var("RECONCILE_REPAIR") {
            Ok(v) => parse_flag(&v)
                .ok_or_else(|| ConfigError::InvalidValue("RECONCILE_REPAIR".to_string()))?,
            Err(_) => false,
        };

        Ok(Self {
            status_write_attempts,
            repair_on_reconcile,
        })
    }
}

fn parse_attempts(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ConfigError::InvalidValue(
            "HOMEWORK_STATUS_WRITE_ATTEMPTS".to_string(),
        )),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let homework = HomeworkConfig::default();
        assert_eq!(homework.status_write_attempts, 5);
        assert!(!homework.repair_on_reconcile);
    }

    #[test]
    fn test_write_attempts_must_be_positive() {
        assert_eq!(parse_attempts("3").unwrap(), 3);
        assert!(matches!(parse_attempts("0"), Err(ConfigError::InvalidValue(_))));
        assert!(matches!(parse_attempts("many"), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_flags() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("sometimes"), None);
    }
}
