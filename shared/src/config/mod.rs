//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `database` - Durable store connection and pool configuration
//! - `environment` - Environment detection and logging configuration
//! - `otp` - Code validity, lockout, failover and sweeper settings

pub mod database;
pub mod environment;
pub mod otp;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Re-export commonly used types
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use otp::{OtpConfig, MAX_CODE_TTL_SECONDS, MAX_LOCKOUT_MINUTES};

/// Parse an environment variable, falling back to `default` when unset or invalid
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Durable store configuration
    pub database: DatabaseConfig,

    /// Phone verification configuration
    #[serde(default)]
    pub otp: OtpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            otp: OtpConfig::for_environment(env),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::new("mysql://localhost:3306/phone_verification_dev"),
            otp: OtpConfig::for_environment(Environment::Development),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::new("mysql://prod-db:3306/phone_verification")
                .with_max_connections(50),
            otp: OtpConfig::for_environment(Environment::Production),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Reads the environment's `.env` file (and a plain `.env`) first when present.
    pub fn from_env() -> Self {
        let env = Environment::from_env();
        dotenvy::from_filename(env.env_file()).ok();
        dotenvy::dotenv().ok();

        Self {
            environment: env,
            database: DatabaseConfig::from_env(),
            otp: OtpConfig::from_env(env),
            logging: LoggingConfig::from_env(env),
        }
    }
}
