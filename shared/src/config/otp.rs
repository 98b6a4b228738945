//! OTP issuance, verification and storage configuration

use serde::{Deserialize, Serialize};

use super::env_or;
use super::environment::Environment;

/// Longest accepted code validity window (one day)
pub const MAX_CODE_TTL_SECONDS: u64 = 86_400;

/// Longest accepted lockout (one week)
pub const MAX_LOCKOUT_MINUTES: i64 = 10_080;

/// Phone verification (OTP) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Validity window of an issued code in seconds
    #[serde(default = "default_code_ttl_seconds")]
    pub code_ttl_seconds: u64,

    /// Consecutive failed verifications before a lockout
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lockout duration in minutes
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,

    /// Number of recently issued codes kept per phone number
    #[serde(default = "default_code_history_limit")]
    pub code_history_limit: usize,

    /// Consecutive durable store failures before sticking to memory
    #[serde(default = "default_failover_threshold")]
    pub failover_threshold: u32,

    /// Interval of the in-memory cleanup sweep in seconds
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// Run the in-memory cleanup sweep
    #[serde(default = "default_true")]
    pub sweeper_enabled: bool,

    /// Allow reading back the latest issued code (development only)
    #[serde(default)]
    pub debug_peek: bool,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_ttl_seconds: default_code_ttl_seconds(),
            max_attempts: default_max_attempts(),
            lockout_minutes: default_lockout_minutes(),
            code_history_limit: default_code_history_limit(),
            failover_threshold: default_failover_threshold(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            sweeper_enabled: true,
            debug_peek: false,
        }
    }
}

impl OtpConfig {
    /// Configuration suited to the given environment
    pub fn for_environment(env: Environment) -> Self {
        Self {
            debug_peek: env.is_development(),
            ..Default::default()
        }
    }

    /// Create from environment variables, falling back to environment defaults
    pub fn from_env(env: Environment) -> Self {
        let defaults = Self::for_environment(env);

        Self {
            code_ttl_seconds: env_or("OTP_TTL_SECONDS", defaults.code_ttl_seconds),
            max_attempts: env_or("OTP_MAX_ATTEMPTS", defaults.max_attempts),
            lockout_minutes: env_or("OTP_LOCKOUT_MINUTES", defaults.lockout_minutes),
            failover_threshold: env_or("OTP_FAILOVER_THRESHOLD", defaults.failover_threshold),
            sweep_interval_seconds: env_or(
                "OTP_SWEEP_INTERVAL_SECONDS",
                defaults.sweep_interval_seconds,
            ),
            ..defaults
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.code_ttl_seconds == 0 || self.code_ttl_seconds > MAX_CODE_TTL_SECONDS {
            return Err(format!(
                "otp.code_ttl_seconds must be between 1 and {}",
                MAX_CODE_TTL_SECONDS
            ));
        }
        if self.max_attempts == 0 {
            return Err("otp.max_attempts must be > 0".into());
        }
        if self.lockout_minutes <= 0 || self.lockout_minutes > MAX_LOCKOUT_MINUTES {
            return Err(format!(
                "otp.lockout_minutes must be between 1 and {}",
                MAX_LOCKOUT_MINUTES
            ));
        }
        if self.code_history_limit == 0 {
            return Err("otp.code_history_limit must be > 0".into());
        }
        if self.failover_threshold == 0 {
            return Err("otp.failover_threshold must be > 0".into());
        }
        if self.sweeper_enabled && self.sweep_interval_seconds == 0 {
            return Err("otp.sweep_interval_seconds must be > 0 when the sweeper is enabled".into());
        }
        Ok(())
    }
}

fn default_code_ttl_seconds() -> u64 {
    300 // 5 minutes
}

fn default_max_attempts() -> u32 {
    3
}

fn default_lockout_minutes() -> i64 {
    10
}

fn default_code_history_limit() -> usize {
    5
}

fn default_failover_threshold() -> u32 {
    3
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_true() -> bool {
    true
}
