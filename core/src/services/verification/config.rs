//! Configuration for the verification service

use chrono::Duration;
use pv_shared::config::{OtpConfig, MAX_CODE_TTL_SECONDS, MAX_LOCKOUT_MINUTES};

use crate::domain::entities::otp_record::{
    CODE_HISTORY_LIMIT, DEFAULT_TTL_SECONDS, LOCKOUT_MINUTES, MAX_ATTEMPTS,
};

use super::state_machine::AttemptPolicy;

/// Configuration for the verification service
#[derive(Debug, Clone)]
pub struct VerificationServiceConfig {
    /// Validity window used by `issue_new_code`
    pub code_ttl: Duration,
    /// Consecutive failed attempts that trigger a lockout
    pub max_attempts: u32,
    /// How long a lockout lasts
    pub lockout_duration: Duration,
    /// Number of recently issued codes kept per phone number
    pub code_history_limit: usize,
    /// Whether `peek` may reveal the latest code (development only)
    pub debug_peek: bool,
}

impl Default for VerificationServiceConfig {
    fn default() -> Self {
        Self {
            code_ttl: Duration::seconds(DEFAULT_TTL_SECONDS),
            max_attempts: MAX_ATTEMPTS,
            lockout_duration: Duration::minutes(LOCKOUT_MINUTES),
            code_history_limit: CODE_HISTORY_LIMIT,
            debug_peek: false,
        }
    }
}

impl VerificationServiceConfig {
    /// Lockout rules applied by the verification state machine
    pub fn attempt_policy(&self) -> AttemptPolicy {
        AttemptPolicy::new(self.max_attempts, self.lockout_duration)
    }
}

/// Longest validity window `issue` accepts
pub(crate) fn max_code_ttl() -> Duration {
    Duration::seconds(i64::try_from(MAX_CODE_TTL_SECONDS).unwrap_or(DEFAULT_TTL_SECONDS))
}

/// Out-of-range values are clamped; `OtpConfig::validate` reports them instead.
impl From<&OtpConfig> for VerificationServiceConfig {
    fn from(config: &OtpConfig) -> Self {
        let ttl_seconds = config.code_ttl_seconds.clamp(1, MAX_CODE_TTL_SECONDS);
        let lockout_minutes = config.lockout_minutes.clamp(1, MAX_LOCKOUT_MINUTES);

        Self {
            code_ttl: Duration::seconds(
                i64::try_from(ttl_seconds).unwrap_or(DEFAULT_TTL_SECONDS),
            ),
            max_attempts: config.max_attempts.max(1),
            lockout_duration: Duration::minutes(lockout_minutes),
            code_history_limit: config.code_history_limit,
            debug_peek: config.debug_peek,
        }
    }
}
