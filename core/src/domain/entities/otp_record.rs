//! OTP record entity for phone verification.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use pv_shared::utils::phone::normalize_code;
use serde::{Deserialize, Serialize};

/// Maximum number of consecutive failed verification attempts before lockout
pub const MAX_ATTEMPTS: u32 = 3;

/// Lockout duration after reaching the attempt limit (10 minutes)
pub const LOCKOUT_MINUTES: i64 = 10;

/// Number of most-recently-issued codes kept per record
pub const CODE_HISTORY_LIMIT: usize = 5;

/// Length of a generated verification code
pub const CODE_LENGTH: usize = 6;

/// Default validity window for an issued code (5 minutes)
pub const DEFAULT_TTL_SECONDS: i64 = 300;

/// A single issued code with its issuance time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCode {
    /// The code as it was sent to the user
    pub code: String,

    /// When the code was issued
    pub issued_at: DateTime<Utc>,
}

/// Verification state for one canonical phone number
///
/// All codes in `codes` share the single `expires_at` of the latest issuance,
/// so an older code stays matchable until that expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    /// Recently issued codes, oldest first
    pub codes: Vec<IssuedCode>,

    /// Expiry of the current issuance window
    pub expires_at: DateTime<Utc>,

    /// Consecutive failed attempts since the last issuance or lockout reset
    pub attempts: u32,

    /// Verification is blocked until this instant when set
    #[serde(default)]
    pub lockout_until: Option<DateTime<Utc>>,
}

impl OtpRecord {
    /// Creates a record holding a single freshly issued code
    pub fn new(code: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            codes: vec![IssuedCode {
                code: code.into(),
                issued_at: now,
            }],
            expires_at: offset(now, ttl),
            attempts: 0,
            lockout_until: None,
        }
    }

    /// Applies an issuance on top of an existing record (or starts a new one)
    pub fn issue(
        existing: Option<Self>,
        code: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
        history_limit: usize,
    ) -> Self {
        match existing {
            Some(mut record) => {
                record.record_issue(code, now, ttl, history_limit);
                record
            }
            None => Self::new(code, now, ttl),
        }
    }

    /// Appends a new code, caps the history, renews the expiry and resets abuse counters
    pub fn record_issue(
        &mut self,
        code: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
        history_limit: usize,
    ) {
        self.codes.push(IssuedCode {
            code: code.into(),
            issued_at: now,
        });

        let limit = history_limit.max(1);
        if self.codes.len() > limit {
            let overflow = self.codes.len() - limit;
            self.codes.drain(..overflow);
        }

        self.expires_at = offset(now, ttl);
        self.attempts = 0;
        self.lockout_until = None;
    }

    /// Checks if the issuance window has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Checks if a lockout is set and still in the future
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lockout_until, Some(until) if until > now)
    }

    /// Checks if a lockout is set but has already passed
    pub fn lockout_elapsed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lockout_until, Some(until) if until <= now)
    }

    /// Whole minutes (rounded up) until an active lockout ends
    pub fn lockout_remaining_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        let until = self.lockout_until.filter(|until| *until > now)?;
        let millis = (until - now).num_milliseconds();
        Some((millis + 59_999) / 60_000)
    }

    /// Clears an elapsed lockout together with the attempt counter
    pub fn clear_lockout(&mut self) {
        self.lockout_until = None;
        self.attempts = 0;
    }

    /// Records a failed attempt, locking the record once `max_attempts` is reached
    ///
    /// Returns `true` when this failure triggered the lockout.
    pub fn register_failure(
        &mut self,
        now: DateTime<Utc>,
        max_attempts: u32,
        lockout: Duration,
    ) -> bool {
        self.attempts = (self.attempts + 1).min(max_attempts);
        if self.attempts >= max_attempts {
            self.lockout_until = Some(offset(now, lockout));
            true
        } else {
            false
        }
    }

    /// Checks a submitted code against every stored code
    ///
    /// Both sides are normalized first; each comparison is constant-time.
    pub fn matches(&self, submitted: &str) -> bool {
        let submitted = normalize_code(submitted);
        if submitted.is_empty() {
            return false;
        }

        self.codes.iter().any(|issued| {
            let stored = normalize_code(&issued.code);
            stored.len() == submitted.len()
                && constant_time_eq(stored.as_bytes(), submitted.as_bytes())
        })
    }

    /// The most recently issued code
    pub fn latest_code(&self) -> Option<&str> {
        self.codes.last().map(|issued| issued.code.as_str())
    }
}

/// `now + by`, saturating at the bounds of the representable range
fn offset(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    now.checked_add_signed(by).unwrap_or(if by < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
