//! Verification state machine
//!
//! Evaluated inside a single transactional upsert so that reading the record,
//! deciding the outcome and writing the new state are one atomic unit per phone.

use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::otp_record::OtpRecord;
use crate::repositories::otp::RecordChange;

use super::types::VerificationOutcome;

/// Shortest lockout the state machine applies, in minutes
pub const MIN_LOCKOUT_MINUTES: i64 = 1;

/// Lockout rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    /// Consecutive failures that trigger a lockout (at least 1)
    pub max_attempts: u32,
    /// Lockout duration (at least [`MIN_LOCKOUT_MINUTES`])
    pub lockout: Duration,
}

impl AttemptPolicy {
    /// Create a policy, raising non-positive values to their minimum
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout: lockout.max(Duration::minutes(MIN_LOCKOUT_MINUTES)),
        }
    }
}

/// Evaluate a submitted code against the stored record
///
/// Checks run in this order: missing record, active lockout (wins over a
/// correct code), elapsed lockout (cleared, evaluation continues), expiry,
/// match, mismatch. A mismatch that reaches `max_attempts` locks the record
/// in the same write and is reported as a lockout.
pub fn evaluate_attempt(
    record: Option<OtpRecord>,
    submitted: &str,
    now: DateTime<Utc>,
    policy: &AttemptPolicy,
) -> (RecordChange, VerificationOutcome) {
    // Fields are public, so re-apply the minimums
    let policy = AttemptPolicy::new(policy.max_attempts, policy.lockout);

    let Some(mut record) = record else {
        return (RecordChange::Unchanged, VerificationOutcome::NotFound);
    };

    if let Some(remaining_minutes) = record.lockout_remaining_minutes(now) {
        return (
            RecordChange::Unchanged,
            VerificationOutcome::LockedOut { remaining_minutes },
        );
    }

    if record.lockout_elapsed(now) {
        record.clear_lockout();
    }

    if record.is_expired(now) {
        return (RecordChange::Delete, VerificationOutcome::Expired);
    }

    if record.matches(submitted) {
        return (RecordChange::Delete, VerificationOutcome::Verified);
    }

    if record.register_failure(now, policy.max_attempts, policy.lockout) {
        let remaining_minutes = record
            .lockout_remaining_minutes(now)
            .unwrap_or_else(|| policy.lockout.num_minutes());
        (
            RecordChange::Put(record),
            VerificationOutcome::LockedOut { remaining_minutes },
        )
    } else {
        let attempts_left = policy.max_attempts.saturating_sub(record.attempts);
        (
            RecordChange::Put(record),
            VerificationOutcome::Mismatch { attempts_left },
        )
    }
}
