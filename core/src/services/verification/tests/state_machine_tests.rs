//! Unit tests for the verification state machine

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::entities::otp_record::OtpRecord;
use crate::repositories::otp::RecordChange;
use crate::services::verification::{evaluate_attempt, AttemptPolicy, VerificationOutcome};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn policy() -> AttemptPolicy {
    AttemptPolicy {
        max_attempts: 3,
        lockout: Duration::minutes(10),
    }
}

fn record() -> OtpRecord {
    OtpRecord::new("482913", t0(), Duration::minutes(5))
}

#[test]
fn test_missing_record_is_not_found() {
    let (change, outcome) = evaluate_attempt(None, "482913", t0(), &policy());

    assert_eq!(change, RecordChange::Unchanged);
    assert_eq!(outcome, VerificationOutcome::NotFound);
}

#[test]
fn test_correct_code_consumes_record() {
    let (change, outcome) = evaluate_attempt(Some(record()), "482913", t0(), &policy());

    assert_eq!(change, RecordChange::Delete);
    assert_eq!(outcome, VerificationOutcome::Verified);
}

#[test]
fn test_code_valid_at_exact_expiry() {
    let now = t0() + Duration::minutes(5);
    let (_, outcome) = evaluate_attempt(Some(record()), "482913", now, &policy());

    assert_eq!(outcome, VerificationOutcome::Verified);
}

#[test]
fn test_expired_record_is_removed_even_with_correct_code() {
    let now = t0() + Duration::minutes(5) + Duration::milliseconds(1);
    let (change, outcome) = evaluate_attempt(Some(record()), "482913", now, &policy());

    assert_eq!(change, RecordChange::Delete);
    assert_eq!(outcome, VerificationOutcome::Expired);
}

#[test]
fn test_mismatch_counts_attempt() {
    let (change, outcome) = evaluate_attempt(Some(record()), "000000", t0(), &policy());

    assert_eq!(outcome, VerificationOutcome::Mismatch { attempts_left: 2 });
    match change {
        RecordChange::Put(updated) => {
            assert_eq!(updated.attempts, 1);
            assert!(updated.lockout_until.is_none());
        }
        other => panic!("expected Put, got {:?}", other),
    }
}

#[test]
fn test_third_mismatch_locks_in_same_write() {
    let mut seeded = record();
    seeded.attempts = 2;

    let (change, outcome) = evaluate_attempt(Some(seeded), "000000", t0(), &policy());

    assert_eq!(outcome, VerificationOutcome::LockedOut { remaining_minutes: 10 });
    match change {
        RecordChange::Put(updated) => {
            assert_eq!(updated.attempts, 3);
            assert_eq!(updated.lockout_until, Some(t0() + Duration::minutes(10)));
        }
        other => panic!("expected Put, got {:?}", other),
    }
}

#[test]
fn test_active_lockout_shadows_correct_code() {
    let mut locked = record();
    locked.attempts = 3;
    locked.lockout_until = Some(t0() + Duration::minutes(10));

    let now = t0() + Duration::seconds(30);
    let (change, outcome) = evaluate_attempt(Some(locked), "482913", now, &policy());

    assert_eq!(change, RecordChange::Unchanged);
    // 9m30s left rounds up to 10
    assert_eq!(outcome, VerificationOutcome::LockedOut { remaining_minutes: 10 });
}

#[test]
fn test_elapsed_lockout_is_cleared_before_matching() {
    let mut locked = OtpRecord::new("482913", t0(), Duration::minutes(30));
    locked.attempts = 3;
    locked.lockout_until = Some(t0() + Duration::minutes(10));

    let now = t0() + Duration::minutes(11);
    let (change, outcome) = evaluate_attempt(Some(locked), "482913", now, &policy());

    assert_eq!(change, RecordChange::Delete);
    assert_eq!(outcome, VerificationOutcome::Verified);
}

#[test]
fn test_elapsed_lockout_resets_attempts_on_mismatch() {
    let mut locked = OtpRecord::new("482913", t0(), Duration::minutes(30));
    locked.attempts = 3;
    locked.lockout_until = Some(t0() + Duration::minutes(10));

    let now = t0() + Duration::minutes(10);
    let (change, outcome) = evaluate_attempt(Some(locked), "111111", now, &policy());

    assert_eq!(outcome, VerificationOutcome::Mismatch { attempts_left: 2 });
    match change {
        RecordChange::Put(updated) => {
            assert_eq!(updated.attempts, 1);
            assert!(updated.lockout_until.is_none());
        }
        other => panic!("expected Put, got {:?}", other),
    }
}

#[test]
fn test_single_attempt_policy_locks_immediately() {
    let strict = AttemptPolicy {
        max_attempts: 1,
        lockout: Duration::minutes(2),
    };

    let (_, outcome) = evaluate_attempt(Some(record()), "000000", t0(), &strict);

    assert_eq!(outcome, VerificationOutcome::LockedOut { remaining_minutes: 2 });
}

#[test]
fn test_negative_lockout_still_locks() {
    let broken = AttemptPolicy {
        max_attempts: 3,
        lockout: Duration::minutes(-5),
    };
    let mut seeded = record();
    seeded.attempts = 2;

    let (change, outcome) = evaluate_attempt(Some(seeded), "000000", t0(), &broken);
    assert_eq!(outcome, VerificationOutcome::LockedOut { remaining_minutes: 1 });

    let RecordChange::Put(locked) = change else {
        panic!("expected Put, got {:?}", change);
    };
    assert_eq!(locked.lockout_until, Some(t0() + Duration::minutes(1)));

    let (_, outcome) = evaluate_attempt(Some(locked), "482913", t0(), &broken);
    assert_eq!(outcome, VerificationOutcome::LockedOut { remaining_minutes: 1 });
}
