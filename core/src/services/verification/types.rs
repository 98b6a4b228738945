//! Types for verification results

use serde::{Deserialize, Serialize};

/// Outcome of a single verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The code matched; the record has been consumed
    Verified,
    /// No record exists (never issued, consumed or evicted)
    NotFound,
    /// The issuance window has passed; the record has been removed
    Expired,
    /// Verification is blocked for the given number of whole minutes
    LockedOut { remaining_minutes: i64 },
    /// Wrong code; this many attempts remain before a lockout
    Mismatch { attempts_left: u32 },
}

/// Reason a verification did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    NotFound,
    Expired,
    LockedOut,
    Mismatch,
}

/// Result of verifying a code, in the shape returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether the verification was successful
    pub ok: bool,
    /// Why the verification failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    /// Attempts remaining before a lockout (mismatch only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_left: Option<u32>,
    /// Minutes until the lockout ends (lockout only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<i64>,
}

impl VerificationResult {
    fn failed(reason: FailureReason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            attempts_left: None,
            remaining_minutes: None,
        }
    }
}

impl From<VerificationOutcome> for VerificationResult {
    fn from(outcome: VerificationOutcome) -> Self {
        match outcome {
            VerificationOutcome::Verified => Self {
                ok: true,
                reason: None,
                attempts_left: None,
                remaining_minutes: None,
            },
            VerificationOutcome::NotFound => Self::failed(FailureReason::NotFound),
            VerificationOutcome::Expired => Self::failed(FailureReason::Expired),
            VerificationOutcome::LockedOut { remaining_minutes } => Self {
                remaining_minutes: Some(remaining_minutes),
                ..Self::failed(FailureReason::LockedOut)
            },
            VerificationOutcome::Mismatch { attempts_left } => Self {
                attempts_left: Some(attempts_left),
                ..Self::failed(FailureReason::Mismatch)
            },
        }
    }
}
