//! Phone verification service module
//!
//! This module provides the one-time code workflow for phone numbers:
//! - Code generation and issuance with a bounded code history
//! - Atomic verification with attempt counting and lockout
//! - Periodic sweep of expired in-memory records

mod cleanup;
mod config;
mod service;
mod state_machine;
mod types;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupConfig, CleanupResult, OtpCleanupService};
pub use config::VerificationServiceConfig;
pub use service::VerificationService;
pub use state_machine::{evaluate_attempt, AttemptPolicy, MIN_LOCKOUT_MINUTES};
pub use types::{FailureReason, VerificationOutcome, VerificationResult};
