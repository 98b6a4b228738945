//! Business services containing domain logic and use cases.

pub mod verification;

// Re-export commonly used types
pub use verification::{
    CleanupConfig, CleanupResult, FailureReason, OtpCleanupService, VerificationOutcome,
    VerificationResult, VerificationService, VerificationServiceConfig,
};
