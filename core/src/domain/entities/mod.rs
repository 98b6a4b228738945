//! Domain entities representing core business objects.

pub mod otp_record;


// Re-export commonly used types
pub use otp_record::{
    IssuedCode, OtpRecord,
    CODE_HISTORY_LIMIT, CODE_LENGTH, DEFAULT_TTL_SECONDS, LOCKOUT_MINUTES, MAX_ATTEMPTS,
};
