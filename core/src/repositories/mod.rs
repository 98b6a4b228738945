pub mod otp;

pub use otp::{
    FailoverController, FailoverStore, InMemoryOtpStore, OtpStore, RecordChange, StorageBackend,
};
