//! # Phone Verification Core
//!
//! Core domain layer of the phone verification (OTP) subsystem.
//! This crate contains the OTP record entity, the storage contract with its
//! in-memory backend and failover controller, the issuance/verification
//! service and the cleanup sweeper.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
