//! Shared utilities and common types for the phone verification subsystem
//!
//! This crate provides common functionality used across all crates:
//! - Configuration types
//! - Phone number and OTP code normalization

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{AppConfig, DatabaseConfig, Environment, LogFormat, LoggingConfig, OtpConfig};
pub use utils::phone;
