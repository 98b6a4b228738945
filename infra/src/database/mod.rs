//! Database module - MySQL implementations using SQLx
//!
//! This module provides:
//! - Connection pool management
//! - The durable OTP record store

pub mod connection;
pub mod otp_store;


// Re-export commonly used types
pub use connection::{DatabasePool, PoolStatistics};
pub use otp_store::{MySqlOtpStore, MySqlOtpStoreConfig};
