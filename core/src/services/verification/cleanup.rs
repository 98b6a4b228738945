//! Periodic sweep of expired in-memory OTP records
//!
//! Verification already treats expired records as absent, so the sweep only
//! bounds memory held by codes that were never verified. The durable store is
//! not swept.

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::repositories::otp::InMemoryOtpStore;

/// Configuration for the cleanup sweeper
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// How often to sweep (in seconds)
    pub interval_seconds: u64,
    /// Whether to run the sweeper at all
    pub enabled: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            enabled: true,
        }
    }
}

impl From<&pv_shared::config::OtpConfig> for CleanupConfig {
    fn from(config: &pv_shared::config::OtpConfig) -> Self {
        Self {
            interval_seconds: config.sweep_interval_seconds,
            enabled: config.sweeper_enabled,
        }
    }
}

/// Service removing expired records from the in-memory store
pub struct OtpCleanupService {
    memory: Arc<InMemoryOtpStore>,
    config: CleanupConfig,
}

impl OtpCleanupService {
    /// Create a new cleanup service
    pub fn new(memory: Arc<InMemoryOtpStore>, config: CleanupConfig) -> Self {
        Self { memory, config }
    }

    /// Run a single sweep
    pub async fn run_cleanup(&self) -> CleanupResult {
        let expired_records_deleted = self.memory.remove_expired(Utc::now()).await;
        let remaining_records = self.memory.len().await;

        if expired_records_deleted > 0 {
            info!(
                expired_records_deleted = expired_records_deleted,
                remaining_records = remaining_records,
                event = "otp_cleanup",
                "Removed expired OTP records from memory"
            );
        } else {
            debug!(remaining_records = remaining_records, "OTP cleanup found nothing to remove");
        }

        CleanupResult {
            expired_records_deleted,
            remaining_records,
        }
    }

    /// Start the sweeper as a background task
    ///
    /// The task runs until the process (or runtime) shuts down.
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("OTP cleanup sweeper is disabled");
            return None;
        }

        let interval = std::time::Duration::from_secs(self.config.interval_seconds.max(1));

        Some(tokio::spawn(async move {
            info!(
                "OTP cleanup sweeper started - will run every {} seconds",
                interval.as_secs()
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;
                self.run_cleanup().await;
            }
        }))
    }
}

/// Result of a cleanup sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupResult {
    /// Number of expired records removed
    pub expired_records_deleted: usize,
    /// Number of records left in memory
    pub remaining_records: usize,
}
