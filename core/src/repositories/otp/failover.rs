//! Durable store with sticky in-memory failover
//!
//! Every call goes to the durable backend first. A failed durable call is
//! counted and served from the in-memory backend instead. Once the count of
//! consecutive failures reaches the threshold the store stops talking to the
//! durable backend for the rest of the process lifetime. A successful durable
//! call resets the count.
//!
//! Records written to memory while failed over are lost on restart.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use pv_shared::utils::phone::mask_phone_number;

use crate::domain::entities::otp_record::OtpRecord;
use crate::errors::StorageError;

use super::memory::InMemoryOtpStore;
use super::r#trait::{OtpStore, RecordChange};

/// Default number of consecutive durable failures before failing over for good
pub const DEFAULT_FAILOVER_THRESHOLD: u32 = 3;

/// Backend currently serving OTP storage calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    /// Network document store (survives restarts)
    Durable,
    /// Process-local map (lost on restart)
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Durable => write!(f, "durable"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// State tracking for the failover controller
#[derive(Debug, Clone, Default)]
struct FailoverState {
    /// Consecutive failures of the durable backend
    consecutive_failures: u32,
    /// Whether we stick to the in-memory backend for good
    sticky_fallback: bool,
}

/// Tracks durable backend health and decides which backend serves a call
#[derive(Debug)]
pub struct FailoverController {
    state: RwLock<FailoverState>,
    threshold: u32,
}

impl FailoverController {
    /// Create a controller that fails over after `threshold` consecutive failures
    pub fn new(threshold: u32) -> Self {
        Self {
            state: RwLock::new(FailoverState::default()),
            threshold: threshold.max(1),
        }
    }

    /// Backend that should serve the next call
    pub async fn active_backend(&self) -> StorageBackend {
        if self.state.read().await.sticky_fallback {
            StorageBackend::Memory
        } else {
            StorageBackend::Durable
        }
    }

    /// Record a successful durable call
    pub async fn record_success(&self) {
        let mut state = self.state.write().await;

        // A call that started before the switch can still land here
        if !state.sticky_fallback {
            state.consecutive_failures = 0;
        }
    }

    /// Record a failed durable call
    ///
    /// # Returns
    /// The backend that serves calls from now on
    pub async fn record_failure(&self) -> StorageBackend {
        let mut state = self.state.write().await;

        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        if !state.sticky_fallback && state.consecutive_failures >= self.threshold {
            state.sticky_fallback = true;
            error!(
                consecutive_failures = state.consecutive_failures,
                threshold = self.threshold,
                event = "otp_storage_failover",
                "Durable OTP store failed repeatedly, using in-memory store for the rest of this process"
            );
        }

        if state.sticky_fallback {
            StorageBackend::Memory
        } else {
            StorageBackend::Durable
        }
    }

    /// Number of consecutive durable failures seen so far
    pub async fn consecutive_failures(&self) -> u32 {
        self.state.read().await.consecutive_failures
    }

    /// Failure threshold for sticking to memory
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for FailoverController {
    fn default() -> Self {
        Self::new(DEFAULT_FAILOVER_THRESHOLD)
    }
}

/// OTP storage that fronts a durable backend with an in-memory fallback
///
/// Unlike [`OtpStore`] its operations are infallible: storage errors stop here.
pub struct FailoverStore<D: OtpStore> {
    /// Durable (network) backend
    durable: Arc<D>,
    /// In-memory fallback backend
    memory: Arc<InMemoryOtpStore>,
    /// Failover bookkeeping
    controller: FailoverController,
}

impl<D: OtpStore> FailoverStore<D> {
    /// Create a failover store
    ///
    /// # Arguments
    ///
    /// * `durable` - Primary, durable backend
    /// * `memory` - In-memory backend used on failure
    /// * `threshold` - Consecutive durable failures before sticking to memory
    pub fn new(durable: Arc<D>, memory: Arc<InMemoryOtpStore>, threshold: u32) -> Self {
        info!(
            threshold = threshold,
            "Initializing OTP storage with durable backend and in-memory fallback"
        );

        Self {
            durable,
            memory,
            controller: FailoverController::new(threshold),
        }
    }

    /// The in-memory backend (swept by the cleanup service)
    pub fn memory(&self) -> &Arc<InMemoryOtpStore> {
        &self.memory
    }

    /// The failover bookkeeping
    pub fn controller(&self) -> &FailoverController {
        &self.controller
    }

    /// Backend that will serve the next call
    pub async fn active_backend(&self) -> StorageBackend {
        self.controller.active_backend().await
    }

    /// Fetch the record for a phone number
    pub async fn get(&self, phone: &str) -> Option<OtpRecord> {
        if self.uses_durable().await {
            match self.durable.get(phone).await {
                Ok(record) => {
                    self.controller.record_success().await;
                    return record;
                }
                Err(e) => self.record_durable_failure("get", phone, &e).await,
            }
        }

        self.memory.read(phone).await
    }

    /// Atomically read, update and write the record for a phone number
    ///
    /// See [`OtpStore::transactional_upsert`] for the closure contract.
    pub async fn transactional_upsert<T, F>(&self, phone: &str, update: F) -> T
    where
        T: Send,
        F: Fn(Option<OtpRecord>) -> (RecordChange, T) + Send + Sync,
    {
        if self.uses_durable().await {
            match self.durable.transactional_upsert(phone, &update).await {
                Ok(value) => {
                    self.controller.record_success().await;
                    return value;
                }
                Err(e) => self.record_durable_failure("transactional_upsert", phone, &e).await,
            }
        }

        self.memory.update(phone, update).await
    }

    /// Remove the record for a phone number
    pub async fn delete(&self, phone: &str) {
        if self.uses_durable().await {
            match self.durable.delete(phone).await {
                Ok(()) => {
                    self.controller.record_success().await;
                    return;
                }
                Err(e) => self.record_durable_failure("delete", phone, &e).await,
            }
        }

        self.memory.remove(phone).await;
    }

    async fn uses_durable(&self) -> bool {
        self.controller.active_backend().await == StorageBackend::Durable
    }

    async fn record_durable_failure(&self, operation: &str, phone: &str, err: &StorageError) {
        let backend = self.controller.record_failure().await;

        warn!(
            phone = %mask_phone_number(phone),
            operation = operation,
            error = %err,
            next_backend = %backend,
            event = "otp_storage_degraded",
            "Durable OTP store call failed, serving from memory"
        );
    }
}
