//! Process-local OTP store
//!
//! Records live in a `HashMap` guarded by a single async mutex. Every
//! read-modify-write, including the sweeper's deletions, runs under that lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use pv_shared::utils::phone::mask_phone_number;

use crate::domain::entities::otp_record::OtpRecord;
use crate::errors::StorageResult;

use super::r#trait::{OtpStore, RecordChange};

/// In-memory OTP store, volatile across restarts
#[derive(Debug, Default)]
pub struct InMemoryOtpStore {
    records: Mutex<HashMap<String, OtpRecord>>,
}

impl InMemoryOtpStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a copy of the record for a phone number
    pub async fn read(&self, phone: &str) -> Option<OtpRecord> {
        self.records.lock().await.get(phone).cloned()
    }

    /// Apply an update closure while holding the store lock
    pub async fn update<T, F>(&self, phone: &str, update: F) -> T
    where
        F: FnOnce(Option<OtpRecord>) -> (RecordChange, T),
    {
        let mut records = self.records.lock().await;
        let (change, value) = update(records.get(phone).cloned());

        match change {
            RecordChange::Put(record) => {
                records.insert(phone.to_string(), record);
            }
            RecordChange::Delete => {
                records.remove(phone);
            }
            RecordChange::Unchanged => {}
        }

        value
    }

    /// Remove the record for a phone number
    pub async fn remove(&self, phone: &str) {
        if self.records.lock().await.remove(phone).is_some() {
            debug!(
                phone = %mask_phone_number(phone),
                "Removed OTP record from memory"
            );
        }
    }

    /// Remove every record whose issuance window has passed
    ///
    /// # Returns
    /// The number of records removed
    pub async fn remove_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        before - records.len()
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Check if the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn get(&self, phone: &str) -> StorageResult<Option<OtpRecord>> {
        Ok(self.read(phone).await)
    }

    async fn transactional_upsert<T, F>(&self, phone: &str, update: F) -> StorageResult<T>
    where
        T: Send,
        F: Fn(Option<OtpRecord>) -> (RecordChange, T) + Send + Sync,
    {
        Ok(self.update(phone, update).await)
    }

    async fn delete(&self, phone: &str) -> StorageResult<()> {
        self.remove(phone).await;
        Ok(())
    }
}
