//! Mock durable store for testing failover behaviour

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::domain::entities::otp_record::OtpRecord;
use crate::errors::{StorageError, StorageResult};

use super::memory::InMemoryOtpStore;
use super::r#trait::{OtpStore, RecordChange};

/// Durable store stand-in that can be switched into a failing state
#[derive(Default)]
pub struct MockDurableStore {
    inner: InMemoryOtpStore,
    should_fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failure(true);
        store
    }

    pub fn set_failure(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Number of calls that reached this store
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn stored(&self, phone: &str) -> Option<OtpRecord> {
        self.inner.read(phone).await
    }

    fn enter(&self) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            Err(StorageError::unavailable("connection timed out"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OtpStore for MockDurableStore {
    async fn get(&self, phone: &str) -> StorageResult<Option<OtpRecord>> {
        self.enter()?;
        Ok(self.inner.read(phone).await)
    }

    async fn transactional_upsert<T, F>(&self, phone: &str, update: F) -> StorageResult<T>
    where
        T: Send,
        F: Fn(Option<OtpRecord>) -> (RecordChange, T) + Send + Sync,
    {
        self.enter()?;
        Ok(self.inner.update(phone, update).await)
    }

    async fn delete(&self, phone: &str) -> StorageResult<()> {
        self.enter()?;
        self.inner.remove(phone).await;
        Ok(())
    }
}
