//! OTP store trait defining the storage contract shared by every backend.

use async_trait::async_trait;

use crate::domain::entities::otp_record::OtpRecord;
use crate::errors::StorageResult;

/// What an update closure wants done with the record it was handed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    /// Leave the stored state as it is
    Unchanged,
    /// Write this record (insert or overwrite)
    Put(OtpRecord),
    /// Remove the record
    Delete,
}

/// Storage contract for OTP records keyed by canonical (E.164) phone number
///
/// Implementations must make [`OtpStore::transactional_upsert`] atomic per key:
/// two concurrent calls for the same phone number must behave as if they ran
/// one after the other, so no attempt increment or lockout is lost.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Fetch the record stored for a phone number
    ///
    /// # Returns
    /// * `Ok(Some(OtpRecord))` - A record exists (it may already be expired)
    /// * `Ok(None)` - Nothing stored for this phone number
    /// * `Err(StorageError)` - The backend could not be reached
    async fn get(&self, phone: &str) -> StorageResult<Option<OtpRecord>>;

    /// Atomically read, update and write the record for a phone number
    ///
    /// The closure receives the current record (or `None`) and returns the
    /// change to apply together with a value handed back to the caller.
    /// It may be invoked more than once (retries, failover), so it must not
    /// carry side effects of its own.
    async fn transactional_upsert<T, F>(&self, phone: &str, update: F) -> StorageResult<T>
    where
        T: Send,
        F: Fn(Option<OtpRecord>) -> (RecordChange, T) + Send + Sync;

    /// Remove the record for a phone number (no-op when absent)
    async fn delete(&self, phone: &str) -> StorageResult<()>;
}
