//! MySQL OTP record store
//!
//! Each phone number owns one row in `otp_records`; the record itself is kept
//! as a JSON document. Atomic updates lock the row with `SELECT ... FOR UPDATE`
//! inside a transaction, so concurrent verifications for the same phone number
//! are serialized by the database.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::MySqlDatabaseError;
use sqlx::{MySql, MySqlPool, Row, Transaction};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use pv_core::domain::entities::otp_record::OtpRecord;
use pv_core::errors::{StorageError, StorageResult};
use pv_core::repositories::otp::{OtpStore, RecordChange};
use pv_shared::utils::phone::mask_phone_number;

use crate::InfrastructureError;

/// MySQL error number for "Deadlock found when trying to get lock"
const ER_LOCK_DEADLOCK: u16 = 1213;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS otp_records (
        phone VARCHAR(32) NOT NULL,
        document MEDIUMTEXT NOT NULL,
        expires_at DATETIME(3) NOT NULL,
        updated_at DATETIME(3) NOT NULL,
        PRIMARY KEY (phone),
        INDEX idx_otp_records_expires_at (expires_at)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

/// Retry settings for the MySQL store
#[derive(Debug, Clone)]
pub struct MySqlOtpStoreConfig {
    /// Attempts for a transaction that hits a deadlock
    pub max_deadlock_retries: u32,
    /// Base delay between deadlock retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for MySqlOtpStoreConfig {
    fn default() -> Self {
        Self {
            max_deadlock_retries: 3,
            retry_delay_ms: 20,
        }
    }
}

/// Durable OTP store on a MySQL table
pub struct MySqlOtpStore {
    /// Database connection pool
    pool: MySqlPool,
    /// Retry settings
    config: MySqlOtpStoreConfig,
}

impl MySqlOtpStore {
    /// Create a store with default retry settings
    pub fn new(pool: MySqlPool) -> Self {
        Self::with_config(pool, MySqlOtpStoreConfig::default())
    }

    /// Create a store with custom retry settings
    pub fn with_config(pool: MySqlPool, config: MySqlOtpStoreConfig) -> Self {
        Self { pool, config }
    }

    /// Create the `otp_records` table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), InfrastructureError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        info!("OTP records table is ready");
        Ok(())
    }

    /// Run one locked read-modify-write transaction
    async fn upsert_once<T, F>(&self, phone: &str, update: &F) -> Result<T, InfrastructureError>
    where
        F: Fn(Option<OtpRecord>) -> (RecordChange, T),
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT document FROM otp_records WHERE phone = ? FOR UPDATE")
            .bind(phone)
            .fetch_optional(&mut *tx)
            .await?;

        let current = match row {
            Some(row) => Some(decode_document(&row.try_get::<String, _>("document")?)?),
            None => None,
        };

        let (change, value) = update(current);
        Self::apply_change(&mut tx, phone, change).await?;

        tx.commit().await?;
        Ok(value)
    }

    async fn apply_change(
        tx: &mut Transaction<'_, MySql>,
        phone: &str,
        change: RecordChange,
    ) -> Result<(), InfrastructureError> {
        match change {
            RecordChange::Unchanged => {}
            RecordChange::Put(record) => {
                let document = serde_json::to_string(&record)?;

                sqlx::query(
                    r#"
                    INSERT INTO otp_records (phone, document, expires_at, updated_at)
                    VALUES (?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE
                        document = VALUES(document),
                        expires_at = VALUES(expires_at),
                        updated_at = VALUES(updated_at)
                    "#,
                )
                .bind(phone)
                .bind(document)
                .bind(record.expires_at)
                .bind(Utc::now())
                .execute(&mut **tx)
                .await?;
            }
            RecordChange::Delete => {
                sqlx::query("DELETE FROM otp_records WHERE phone = ?")
                    .bind(phone)
                    .execute(&mut **tx)
                    .await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl OtpStore for MySqlOtpStore {
    async fn get(&self, phone: &str) -> StorageResult<Option<OtpRecord>> {
        let row = sqlx::query("SELECT document FROM otp_records WHERE phone = ?")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    phone = %mask_phone_number(phone),
                    error = %e,
                    "Failed to read OTP record from database"
                );
                StorageError::from(InfrastructureError::Database(e))
            })?;

        let Some(row) = row else {
            debug!(phone = %mask_phone_number(phone), "No OTP record in database");
            return Ok(None);
        };

        let document: String = row
            .try_get("document")
            .map_err(|e| StorageError::from(InfrastructureError::Database(e)))?;

        decode_document(&document)
            .map(Some)
            .map_err(|e| StorageError::from(InfrastructureError::Serialization(e)))
    }

    async fn transactional_upsert<T, F>(&self, phone: &str, update: F) -> StorageResult<T>
    where
        T: Send,
        F: Fn(Option<OtpRecord>) -> (RecordChange, T) + Send + Sync,
    {
        let max_attempts = self.config.max_deadlock_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.upsert_once(phone, &update).await {
                Ok(value) => return Ok(value),
                Err(e) if is_deadlock(&e) && attempt < max_attempts => {
                    warn!(
                        phone = %mask_phone_number(phone),
                        attempt = attempt,
                        max_attempts = max_attempts,
                        "Deadlock on OTP record, retrying..."
                    );
                    let delay = self.config.retry_delay_ms * u64::from(attempt);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => {
                    error!(
                        phone = %mask_phone_number(phone),
                        error = %e,
                        attempt = attempt,
                        "Failed to update OTP record in database"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    async fn delete(&self, phone: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM otp_records WHERE phone = ?")
            .bind(phone)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    phone = %mask_phone_number(phone),
                    error = %e,
                    "Failed to delete OTP record from database"
                );
                StorageError::from(InfrastructureError::Database(e))
            })?;

        Ok(())
    }
}

/// Decode a stored JSON document into an OTP record
pub(crate) fn decode_document(document: &str) -> Result<OtpRecord, serde_json::Error> {
    serde_json::from_str(document)
}

/// Whether the error is a MySQL deadlock worth retrying
pub(crate) fn is_deadlock(err: &InfrastructureError) -> bool {
    match err {
        InfrastructureError::Database(sqlx::Error::Database(db_err)) => db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(|mysql| mysql.number() == ER_LOCK_DEADLOCK)
            .unwrap_or(false),
        _ => false,
    }
}
