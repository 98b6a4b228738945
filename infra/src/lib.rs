//! # Infrastructure Layer
//!
//! This crate implements the infrastructure layer of the phone verification
//! subsystem. It provides the durable OTP store, the database connection pool,
//! tracing initialisation and the bootstrap that wires everything together.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL document store for OTP records using SQLx
//! - **Telemetry**: `tracing-subscriber` setup driven by [`LoggingConfig`]
//! - **Bootstrap**: [`initialize`] builds the failover store, the verification
//!   service and the cleanup sweeper from an [`AppConfig`]
//!
//! [`LoggingConfig`]: pv_shared::config::LoggingConfig

use std::sync::Arc;
use tokio::task::JoinHandle;

use pv_core::repositories::{FailoverStore, InMemoryOtpStore};
use pv_core::services::verification::{
    CleanupConfig, VerificationService, VerificationServiceConfig,
};
use pv_shared::config::AppConfig;

// Re-export core types for convenience
pub use pv_core::errors::*;

/// Database module - MySQL implementations using SQLx
pub mod database;

/// Tracing subscriber initialisation
pub mod telemetry;

use database::{DatabasePool, MySqlOtpStore};

/// Verification service backed by the MySQL store
pub type MySqlVerificationService = VerificationService<MySqlOtpStore>;

/// Handles to the running phone verification subsystem
pub struct PhoneVerification {
    /// Issuance and verification entry point
    pub service: Arc<MySqlVerificationService>,
    /// Connection pool of the durable store
    pub pool: DatabasePool,
    /// Cleanup sweeper task, when enabled
    pub sweeper: Option<JoinHandle<()>>,
}

impl PhoneVerification {
    /// Stop the sweeper and close the connection pool
    pub async fn shutdown(self) {
        if let Some(sweeper) = self.sweeper {
            sweeper.abort();
        }
        self.pool.close().await;
    }
}

/// Initialize the phone verification subsystem
///
/// This function sets up:
/// - A lazily connecting MySQL pool and the `otp_records` table
/// - The failover store (MySQL first, in-memory on failure)
/// - The verification service
/// - The cleanup sweeper
///
/// An unreachable database does not fail startup; the failover store takes
/// over once the durable calls start failing. Out-of-range OTP settings do
/// fail it, with [`InfrastructureError::Config`].
pub async fn initialize(config: &AppConfig) -> Result<PhoneVerification, InfrastructureError> {
    tracing::info!(
        environment = %config.environment,
        "Initializing phone verification services..."
    );

    config.otp.validate().map_err(InfrastructureError::Config)?;

    let service_config = VerificationServiceConfig::from(&config.otp);
    if service_config.debug_peek && config.environment.is_production() {
        return Err(InfrastructureError::Config(
            "OTP debug peek must not be enabled in production".to_string(),
        ));
    }

    let pool = DatabasePool::connect_lazy(config.database.clone())?;
    let durable = Arc::new(MySqlOtpStore::new(pool.get_pool().clone()));

    if let Err(e) = durable.ensure_schema().await {
        tracing::warn!(
            error = %e,
            "Could not prepare OTP table, durable store may be unavailable"
        );
    }

    let store = Arc::new(FailoverStore::new(
        durable,
        Arc::new(InMemoryOtpStore::new()),
        config.otp.failover_threshold,
    ));

    let service = Arc::new(VerificationService::new(store, service_config));
    let sweeper = service.start_cleanup(CleanupConfig::from(&config.otp));

    tracing::info!("Phone verification services initialized successfully");

    Ok(PhoneVerification {
        service,
        pool,
        sweeper,
    })
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}

impl From<InfrastructureError> for StorageError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Serialization(e) => StorageError::Serialization {
                message: e.to_string(),
            },
            other => StorageError::unavailable(other.to_string()),
        }
    }
}
