//! Main verification service implementation

use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing;

use pv_shared::utils::phone::mask_phone_number;

use crate::domain::entities::otp_record::{OtpRecord, CODE_LENGTH};
use crate::repositories::otp::{FailoverStore, OtpStore, RecordChange};

use super::cleanup::{CleanupConfig, OtpCleanupService};
use super::config::{max_code_ttl, VerificationServiceConfig};
use super::state_machine::evaluate_attempt;
use super::types::{VerificationOutcome, VerificationResult};

/// Verification service for issuing and checking phone OTP codes
pub struct VerificationService<D: OtpStore> {
    /// Storage with durable backend and in-memory failover
    store: Arc<FailoverStore<D>>,
    /// Service configuration
    config: VerificationServiceConfig,
}

impl<D: OtpStore> VerificationService<D> {
    /// Create a new verification service
    ///
    /// # Arguments
    ///
    /// * `store` - Failover storage shared with the cleanup sweeper
    /// * `config` - Service configuration
    pub fn new(store: Arc<FailoverStore<D>>, config: VerificationServiceConfig) -> Self {
        Self { store, config }
    }

    /// The storage this service writes to
    pub fn store(&self) -> &Arc<FailoverStore<D>> {
        &self.store
    }

    /// The service configuration
    pub fn config(&self) -> &VerificationServiceConfig {
        &self.config
    }

    /// Store a newly generated code for a phone number
    ///
    /// Appends the code to the record's history (oldest dropped beyond the
    /// limit), sets the shared expiry to `now + ttl`, resets the attempt
    /// counter and clears any lockout. Storage failures are absorbed by the
    /// failover store, so this never fails. A `ttl` above one day is cut
    /// down to one day.
    ///
    /// Delivering the code to the user is the caller's job.
    ///
    /// # Arguments
    ///
    /// * `phone` - Canonical E.164 phone number
    /// * `code` - The generated code
    /// * `ttl` - Validity window of the code
    pub async fn issue(&self, phone: &str, code: &str, ttl: Duration) {
        let now = Utc::now();
        let ttl = ttl.min(max_code_ttl());
        let history_limit = self.config.code_history_limit;
        let code = code.to_string();

        let codes_kept = self
            .store
            .transactional_upsert(phone, move |existing| {
                let record = OtpRecord::issue(existing, code.clone(), now, ttl, history_limit);
                let kept = record.codes.len();
                (RecordChange::Put(record), kept)
            })
            .await;

        tracing::info!(
            phone = %mask_phone_number(phone),
            event = "otp_issued",
            ttl_ms = ttl.num_milliseconds(),
            codes_kept = codes_kept,
            "Issued verification code for phone number"
        );
    }

    /// Generate a code and issue it with the configured TTL
    ///
    /// # Returns
    ///
    /// The generated code, for the caller to hand to its delivery channel
    pub async fn issue_new_code(&self, phone: &str) -> String {
        let code = Self::generate_code();
        self.issue(phone, &code, self.config.code_ttl).await;
        code
    }

    /// Verify a submitted code
    ///
    /// The whole evaluation (lockout, expiry, match, attempt counting) runs as
    /// one atomic update of the phone's record, so concurrent calls for the
    /// same phone cannot lose an attempt or skip a lockout.
    ///
    /// # Arguments
    ///
    /// * `phone` - Canonical E.164 phone number
    /// * `submitted_code` - The code entered by the user
    ///
    /// # Returns
    ///
    /// The verification result; failures are expressed through its `reason`
    pub async fn verify(&self, phone: &str, submitted_code: &str) -> VerificationResult {
        let now = Utc::now();
        let policy = self.config.attempt_policy();
        let submitted = submitted_code.to_string();

        let outcome = self
            .store
            .transactional_upsert(phone, move |record| {
                evaluate_attempt(record, &submitted, now, &policy)
            })
            .await;

        let masked = mask_phone_number(phone);
        match outcome {
            VerificationOutcome::Verified => tracing::info!(
                phone = %masked,
                event = "otp_verified_success",
                "Verification code successfully verified"
            ),
            VerificationOutcome::NotFound => tracing::info!(
                phone = %masked,
                event = "otp_not_found",
                "No verification code on record for phone number"
            ),
            VerificationOutcome::Expired => tracing::info!(
                phone = %masked,
                event = "otp_expired",
                "Verification code expired"
            ),
            VerificationOutcome::LockedOut { remaining_minutes } => tracing::warn!(
                phone = %masked,
                event = "otp_locked_out",
                remaining_minutes = remaining_minutes,
                "Verification blocked by lockout"
            ),
            VerificationOutcome::Mismatch { attempts_left } => tracing::warn!(
                phone = %masked,
                event = "otp_verification_failed",
                attempts_left = attempts_left,
                "Verification code mismatch"
            ),
        }

        outcome.into()
    }

    /// Latest issued code for a phone number (development builds only)
    ///
    /// Returns `None` unless `debug_peek` is enabled, or when nothing valid
    /// is on record.
    #[cfg(debug_assertions)]
    pub async fn peek(&self, phone: &str) -> Option<String> {
        if !self.config.debug_peek {
            tracing::warn!(
                phone = %mask_phone_number(phone),
                event = "otp_peek_denied",
                "Attempt to peek at a verification code with peek disabled"
            );
            return None;
        }

        let record = self.store.get(phone).await?;
        if record.is_expired(Utc::now()) {
            return None;
        }
        record.latest_code().map(str::to_string)
    }

    /// Start the periodic sweep of expired in-memory records
    ///
    /// # Returns
    ///
    /// The sweeper task handle, or `None` when the sweeper is disabled
    pub fn start_cleanup(&self, config: CleanupConfig) -> Option<JoinHandle<()>> {
        let sweeper = Arc::new(OtpCleanupService::new(self.store.memory().clone(), config));
        sweeper.start_background_task()
    }

    /// Generate a cryptographically secure random verification code
    ///
    /// Uses OsRng (OS-provided CSPRNG).
    pub fn generate_code() -> String {
        let mut rng = OsRng;
        let mut bytes = [0u8; 4];
        rng.fill_bytes(&mut bytes);
        let num = u32::from_le_bytes(bytes);
        // Modulo bias is negligible for 6 digits
        let code = num % 10u32.pow(CODE_LENGTH as u32);
        format!("{:0width$}", code, width = CODE_LENGTH)
    }
}
