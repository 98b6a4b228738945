//! Unit tests for the verification service

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::domain::entities::otp_record::OtpRecord;
use crate::repositories::otp::{
    FailoverStore, InMemoryOtpStore, MockDurableStore, RecordChange, StorageBackend,
};
use crate::services::verification::{
    FailureReason, VerificationResult, VerificationService, VerificationServiceConfig,
};

const PHONE: &str = "+919876543210";

fn create_service(
    durable: Arc<MockDurableStore>,
    config: VerificationServiceConfig,
) -> VerificationService<MockDurableStore> {
    let store = FailoverStore::new(durable, Arc::new(InMemoryOtpStore::new()), 3);
    VerificationService::new(Arc::new(store), config)
}

fn default_service() -> (VerificationService<MockDurableStore>, Arc<MockDurableStore>) {
    let durable = Arc::new(MockDurableStore::new());
    let service = create_service(durable.clone(), VerificationServiceConfig::default());
    (service, durable)
}

async fn seed(service: &VerificationService<MockDurableStore>, record: OtpRecord) {
    service
        .store()
        .transactional_upsert(PHONE, move |_| (RecordChange::Put(record.clone()), ()))
        .await;
}

fn mismatch(attempts_left: u32) -> VerificationResult {
    VerificationResult {
        ok: false,
        reason: Some(FailureReason::Mismatch),
        attempts_left: Some(attempts_left),
        remaining_minutes: None,
    }
}

fn locked(remaining_minutes: i64) -> VerificationResult {
    VerificationResult {
        ok: false,
        reason: Some(FailureReason::LockedOut),
        attempts_left: None,
        remaining_minutes: Some(remaining_minutes),
    }
}

#[tokio::test]
async fn test_issue_and_verify_success() {
    let (service, durable) = default_service();

    service.issue(PHONE, "123456", Duration::minutes(5)).await;
    assert!(durable.stored(PHONE).await.is_some());

    let result = service.verify(PHONE, "123456").await;
    assert!(result.ok);
    assert_eq!(result.reason, None);
}

#[tokio::test]
async fn test_code_is_single_use() {
    let (service, durable) = default_service();

    service.issue(PHONE, "123456", Duration::minutes(5)).await;
    assert!(service.verify(PHONE, "123456").await.ok);

    let second = service.verify(PHONE, "123456").await;
    assert_eq!(second.reason, Some(FailureReason::NotFound));
    assert!(durable.stored(PHONE).await.is_none());
}

#[tokio::test]
async fn test_verify_unknown_phone() {
    let (service, _) = default_service();

    let result = service.verify("+15551234567", "123456").await;

    assert!(!result.ok);
    assert_eq!(result.reason, Some(FailureReason::NotFound));
}

#[tokio::test]
async fn test_lockout_sequence() {
    let (service, _) = default_service();
    service.issue(PHONE, "123456", Duration::minutes(5)).await;

    assert_eq!(service.verify(PHONE, "000000").await, mismatch(2));
    assert_eq!(service.verify(PHONE, "000000").await, mismatch(1));
    assert_eq!(service.verify(PHONE, "000000").await, locked(10));

    // Correct code is rejected while locked
    let result = service.verify(PHONE, "123456").await;
    assert_eq!(result.reason, Some(FailureReason::LockedOut));
    assert!(matches!(result.remaining_minutes, Some(9..=10)));
}

#[tokio::test]
async fn test_elapsed_lockout_allows_verification() {
    let (service, _) = default_service();
    let now = Utc::now();

    let mut record = OtpRecord::new("123456", now - Duration::minutes(1), Duration::minutes(5));
    record.attempts = 3;
    record.lockout_until = Some(now - Duration::seconds(1));
    seed(&service, record).await;

    assert!(service.verify(PHONE, "123456").await.ok);
}

#[tokio::test]
async fn test_expired_code() {
    let (service, _) = default_service();

    service.issue(PHONE, "123456", Duration::milliseconds(1)).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let result = service.verify(PHONE, "123456").await;
    assert_eq!(result.reason, Some(FailureReason::Expired));

    // Expired record is gone afterwards
    let again = service.verify(PHONE, "123456").await;
    assert_eq!(again.reason, Some(FailureReason::NotFound));
}

#[tokio::test]
async fn test_issue_resets_lockout() {
    let (service, _) = default_service();
    service.issue(PHONE, "123456", Duration::minutes(5)).await;

    for _ in 0..3 {
        service.verify(PHONE, "000000").await;
    }
    assert_eq!(
        service.verify(PHONE, "123456").await.reason,
        Some(FailureReason::LockedOut)
    );

    service.issue(PHONE, "654321", Duration::minutes(5)).await;
    assert!(service.verify(PHONE, "654321").await.ok);
}

#[tokio::test]
async fn test_previous_code_still_valid_after_reissue() {
    let (service, _) = default_service();

    service.issue(PHONE, "111111", Duration::minutes(5)).await;
    service.issue(PHONE, "222222", Duration::minutes(5)).await;

    assert!(service.verify(PHONE, "111111").await.ok);
}

#[tokio::test]
async fn test_code_history_is_capped() {
    let (service, durable) = default_service();

    for code in ["100000", "200000", "300000", "400000", "500000", "600000"] {
        service.issue(PHONE, code, Duration::minutes(5)).await;
    }

    let stored = durable.stored(PHONE).await.unwrap();
    assert_eq!(stored.codes.len(), 5);
    assert_eq!(stored.codes[0].code, "200000");

    assert_eq!(service.verify(PHONE, "100000").await, mismatch(2));
}

#[tokio::test]
async fn test_submitted_code_is_normalized() {
    let (service, _) = default_service();

    service.issue(PHONE, "123456", Duration::minutes(5)).await;

    assert!(service.verify(PHONE, " 123-456 ").await.ok);
}

#[tokio::test]
async fn test_failover_keeps_service_available() {
    let durable = Arc::new(MockDurableStore::failing());
    let service = create_service(durable.clone(), VerificationServiceConfig::default());

    for code in ["111111", "222222", "333333", "444444"] {
        service.issue(PHONE, code, Duration::minutes(5)).await;
    }

    assert_eq!(durable.calls(), 3);
    assert_eq!(service.store().active_backend().await, StorageBackend::Memory);
    assert!(service.verify(PHONE, "444444").await.ok);
    assert_eq!(durable.calls(), 3);
}

#[tokio::test]
async fn test_issue_new_code() {
    let (service, _) = default_service();

    let code = service.issue_new_code(PHONE).await;

    assert_eq!(code.len(), 6);
    assert!(service.verify(PHONE, &code).await.ok);
}

#[test]
fn test_generate_code_format() {
    for _ in 0..200 {
        let code = VerificationService::<MockDurableStore>::generate_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}

#[test]
fn test_result_json_shape() {
    let json = serde_json::to_value(mismatch(2)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"ok": false, "reason": "MISMATCH", "attemptsLeft": 2})
    );

    let json = serde_json::to_value(locked(10)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"ok": false, "reason": "LOCKED_OUT", "remainingMinutes": 10})
    );

    let verified = VerificationResult {
        ok: true,
        reason: None,
        attempts_left: None,
        remaining_minutes: None,
    };
    assert_eq!(serde_json::to_value(verified).unwrap(), serde_json::json!({"ok": true}));
}

#[cfg(debug_assertions)]
#[tokio::test]
async fn test_peek_returns_latest_code_when_enabled() {
    let config = VerificationServiceConfig {
        debug_peek: true,
        ..Default::default()
    };
    let service = create_service(Arc::new(MockDurableStore::new()), config);

    assert_eq!(service.peek(PHONE).await, None);

    service.issue(PHONE, "111111", Duration::minutes(5)).await;
    service.issue(PHONE, "222222", Duration::minutes(5)).await;

    assert_eq!(service.peek(PHONE).await.as_deref(), Some("222222"));
}

#[cfg(debug_assertions)]
#[tokio::test]
async fn test_peek_disabled_by_default() {
    let (service, _) = default_service();

    service.issue(PHONE, "111111", Duration::minutes(5)).await;

    assert_eq!(service.peek(PHONE).await, None);
}

#[cfg(debug_assertions)]
#[tokio::test]
async fn test_peek_ignores_expired_record() {
    let config = VerificationServiceConfig {
        debug_peek: true,
        ..Default::default()
    };
    let service = create_service(Arc::new(MockDurableStore::new()), config);

    service.issue(PHONE, "111111", Duration::milliseconds(1)).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(service.peek(PHONE).await, None);
}

#[tokio::test]
async fn test_issue_with_huge_ttl_is_capped() {
    let (service, durable) = default_service();
    let before = Utc::now();

    service.issue(PHONE, "123456", Duration::max_value()).await;

    let stored = durable.stored(PHONE).await.expect("record stored");
    assert!(stored.expires_at <= Utc::now() + Duration::days(1));
    assert!(stored.expires_at >= before + Duration::days(1));
    assert!(service.verify(PHONE, "123456").await.ok);
}

#[tokio::test]
async fn test_negative_lockout_duration_still_locks() {
    let config = VerificationServiceConfig {
        lockout_duration: Duration::minutes(-5),
        ..VerificationServiceConfig::default()
    };
    let service = create_service(Arc::new(MockDurableStore::new()), config);
    service.issue(PHONE, "123456", Duration::minutes(5)).await;

    assert_eq!(service.verify(PHONE, "000000").await, mismatch(2));
    assert_eq!(service.verify(PHONE, "000000").await, mismatch(1));
    assert_eq!(service.verify(PHONE, "000000").await, locked(1));

    let result = service.verify(PHONE, "123456").await;
    assert_eq!(result.reason, Some(FailureReason::LockedOut));
}
