// Escrow ledger flows against the in-process mock gateway.
//
// These cover the idempotency and failure-classification guarantees the
// lifecycle depends on: capture-twice yields one charge, races resolve to
// the prior captured amount, and refunds of never-captured holds are
// rejected without side effects.

use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rust_decimal::Decimal;

use homefix::modules::payments::models::HoldPurpose;
use homefix::modules::payments::services::gateway_trait::HoldState;
use homefix::modules::payments::services::EscrowLedger;

#[path = "../helpers/mock_gateway.rs"]
mod mock_gateway;
use mock_gateway::MockGateway;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn ledger_with_gateway() -> (Arc<MockGateway>, EscrowLedger) {
    let gateway = Arc::new(MockGateway::new());
    let ledger = EscrowLedger::new(gateway.clone());
    (gateway, ledger)
}

#[tokio::test]
async fn test_place_and_capture_hold() {
    let (gateway, ledger) = ledger_with_gateway();

    let hold_ref = ledger
        .place_hold("job-1", HoldPurpose::Diagnostic, dec("85.00"), None)
        .await
        .unwrap();

    let captured = ledger.capture(&hold_ref).await.unwrap();
    assert_eq!(captured, dec("85.00"));
    assert_eq!(gateway.capture_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_capture_twice_charges_once() {
    let (gateway, ledger) = ledger_with_gateway();

    let hold_ref = ledger
        .place_hold("job-1", HoldPurpose::Diagnostic, dec("85.00"), None)
        .await
        .unwrap();

    let first = ledger.capture(&hold_ref).await.unwrap();
    let second = ledger.capture(&hold_ref).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        gateway.capture_calls.load(Ordering::SeqCst),
        1,
        "second capture must not reach the gateway"
    );
}

#[tokio::test]
async fn test_concurrent_captures_yield_one_charge() {
    let (gateway, ledger) = ledger_with_gateway();
    let ledger = Arc::new(ledger);

    let hold_ref = ledger
        .place_hold("job-1", HoldPurpose::Repair, dec("350.00"), None)
        .await
        .unwrap();

    let (a, b) = tokio::join!(ledger.capture(&hold_ref), ledger.capture(&hold_ref));

    assert_eq!(a.unwrap(), dec("350.00"));
    assert_eq!(b.unwrap(), dec("350.00"));
    assert_eq!(gateway.capture_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_place_hold_is_idempotent_per_job_and_purpose() {
    let (gateway, ledger) = ledger_with_gateway();

    let first = ledger
        .place_hold("job-1", HoldPurpose::Diagnostic, dec("85.00"), None)
        .await
        .unwrap();
    let second = ledger
        .place_hold("job-1", HoldPurpose::Diagnostic, dec("85.00"), None)
        .await
        .unwrap();

    assert_eq!(first, second, "retried booking must reuse the same hold");
    assert_eq!(gateway.hold_count(), 1);

    // A different purpose on the same job is a distinct hold
    let repair = ledger
        .place_hold("job-1", HoldPurpose::Repair, dec("350.00"), None)
        .await
        .unwrap();
    assert_ne!(first, repair);
    assert_eq!(gateway.hold_count(), 2);
}

#[tokio::test]
async fn test_declined_card_surfaces_as_gateway_rejected() {
    let (gateway, ledger) = ledger_with_gateway();
    gateway.decline_next_create();

    let err = ledger
        .place_hold("job-1", HoldPurpose::Diagnostic, dec("85.00"), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "gateway_rejected");
    assert!(!err.is_retryable());
    assert_eq!(gateway.hold_count(), 0);
}

#[tokio::test]
async fn test_zero_amount_hold_rejected_before_gateway() {
    let (gateway, ledger) = ledger_with_gateway();

    let err = ledger
        .place_hold("job-1", HoldPurpose::Diagnostic, Decimal::ZERO, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_hold_is_not_capturable() {
    let (gateway, ledger) = ledger_with_gateway();
    let hold_ref = gateway.seed_hold(HoldState::Expired, 8500, 0);

    let err = ledger.capture(&hold_ref).await.unwrap_err();
    assert_eq!(err.kind(), "hold_not_capturable");
    assert_eq!(gateway.capture_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_canceled_hold_is_not_capturable() {
    let (gateway, ledger) = ledger_with_gateway();
    let hold_ref = gateway.seed_hold(HoldState::Canceled, 8500, 0);

    let err = ledger.capture(&hold_ref).await.unwrap_err();
    assert_eq!(err.kind(), "hold_not_capturable");
}

#[tokio::test]
async fn test_transient_outage_is_retryable() {
    let (gateway, ledger) = ledger_with_gateway();

    let hold_ref = ledger
        .place_hold("job-1", HoldPurpose::Diagnostic, dec("85.00"), None)
        .await
        .unwrap();

    gateway.break_capture(&hold_ref);
    let err = ledger.capture(&hold_ref).await.unwrap_err();
    assert_eq!(err.kind(), "gateway_unavailable");
    assert!(err.is_retryable());

    // Retrying the whole operation after the outage succeeds
    gateway.restore_capture(&hold_ref);
    let captured = ledger.capture(&hold_ref).await.unwrap();
    assert_eq!(captured, dec("85.00"));
}

#[tokio::test]
async fn test_refund_of_uncaptured_hold_rejected() {
    let (gateway, ledger) = ledger_with_gateway();

    let hold_ref = ledger
        .place_hold("job-1", HoldPurpose::Diagnostic, dec("85.00"), None)
        .await
        .unwrap();

    let err = ledger.refund(&hold_ref, None).await.unwrap_err();
    assert_eq!(err.kind(), "refund_rejected");
    assert_eq!(gateway.refund_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_full_and_partial_refunds() {
    let (gateway, ledger) = ledger_with_gateway();
    let hold_ref = gateway.seed_hold(HoldState::Captured, 8500, 8500);

    let partial = ledger.refund(&hold_ref, Some(dec("40.00"))).await.unwrap();
    assert_eq!(partial.amount, dec("40.00"));

    let full = ledger.refund(&hold_ref, None).await.unwrap();
    assert_eq!(full.amount, dec("85.00"));
    assert_ne!(partial.reference, full.reference);
}

#[tokio::test]
async fn test_refund_exceeding_captured_amount_rejected() {
    let (gateway, ledger) = ledger_with_gateway();
    let hold_ref = gateway.seed_hold(HoldState::Captured, 8500, 8500);

    let err = ledger
        .refund(&hold_ref, Some(dec("100.00")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "refund_rejected");
    assert_eq!(gateway.refund_calls.load(Ordering::SeqCst), 0);
}
