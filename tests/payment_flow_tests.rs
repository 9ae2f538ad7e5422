//! End-to-end flow over the staging store and callback handler: stage,
//! verify, promote once, and never resurrect stale bookings.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nibog_payments::config::{GatewayEnvironment, GatewayHttpConfig, PaymentConfig};
use nibog_payments::error::{PaymentError, PaymentResult};
use nibog_payments::gateway::client::GatewayClient;
use nibog_payments::gateway::signer::CHECKSUM_SEPARATOR;
use nibog_payments::services::booking::BookingBackend;
use nibog_payments::services::callback::{CallbackService, VerificationOutcome};
use nibog_payments::staging::store::{
    InMemoryPendingBookingStore, PendingBooking, PendingBookingStore, StagedLookup,
};

struct CountingBookingBackend {
    created: AtomicUsize,
}

#[async_trait]
impl BookingBackend for CountingBookingBackend {
    async fn create_booking(
        &self,
        transaction_id: &str,
        _booking_data: &JsonValue,
    ) -> PaymentResult<String> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("B-{}", transaction_id))
    }
}

fn test_config() -> PaymentConfig {
    PaymentConfig {
        environment: GatewayEnvironment::Sandbox,
        merchant_id: "PGTESTPAYUAT".to_string(),
        salt_key: "099eb0cd-02cf-4e2a-8aca-3e6c6aff0399".to_string(),
        salt_index: "1".to_string(),
        app_base_url: "http://localhost:3000".to_string(),
        gateway_base_url: "http://127.0.0.1:1".to_string(),
    }
}

fn setup() -> (
    Arc<InMemoryPendingBookingStore>,
    Arc<CountingBookingBackend>,
    CallbackService,
) {
    let staging = Arc::new(InMemoryPendingBookingStore::new());
    let backend = Arc::new(CountingBookingBackend {
        created: AtomicUsize::new(0),
    });
    let gateway = Arc::new(
        GatewayClient::new(&GatewayHttpConfig {
            timeout_secs: 2,
            status_max_retries: 0,
        })
        .expect("gateway client should build"),
    );
    let service = CallbackService::new(test_config(), staging.clone(), gateway, backend.clone());
    (staging, backend, service)
}

fn gateway_signed_callback(transaction_id: &str, code: &str) -> (String, String) {
    let config = test_config();
    let payload = json!({
        "success": code == "PAYMENT_SUCCESS",
        "code": code,
        "message": "callback",
        "data": {
            "merchantId": config.merchant_id,
            "merchantTransactionId": transaction_id,
            "transactionId": "T2301011200001",
            "amount": 79900,
            "state": "COMPLETED"
        }
    });
    let body = STANDARD.encode(serde_json::to_vec(&payload).unwrap());
    let digest = Sha256::digest(format!("{}{}", body, config.salt_key).as_bytes());
    let header = format!(
        "{}{}{}",
        hex::encode(digest),
        CHECKSUM_SEPARATOR,
        config.salt_index
    );
    (body, header)
}

fn booking_payload() -> JsonValue {
    json!({
        "parent": {"name": "Priya", "phone": "9876543210"},
        "child": {"name": "Aarav", "dob": "2022-04-01"},
        "games": [{"id": 7, "slot": "10:00"}],
        "addons": [],
        "promo_code": "EARLYBIRD"
    })
}

#[tokio::test]
async fn staged_booking_round_trips_until_expiry() {
    let (staging, _backend, _service) = setup();
    let txn = "NIBOG_42_1700000000000";

    staging
        .stage(&PendingBooking::new(txn, booking_payload(), 900))
        .await
        .unwrap();

    // Immediate retrieval returns the identical payload
    match staging.get(txn).await.unwrap() {
        StagedLookup::Found(record) => assert_eq!(record.booking_data, booking_payload()),
        other => panic!("expected Found, got {:?}", other),
    }

    // Unknown transaction IDs are a different outcome than expiry
    assert!(matches!(
        staging.get("NIBOG_404_1700000000000").await.unwrap(),
        StagedLookup::NotFound
    ));

    // After expiry the data is never returned
    let mut expired = PendingBooking::new(txn, booking_payload(), 900);
    expired.expires_at = Utc::now().timestamp() - 1;
    staging.stage(&expired).await.unwrap();
    assert!(matches!(
        staging.get(txn).await.unwrap(),
        StagedLookup::Expired(_)
    ));
}

#[tokio::test]
async fn double_success_callback_creates_exactly_one_booking() {
    let (staging, backend, service) = setup();
    let txn = "NIBOG_42_1700000000000";
    staging
        .stage(&PendingBooking::new(txn, booking_payload(), 900))
        .await
        .unwrap();

    let (body, header) = gateway_signed_callback(txn, "PAYMENT_SUCCESS");

    let first = service.handle_gateway_callback(&body, &header).await.unwrap();
    assert!(matches!(first, VerificationOutcome::Promoted { ref booking_ref } if booking_ref == &format!("B-{}", txn)));

    let second = service.handle_gateway_callback(&body, &header).await.unwrap();
    assert_eq!(second, VerificationOutcome::AlreadyProcessed);

    assert_eq!(backend.created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tampered_callback_never_promotes_a_live_booking() {
    let (staging, backend, service) = setup();
    let txn = "NIBOG_42_1700000000000";
    staging
        .stage(&PendingBooking::new(txn, booking_payload(), 900))
        .await
        .unwrap();

    let (body, header) = gateway_signed_callback(txn, "PAYMENT_SUCCESS");
    let tampered_header = {
        // Flip a nibble of the digest, keep the separator and index intact
        let mut chars: Vec<char> = header.chars().collect();
        chars[0] = if chars[0] == 'a' { 'b' } else { 'a' };
        chars.into_iter().collect::<String>()
    };

    let result = service.handle_gateway_callback(&body, &tampered_header).await;
    assert!(matches!(result, Err(PaymentError::TamperDetected { .. })));
    assert_eq!(backend.created.load(Ordering::SeqCst), 0);

    // The booking is still staged and promotable by the genuine callback
    let outcome = service.handle_gateway_callback(&body, &header).await.unwrap();
    assert!(matches!(outcome, VerificationOutcome::Promoted { .. }));
}

#[tokio::test]
async fn valid_callback_for_expired_booking_is_stale_not_promoted() {
    let (staging, backend, service) = setup();
    let txn = "NIBOG_42_1700000000000";
    let mut record = PendingBooking::new(txn, booking_payload(), 900);
    record.expires_at = Utc::now().timestamp() - 300;
    staging.stage(&record).await.unwrap();

    let (body, header) = gateway_signed_callback(txn, "PAYMENT_SUCCESS");
    let outcome = service.handle_gateway_callback(&body, &header).await.unwrap();

    assert_eq!(outcome, VerificationOutcome::Stale);
    assert_eq!(backend.created.load(Ordering::SeqCst), 0);
}
