#[cfg(test)]
mod api_routes_tests {
    use axum::body::Body;
    use chrono::Utc;
    use http::{Request, StatusCode};
    use serde_json::{json, Value as JsonValue};
    use std::sync::Arc;
    use tower::ServiceExt;

    use nibog_payments::api::{router, AppState};
    use nibog_payments::config::{GatewayEnvironment, GatewayHttpConfig, PaymentConfig};
    use nibog_payments::error::PaymentResult;
    use nibog_payments::gateway::client::GatewayClient;
    use nibog_payments::health::HealthChecker;
    use nibog_payments::services::booking::BookingBackend;
    use nibog_payments::services::callback::CallbackService;
    use nibog_payments::services::checkout::CheckoutService;
    use nibog_payments::staging::store::{
        InMemoryPendingBookingStore, PendingBooking, PendingBookingStore,
    };

    struct NoopBookingBackend;

    #[async_trait::async_trait]
    impl BookingBackend for NoopBookingBackend {
        async fn create_booking(
            &self,
            transaction_id: &str,
            _booking_data: &JsonValue,
        ) -> PaymentResult<String> {
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

    fn test_app() -> (Arc<InMemoryPendingBookingStore>, axum::Router) {
        let staging = Arc::new(InMemoryPendingBookingStore::new());
        let gateway = Arc::new(
            GatewayClient::new(&GatewayHttpConfig {
                timeout_secs: 2,
                status_max_retries: 0,
            })
            .unwrap(),
        );
        let checkout = Arc::new(CheckoutService::new(
            test_config(),
            staging.clone(),
            gateway.clone(),
            900,
        ));
        let callback = Arc::new(CallbackService::new(
            test_config(),
            staging.clone(),
            gateway,
            Arc::new(NoopBookingBackend),
        ));
        let state = AppState {
            checkout,
            callback,
            staging: staging.clone(),
            health: HealthChecker::new(None, true, vec![]),
        };
        (staging, router(state))
    }

    async fn response_json(response: axum::response::Response) -> JsonValue {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn get_pending_booking_returns_staged_record() {
        let (staging, app) = test_app();
        let record = PendingBooking::new(
            "NIBOG_42_1700000000000",
            json!({"child": "Aarav"}),
            900,
        );
        staging.stage(&record).await.unwrap();

        let response = app
            .oneshot(post_json(
                "/api/pending-bookings/get",
                json!({"transaction_id": "NIBOG_42_1700000000000"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["transactionId"], "NIBOG_42_1700000000000");
        assert_eq!(body["bookingData"]["child"], "Aarav");
        assert_eq!(body["status"], "staged");
    }

    #[tokio::test]
    async fn unknown_transaction_is_404() {
        let (_staging, app) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/pending-bookings/get",
                json!({"transaction_id": "NIBOG_999_1700000000000"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn expired_transaction_is_410() {
        let (staging, app) = test_app();
        let mut record = PendingBooking::new(
            "NIBOG_42_1700000000000",
            json!({"child": "Aarav"}),
            900,
        );
        record.expires_at = Utc::now().timestamp() - 60;
        staging.stage(&record).await.unwrap();

        let response = app
            .oneshot(post_json(
                "/api/pending-bookings/get",
                json!({"transaction_id": "NIBOG_42_1700000000000"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
        let body = response_json(response).await;
        assert_eq!(body["error"], "expired");
    }

    #[tokio::test]
    async fn corrupted_payload_is_207_with_cleanup_flag() {
        let (staging, app) = test_app();
        staging.stage_raw("NIBOG_42_1700000000000", "undefined").await;

        let response = app
            .oneshot(post_json(
                "/api/pending-bookings/get",
                json!({"transaction_id": "NIBOG_42_1700000000000"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let body = response_json(response).await;
        assert_eq!(body["needs_cleanup"], true);
    }

    #[tokio::test]
    async fn delete_removes_the_pending_booking() {
        let (staging, app) = test_app();
        let record = PendingBooking::new(
            "NIBOG_42_1700000000000",
            json!({"child": "Aarav"}),
            900,
        );
        staging.stage(&record).await.unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/pending-bookings/NIBOG_42_1700000000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(staging.len().await, 0);
    }

    #[tokio::test]
    async fn callback_without_integrity_header_is_401() {
        let (_staging, app) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/payments/phonepe-callback",
                json!({"response": "eyJjb2RlIjoiUEFZTUVOVF9TVUNDRVNTIn0="}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn callback_with_forged_header_is_401() {
        let (_staging, app) = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/payments/phonepe-callback")
            .header("content-type", "application/json")
            .header("x-verify", format!("{}###1", "0".repeat(64)))
            .body(Body::from(
                json!({"response": "eyJjb2RlIjoiUEFZTUVOVF9TVUNDRVNTIn0="}).to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response_json(response).await;
        assert_eq!(body["error"], "TAMPER_DETECTED");
    }

    #[tokio::test]
    async fn initiate_with_bad_amount_is_400() {
        let (_staging, app) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/payments/initiate",
                json!({
                    "booking_id": "42",
                    "user_id": "user_1",
                    "amount": "-5",
                    "mobile_number": "9876543210",
                    "booking": {"child": "Aarav"}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn liveness_answers_ok() {
        let (_staging, app) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
