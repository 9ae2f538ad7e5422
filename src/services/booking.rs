//! Confirmed-booking creation collaborator
//!
//! Booking records live in the external booking backend, not here. The
//! callback handler calls this exactly once per promoted transaction.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::info;

use crate::config::BookingBackendConfig;
use crate::error::{PaymentError, PaymentResult};

#[async_trait]
pub trait BookingBackend: Send + Sync {
    /// Create the confirmed booking for a verified transaction. Returns the
    /// backend's booking reference.
    async fn create_booking(
        &self,
        transaction_id: &str,
        booking_data: &JsonValue,
    ) -> PaymentResult<String>;
}

pub struct HttpBookingBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateBookingResponse {
    success: bool,
    #[serde(default)]
    booking_ref: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpBookingBackend {
    pub fn new(config: &BookingBackendConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::BookingBackend {
                message: format!("failed to initialize HTTP client: {}", e),
                retryable: false,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl BookingBackend for HttpBookingBackend {
    async fn create_booking(
        &self,
        transaction_id: &str,
        booking_data: &JsonValue,
    ) -> PaymentResult<String> {
        let url = format!("{}/bookings", self.base_url);
        let payload = serde_json::json!({
            "transaction_id": transaction_id,
            "booking": booking_data,
        });

        let mut request = self.client.post(&url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::BookingBackend {
                message: format!("booking backend request failed: {}", e),
                retryable: true,
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PaymentError::BookingBackend {
                message: format!("HTTP {}: {}", status, text),
                retryable: status.is_server_error(),
            });
        }

        let parsed: CreateBookingResponse =
            serde_json::from_str(&text).map_err(|e| PaymentError::BookingBackend {
                message: format!("invalid booking backend response: {}", e),
                retryable: false,
            })?;

        if !parsed.success {
            return Err(PaymentError::BookingBackend {
                message: parsed
                    .message
                    .unwrap_or_else(|| "booking creation rejected".to_string()),
                retryable: false,
            });
        }

        let booking_ref = parsed
            .booking_ref
            .unwrap_or_else(|| transaction_id.to_string());
        info!(
            transaction_id = transaction_id,
            booking_ref = %booking_ref,
            "Confirmed booking created"
        );
        Ok(booking_ref)
    }
}
