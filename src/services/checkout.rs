//! Payment initiation orchestration
//!
//! Stages the booking, signs the pay request, calls the gateway, and hands
//! the hosted-page redirect URL back to the client. Staging must be durably
//! visible before the redirect URL is returned: a fast callback would
//! otherwise race ahead of staging and find nothing to promote.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::PaymentConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::gateway::client::GatewayClient;
use crate::gateway::signer::sign_pay_request;
use crate::gateway::txn_id::generate_transaction_id;
use crate::gateway::types::{rupees_to_paise, PayRequest, PayResponse, PaymentInstrument};
use crate::gateway::PAY_PATH;
use crate::staging::store::{PendingBooking, PendingBookingStore};

#[derive(Debug, Clone, Deserialize)]
pub struct InitiateCheckout {
    pub booking_id: String,
    pub user_id: String,
    /// Rupee amount as a decimal string
    pub amount: String,
    pub mobile_number: String,
    /// Full booking form payload, staged opaquely until promotion
    pub booking: JsonValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRedirect {
    pub redirect_url: String,
    pub transaction_id: String,
}

pub struct CheckoutService {
    config: PaymentConfig,
    staging: Arc<dyn PendingBookingStore>,
    gateway: Arc<GatewayClient>,
    pending_ttl_secs: u64,
}

impl CheckoutService {
    pub fn new(
        config: PaymentConfig,
        staging: Arc<dyn PendingBookingStore>,
        gateway: Arc<GatewayClient>,
        pending_ttl_secs: u64,
    ) -> Self {
        Self {
            config,
            staging,
            gateway,
            pending_ttl_secs,
        }
    }

    pub async fn initiate(&self, request: InitiateCheckout) -> PaymentResult<CheckoutRedirect> {
        if request.booking_id.trim().is_empty() {
            return Err(PaymentError::validation(
                "booking_id is required",
                Some("booking_id"),
            ));
        }
        if request.user_id.trim().is_empty() {
            return Err(PaymentError::validation(
                "user_id is required",
                Some("user_id"),
            ));
        }
        let mobile_number = normalize_mobile(&request.mobile_number)?;
        let amount_paise = rupees_to_paise(&request.amount)?;

        let transaction_id = generate_transaction_id(request.booking_id.trim());

        let record = PendingBooking::new(
            &transaction_id,
            request.booking.clone(),
            self.pending_ttl_secs,
        );
        self.staging.stage(&record).await?;

        let redirect_url = self.return_url(&request.booking_id, &transaction_id)?;
        let callback_url = format!("{}/api/payments/phonepe-callback", self.config.app_base_url);

        let payload = PayRequest {
            merchant_id: self.config.merchant_id.clone(),
            merchant_transaction_id: transaction_id.clone(),
            merchant_user_id: request.user_id.trim().to_string(),
            amount: amount_paise,
            redirect_url,
            redirect_mode: "REDIRECT".to_string(),
            callback_url,
            mobile_number,
            payment_instrument: PaymentInstrument::pay_page(),
        };

        let signed = sign_pay_request(&payload, PAY_PATH, &self.config)?;

        match self
            .gateway
            .pay(&self.config.gateway_base_url, &signed)
            .await
        {
            Ok(response) => {
                let url = Self::extract_redirect_url(&response).ok_or_else(|| {
                    PaymentError::GatewayRejected {
                        status: 200,
                        body: format!(
                            "{}: {}",
                            response.code,
                            response.message.as_deref().unwrap_or("no redirect URL")
                        ),
                    }
                });

                match url {
                    Ok(url) => {
                        info!(
                            booking_id = %request.booking_id,
                            transaction_id = %transaction_id,
                            amount_paise = amount_paise,
                            "Payment initiated"
                        );
                        Ok(CheckoutRedirect {
                            redirect_url: url,
                            transaction_id,
                        })
                    }
                    Err(e) => {
                        self.discard_staged(&transaction_id).await;
                        Err(e)
                    }
                }
            }
            Err(e) => {
                // The gateway never saw a usable request; a caller retry
                // starts over with a fresh transaction ID.
                self.discard_staged(&transaction_id).await;
                Err(e)
            }
        }
    }

    fn return_url(&self, booking_id: &str, transaction_id: &str) -> PaymentResult<String> {
        let mut url = Url::parse(&format!("{}/payment-callback", self.config.app_base_url))
            .map_err(|e| PaymentError::Config(format!("invalid APP_BASE_URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("bookingId", booking_id)
            .append_pair("transactionId", transaction_id);
        Ok(url.to_string())
    }

    fn extract_redirect_url(response: &PayResponse) -> Option<String> {
        if !response.success {
            return None;
        }
        response
            .data
            .as_ref()?
            .instrument_response
            .as_ref()?
            .redirect_info
            .as_ref()
            .map(|info| info.url.clone())
    }

    async fn discard_staged(&self, transaction_id: &str) {
        if let Err(e) = self.staging.remove(transaction_id).await {
            warn!(
                transaction_id = transaction_id,
                error = %e,
                "Failed to discard staged booking after gateway failure"
            );
        }
    }
}

/// Strip formatting from a mobile number, keeping digits only
pub fn normalize_mobile(raw: &str) -> PaymentResult<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(PaymentError::validation(
            "mobile_number must contain digits",
            Some("mobile_number"),
        ));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayEnvironment;

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

    fn service(staging: Arc<dyn PendingBookingStore>) -> CheckoutService {
        let gateway = Arc::new(
            GatewayClient::new(&crate::config::GatewayHttpConfig {
                timeout_secs: 2,
                status_max_retries: 0,
            })
            .unwrap(),
        );
        CheckoutService::new(test_config(), staging, gateway, 900)
    }

    #[test]
    fn mobile_numbers_normalize_to_digits() {
        assert_eq!(normalize_mobile("+91 98765-43210").unwrap(), "919876543210");
        assert_eq!(normalize_mobile("9876543210").unwrap(), "9876543210");
        assert!(normalize_mobile("+- ").is_err());
        assert!(normalize_mobile("").is_err());
    }

    #[test]
    fn return_url_encodes_query_parameters() {
        let staging = Arc::new(crate::staging::store::InMemoryPendingBookingStore::new());
        let service = service(staging);
        let url = service
            .return_url("booking 42", "NIBOG_42_1700000000000")
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:3000/payment-callback?bookingId=booking+42&transactionId=NIBOG_42_1700000000000"
        );
    }

    #[tokio::test]
    async fn validation_failures_never_touch_staging() {
        let staging = Arc::new(crate::staging::store::InMemoryPendingBookingStore::new());
        let service = service(staging.clone());

        let result = service
            .initiate(InitiateCheckout {
                booking_id: "".to_string(),
                user_id: "user_1".to_string(),
                amount: "799".to_string(),
                mobile_number: "9876543210".to_string(),
                booking: serde_json::json!({}),
            })
            .await;
        assert!(matches!(result, Err(PaymentError::Validation { .. })));
        assert_eq!(staging.len().await, 0);
    }

    #[tokio::test]
    async fn gateway_failure_discards_the_staged_record() {
        let staging = Arc::new(crate::staging::store::InMemoryPendingBookingStore::new());
        let service = service(staging.clone());

        // Nothing listens on the configured gateway port, so the call fails
        // at the network layer after the record was staged.
        let result = service
            .initiate(InitiateCheckout {
                booking_id: "42".to_string(),
                user_id: "user_1".to_string(),
                amount: "799".to_string(),
                mobile_number: "9876543210".to_string(),
                booking: serde_json::json!({"child": "Aarav"}),
            })
            .await;

        assert!(matches!(
            result,
            Err(PaymentError::GatewayUnreachable { .. }) | Err(PaymentError::GatewayTimeout { .. })
        ));
        assert_eq!(staging.len().await, 0);
    }
}
