//! Outbound gateway HTTP client
//!
//! Payment initiation is a single attempt: re-sending a signed pay request
//! risks a duplicate charge attempt, so retries are the caller's explicit
//! decision with a fresh transaction ID. Status queries are read-only and
//! retry with exponential backoff on network-level failures.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

use crate::config::GatewayHttpConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::gateway::signer::SignedRequest;
use crate::gateway::types::{PayResponse, StatusResponse};
use crate::gateway::{PAY_PATH, STATUS_PATH_PREFIX};

pub struct GatewayClient {
    client: Client,
    timeout: Duration,
    status_max_retries: u32,
}

impl GatewayClient {
    pub fn new(config: &GatewayHttpConfig) -> PaymentResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            PaymentError::GatewayUnreachable {
                message: format!("failed to initialize HTTP client: {}", e),
            }
        })?;

        Ok(Self {
            client,
            timeout,
            status_max_retries: config.status_max_retries,
        })
    }

    /// POST the signed pay request. Single attempt, no automatic retry.
    pub async fn pay(&self, base_url: &str, signed: &SignedRequest) -> PaymentResult<PayResponse> {
        let url = format!("{}{}", base_url, PAY_PATH);
        let body = serde_json::json!({ "request": signed.base64_payload });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-VERIFY", &signed.x_verify)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        Self::read_json(response).await
    }

    /// GET the transaction status. Safe to retry: bounded backoff on
    /// timeouts, unreachability, and gateway 5xx.
    pub async fn status(
        &self,
        base_url: &str,
        merchant_id: &str,
        transaction_id: &str,
        checksum: &str,
    ) -> PaymentResult<StatusResponse> {
        let url = format!(
            "{}{}/{}/{}",
            base_url, STATUS_PATH_PREFIX, merchant_id, transaction_id
        );

        let mut last_error = None;
        for attempt in 0..=self.status_max_retries {
            let result = self
                .client
                .get(&url)
                .header("Content-Type", "application/json")
                .header("X-VERIFY", checksum)
                .header("X-MERCHANT-ID", merchant_id)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| self.classify_send_error(e));

            match result {
                Ok(response) => match Self::read_json::<StatusResponse>(response).await {
                    Ok(parsed) => return Ok(parsed),
                    Err(e) if e.is_retryable() && attempt < self.status_max_retries => {
                        warn!(
                            transaction_id = transaction_id,
                            attempt = attempt + 1,
                            error = %e,
                            "status query failed, retrying"
                        );
                        last_error = Some(e);
                    }
                    Err(e) => return Err(e),
                },
                Err(e) if attempt < self.status_max_retries => {
                    warn!(
                        transaction_id = transaction_id,
                        attempt = attempt + 1,
                        error = %e,
                        "status query failed, retrying"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
        }

        Err(last_error.unwrap_or(PaymentError::GatewayUnreachable {
            message: "status query failed".to_string(),
        }))
    }

    fn classify_send_error(&self, error: reqwest::Error) -> PaymentError {
        if error.is_timeout() {
            PaymentError::GatewayTimeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            PaymentError::GatewayUnreachable {
                message: error.to_string(),
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> PaymentResult<T> {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return serde_json::from_str::<T>(&text).map_err(|e| PaymentError::GatewayRejected {
                status: status.as_u16(),
                body: format!("invalid gateway JSON response: {}", e),
            });
        }

        Err(PaymentError::GatewayRejected {
            status: status.as_u16(),
            body: text,
        })
    }
}
