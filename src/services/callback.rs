//! Callback verification and pending-booking promotion
//!
//! Two entry points converge on one settlement path: the gateway's
//! server-to-server callback (integrity header verified against the shared
//! salt) and the browser return (query parameters are untrusted, so the
//! status is re-queried from the gateway first). Promotion is a one-way
//! staged-to-promoted transition claimed before the confirmed booking is
//! created, so one transaction ID can never produce two bookings.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::PaymentConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::gateway::client::GatewayClient;
use crate::gateway::signer::{status_checksum, verify_callback};
use crate::gateway::types::{outcome_from_code, PaymentOutcome, StatusResponse};
use crate::gateway::STATUS_PATH_PREFIX;
use crate::services::booking::BookingBackend;
use crate::staging::store::{PendingBookingStore, PendingStatus, StagedLookup};

/// What happened to the transaction this callback was about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum VerificationOutcome {
    /// Staged booking was verified and promoted into a confirmed booking
    Promoted { booking_ref: String },
    /// The transaction was already promoted; a repeated callback is a
    /// success no-op, never a duplicate booking
    AlreadyProcessed,
    /// Gateway has not settled the payment yet
    Pending,
    /// Gateway reported failure/timeout; nothing was promoted
    Failed { code: String },
    /// The pending booking expired or never existed; a stale success is
    /// never resurrected
    Stale,
    /// The staged payload is unreadable and needs manual cleanup
    Corrupted { transaction_id: String },
}

pub struct CallbackService {
    config: PaymentConfig,
    staging: Arc<dyn PendingBookingStore>,
    gateway: Arc<GatewayClient>,
    booking_backend: Arc<dyn BookingBackend>,
}

impl CallbackService {
    pub fn new(
        config: PaymentConfig,
        staging: Arc<dyn PendingBookingStore>,
        gateway: Arc<GatewayClient>,
        booking_backend: Arc<dyn BookingBackend>,
    ) -> Self {
        Self {
            config,
            staging,
            gateway,
            booking_backend,
        }
    }

    /// Handle the gateway's server-to-server callback: a base64 body plus
    /// the gateway's X-VERIFY header.
    pub async fn handle_gateway_callback(
        &self,
        base64_body: &str,
        x_verify: &str,
    ) -> PaymentResult<VerificationOutcome> {
        if !verify_callback(base64_body, x_verify, &self.config) {
            error!("Gateway callback failed integrity verification");
            return Err(PaymentError::TamperDetected {
                reason: "callback X-VERIFY header does not match recomputed checksum".to_string(),
            });
        }

        let decoded = STANDARD.decode(base64_body).map_err(|e| {
            PaymentError::validation(format!("callback body is not base64: {}", e), None)
        })?;
        let payload: StatusResponse = serde_json::from_slice(&decoded).map_err(|e| {
            PaymentError::validation(format!("callback body is not valid JSON: {}", e), None)
        })?;

        let transaction_id = payload
            .data
            .as_ref()
            .map(|d| d.merchant_transaction_id.clone())
            .ok_or_else(|| {
                PaymentError::validation("callback has no merchantTransactionId", None)
            })?;

        self.settle(&transaction_id, &payload.code).await
    }

    /// Handle the browser return. The transaction ID arrives as a query
    /// parameter, which is attacker-visible, so the authoritative outcome is
    /// re-queried from the gateway before anything is promoted.
    pub async fn confirm_from_return(
        &self,
        transaction_id: &str,
    ) -> PaymentResult<VerificationOutcome> {
        if transaction_id.trim().is_empty() {
            return Err(PaymentError::validation(
                "transactionId is required",
                Some("transactionId"),
            ));
        }

        let path = format!(
            "{}/{}/{}",
            STATUS_PATH_PREFIX, self.config.merchant_id, transaction_id
        );
        let checksum = status_checksum(&path, &self.config);
        let response = self
            .gateway
            .status(
                &self.config.gateway_base_url,
                &self.config.merchant_id,
                transaction_id,
                &checksum,
            )
            .await?;

        self.settle(transaction_id, &response.code).await
    }

    /// Reconcile a verified gateway outcome with the staged booking.
    async fn settle(
        &self,
        transaction_id: &str,
        gateway_code: &str,
    ) -> PaymentResult<VerificationOutcome> {
        let outcome = outcome_from_code(gateway_code);

        match self.staging.get(transaction_id).await? {
            StagedLookup::NotFound => {
                if outcome == PaymentOutcome::Success {
                    // Promotion removes the record; a retried success
                    // callback lands here.
                    info!(
                        transaction_id = transaction_id,
                        "Success callback for unknown transaction, treating as already processed"
                    );
                    Ok(VerificationOutcome::AlreadyProcessed)
                } else {
                    warn!(
                        transaction_id = transaction_id,
                        code = gateway_code,
                        "Callback for unknown transaction"
                    );
                    Ok(VerificationOutcome::Stale)
                }
            }
            StagedLookup::Expired(_) => {
                warn!(
                    transaction_id = transaction_id,
                    code = gateway_code,
                    "Callback for expired booking, not promoting"
                );
                Ok(VerificationOutcome::Stale)
            }
            StagedLookup::Corrupted { reason, .. } => {
                error!(
                    transaction_id = transaction_id,
                    reason = %reason,
                    "Staged booking is corrupted, flagged for manual cleanup"
                );
                Ok(VerificationOutcome::Corrupted {
                    transaction_id: transaction_id.to_string(),
                })
            }
            StagedLookup::Found(record) => {
                if record.status == PendingStatus::Promoted {
                    return Ok(VerificationOutcome::AlreadyProcessed);
                }

                match outcome {
                    PaymentOutcome::Pending => Ok(VerificationOutcome::Pending),
                    PaymentOutcome::Failed => {
                        let _ = self
                            .staging
                            .update_status(transaction_id, PendingStatus::Failed)
                            .await;
                        info!(
                            transaction_id = transaction_id,
                            code = gateway_code,
                            "Payment failed, booking stays unconfirmed"
                        );
                        Ok(VerificationOutcome::Failed {
                            code: gateway_code.to_string(),
                        })
                    }
                    PaymentOutcome::Success => {
                        // Claim the promotion first; losing the claim means
                        // another handler already promoted this transaction.
                        let claimed = self
                            .staging
                            .update_status(transaction_id, PendingStatus::Promoted)
                            .await?;
                        if !claimed {
                            return Ok(VerificationOutcome::AlreadyProcessed);
                        }

                        let booking_ref = self
                            .booking_backend
                            .create_booking(transaction_id, &record.booking_data)
                            .await?;

                        if let Err(e) = self.staging.remove(transaction_id).await {
                            warn!(
                                transaction_id = transaction_id,
                                error = %e,
                                "Promoted booking record could not be removed"
                            );
                        }

                        info!(
                            transaction_id = transaction_id,
                            booking_ref = %booking_ref,
                            "Pending booking promoted"
                        );
                        Ok(VerificationOutcome::Promoted { booking_ref })
                    }
                }
            }
        }
    }
}
