//! Unified error handling for the payment service
//!
//! Every failure mode carries its own retry policy and HTTP mapping.
//! Integrity failures (signature, tamper) are fatal and never retried;
//! network-level gateway failures are retryable for status queries only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::staging::error::StagingError;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Hash/serialization failure while signing. Always fatal: a corrupted
    /// signature must never be sent.
    #[error("Signature computation failed: {0}")]
    Signature(String),

    #[error("Gateway rejected request: HTTP {status}: {body}")]
    GatewayRejected { status: u16, body: String },

    #[error("Gateway request timed out after {timeout_secs}s")]
    GatewayTimeout { timeout_secs: u64 },

    #[error("Gateway unreachable: {message}")]
    GatewayUnreachable { message: String },

    /// Callback integrity header did not match the recomputed one. Either a
    /// configuration bug or a security event; never downgraded to a generic
    /// retry message.
    #[error("Callback integrity check failed: {reason}")]
    TamperDetected { reason: String },

    #[error("Pending booking expired or missing: {transaction_id}")]
    StaleBooking { transaction_id: String },

    #[error("Pending booking payload corrupted for {transaction_id}: {reason}")]
    CorruptedBooking {
        transaction_id: String,
        reason: String,
    },

    #[error("Staging store error: {0}")]
    Staging(#[from] StagingError),

    #[error("Booking backend error: {message}")]
    BookingBackend { message: String, retryable: bool },
}

impl PaymentError {
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        PaymentError::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    /// Whether the *operation that produced this error* may be retried
    /// as-is. Payment initiation is excluded regardless: a retry there must
    /// go through a fresh transaction ID (caller's decision).
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Validation { .. } => false,
            PaymentError::Config(_) => false,
            PaymentError::Signature(_) => false,
            PaymentError::GatewayRejected { status, .. } => *status >= 500,
            PaymentError::GatewayTimeout { .. } => true,
            PaymentError::GatewayUnreachable { .. } => true,
            PaymentError::TamperDetected { .. } => false,
            PaymentError::StaleBooking { .. } => false,
            PaymentError::CorruptedBooking { .. } => false,
            PaymentError::Staging(_) => true,
            PaymentError::BookingBackend { retryable, .. } => *retryable,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::Validation { .. } => 400,
            PaymentError::Config(_) => 500,
            PaymentError::Signature(_) => 500,
            PaymentError::GatewayRejected { .. } => 502,
            PaymentError::GatewayTimeout { .. } => 504,
            PaymentError::GatewayUnreachable { .. } => 503,
            PaymentError::TamperDetected { .. } => 401,
            PaymentError::StaleBooking { .. } => 410,
            PaymentError::CorruptedBooking { .. } => 207,
            PaymentError::Staging(_) => 503,
            PaymentError::BookingBackend { .. } => 502,
        }
    }

    /// Machine-readable error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            PaymentError::Validation { .. } => "VALIDATION_ERROR",
            PaymentError::Config(_) => "CONFIGURATION_ERROR",
            PaymentError::Signature(_) => "SIGNATURE_ERROR",
            PaymentError::GatewayRejected { .. } => "GATEWAY_REJECTED",
            PaymentError::GatewayTimeout { .. } => "GATEWAY_TIMEOUT",
            PaymentError::GatewayUnreachable { .. } => "GATEWAY_UNREACHABLE",
            PaymentError::TamperDetected { .. } => "TAMPER_DETECTED",
            PaymentError::StaleBooking { .. } => "STALE_BOOKING",
            PaymentError::CorruptedBooking { .. } => "CORRUPTED_BOOKING",
            PaymentError::Staging(_) => "STAGING_ERROR",
            PaymentError::BookingBackend { .. } => "BOOKING_BACKEND_ERROR",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PaymentError::Validation { message, .. } => message.clone(),
            PaymentError::Config(_) => "Payment service is misconfigured".to_string(),
            PaymentError::Signature(_) => "Could not prepare the payment request".to_string(),
            PaymentError::GatewayRejected { .. } => {
                "The payment gateway rejected the request".to_string()
            }
            PaymentError::GatewayTimeout { .. } | PaymentError::GatewayUnreachable { .. } => {
                "The payment gateway is temporarily unavailable".to_string()
            }
            PaymentError::TamperDetected { .. } => {
                "Payment callback failed integrity verification".to_string()
            }
            PaymentError::StaleBooking { .. } => {
                "Your checkout session has expired. Please restart checkout".to_string()
            }
            PaymentError::CorruptedBooking { .. } => {
                "Your booking data could not be read. Please contact support".to_string()
            }
            PaymentError::Staging(_) => "Booking storage is temporarily unavailable".to_string(),
            PaymentError::BookingBackend { .. } => {
                "The booking service returned an error".to_string()
            }
        }
    }
}

/// Standardized error response structure returned to clients for all error
/// cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// ISO 8601 timestamp of the error
    pub timestamp: String,

    /// Whether the client should retry the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn from_payment_error(error: &PaymentError) -> Self {
        Self {
            error: error.error_code().to_string(),
            message: error.user_message(),
            timestamp: Utc::now().to_rfc3339(),
            retryable: Some(error.is_retryable()),
            details: None,
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::from_payment_error(&self);
        (status, Json(body)).into_response()
    }
}
