//! Gateway wire types
//!
//! Field names follow PhonePe's camelCase wire format exactly; the payload
//! that gets signed is the payload that gets sent.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PaymentError;

/// Instrument type for the hosted payment page flow
pub const PAY_PAGE: &str = "PAY_PAGE";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub merchant_id: String,
    pub merchant_transaction_id: String,
    pub merchant_user_id: String,
    /// Amount in paise. Fractional paise are never sent.
    pub amount: i64,
    pub redirect_url: String,
    pub redirect_mode: String,
    pub callback_url: String,
    /// Digits only
    pub mobile_number: String,
    pub payment_instrument: PaymentInstrument,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInstrument {
    #[serde(rename = "type")]
    pub instrument_type: String,
}

impl PaymentInstrument {
    pub fn pay_page() -> Self {
        Self {
            instrument_type: PAY_PAGE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PayResponse {
    pub success: bool,
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<PayResponseData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayResponseData {
    #[serde(default)]
    pub merchant_id: Option<String>,
    pub merchant_transaction_id: String,
    #[serde(default)]
    pub instrument_response: Option<InstrumentResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentResponse {
    #[serde(rename = "type")]
    pub instrument_type: String,
    #[serde(default)]
    pub redirect_info: Option<RedirectInfo>,
}

#[derive(Debug, Deserialize)]
pub struct RedirectInfo {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
}

/// Response of the status endpoint; also the decoded body of a gateway
/// callback.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<StatusData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    #[serde(default)]
    pub merchant_id: Option<String>,
    pub merchant_transaction_id: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub response_code: Option<String>,
}

/// Gateway callback body: `{"response": "<base64>"}`
#[derive(Debug, Deserialize)]
pub struct CallbackEnvelope {
    pub response: String,
}

/// Terminal interpretation of a gateway response code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Pending,
    Failed,
}

/// Map a gateway response code to an outcome. Unknown codes are treated as
/// failures: nothing is ever promoted on a code we do not recognize.
pub fn outcome_from_code(code: &str) -> PaymentOutcome {
    match code {
        "PAYMENT_SUCCESS" => PaymentOutcome::Success,
        "PAYMENT_PENDING" | "PAYMENT_INITIATED" | "INTERNAL_SERVER_ERROR" => {
            PaymentOutcome::Pending
        }
        _ => PaymentOutcome::Failed,
    }
}

/// Convert a rupee amount (decimal string) to paise: `round(rupees * 100)`,
/// exact for two decimal places.
pub fn rupees_to_paise(amount: &str) -> Result<i64, PaymentError> {
    let rupees = Decimal::from_str(amount.trim()).map_err(|_| {
        PaymentError::validation(format!("invalid decimal amount: {}", amount), Some("amount"))
    })?;
    if rupees <= Decimal::ZERO {
        return Err(PaymentError::validation(
            "amount must be greater than zero",
            Some("amount"),
        ));
    }
    let paise = (rupees * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    paise.to_i64().ok_or_else(|| {
        PaymentError::validation(format!("amount out of range: {}", amount), Some("amount"))
    })
}
