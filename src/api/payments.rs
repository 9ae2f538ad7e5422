//! Payment initiation, gateway callback, and browser-return routes

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::AppState;
use crate::error::PaymentError;
use crate::gateway::types::CallbackEnvelope;
use crate::services::callback::VerificationOutcome;
use crate::services::checkout::InitiateCheckout;

/// POST /api/payments/initiate
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(request): Json<InitiateCheckout>,
) -> Result<impl IntoResponse, PaymentError> {
    info!(booking_id = %request.booking_id, "Payment initiation requested");
    let redirect = state.checkout.initiate(request).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "redirect_url": redirect.redirect_url,
        "transaction_id": redirect.transaction_id,
    })))
}

/// POST /api/payments/phonepe-callback
///
/// Server-to-server callback from the gateway. Gateways retry callbacks on
/// non-2xx, so every settled business outcome answers 200; only integrity
/// failures and transport-level problems surface as errors.
pub async fn handle_gateway_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(envelope): Json<CallbackEnvelope>,
) -> impl IntoResponse {
    let Some(x_verify) = headers.get("x-verify").and_then(|v| v.to_str().ok()) else {
        warn!("Gateway callback missing X-VERIFY header");
        return (StatusCode::UNAUTHORIZED, "Missing X-VERIFY header").into_response();
    };

    match state
        .callback
        .handle_gateway_callback(&envelope.response, x_verify)
        .await
    {
        Ok(outcome) => {
            info!(outcome = ?outcome, "Gateway callback processed");
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ClientReturnQuery {
    #[serde(rename = "bookingId", default)]
    pub booking_id: Option<String>,
    #[serde(rename = "transactionId", default)]
    pub transaction_id: Option<String>,
}

/// GET /payment-callback?bookingId=..&transactionId=..
///
/// Browser redirect target. Query parameters are attacker-visible, so the
/// handler re-queries the payment status server-side instead of trusting
/// them.
pub async fn handle_client_return(
    State(state): State<AppState>,
    Query(query): Query<ClientReturnQuery>,
) -> Result<impl IntoResponse, PaymentError> {
    let transaction_id = query.transaction_id.as_deref().unwrap_or("");
    info!(
        booking_id = query.booking_id.as_deref().unwrap_or("-"),
        transaction_id = transaction_id,
        "Client returned from gateway"
    );

    let outcome = state.callback.confirm_from_return(transaction_id).await?;
    let http_status = match &outcome {
        VerificationOutcome::Stale => StatusCode::GONE,
        _ => StatusCode::OK,
    };
    Ok((http_status, Json(outcome)))
}
