//! Internal pending-booking retrieval and deletion routes
//!
//! Response contract: 200 found, 404 never existed, 410 expired (the client
//! distinguishes "wrong id" from "too slow, start over"), 207 corrupted and
//! awaiting manual cleanup, 503 store unreachable.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::api::AppState;
use crate::staging::store::StagedLookup;

#[derive(Debug, Deserialize)]
pub struct GetPendingBookingRequest {
    pub transaction_id: String,
}

/// POST /api/pending-bookings/get
pub async fn get_pending_booking(
    State(state): State<AppState>,
    Json(request): Json<GetPendingBookingRequest>,
) -> impl IntoResponse {
    match state.staging.get(&request.transaction_id).await {
        Ok(StagedLookup::Found(record)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "transactionId": record.transaction_id,
                "bookingData": record.booking_data,
                "expiresAt": record.expires_at,
                "status": record.status,
            })),
        )
            .into_response(),
        Ok(StagedLookup::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": "not_found",
                "message": "No pending booking for this transaction ID",
            })),
        )
            .into_response(),
        Ok(StagedLookup::Expired(record)) => {
            info!(
                transaction_id = %record.transaction_id,
                "Expired pending booking requested"
            );
            (
                StatusCode::GONE,
                Json(serde_json::json!({
                    "success": false,
                    "error": "expired",
                    "message": "Checkout session expired, please restart checkout",
                })),
            )
                .into_response()
        }
        Ok(StagedLookup::Corrupted {
            transaction_id,
            reason,
        }) => {
            warn!(
                transaction_id = %transaction_id,
                reason = %reason,
                "Corrupted pending booking requested"
            );
            (
                StatusCode::MULTI_STATUS,
                Json(serde_json::json!({
                    "success": false,
                    "error": "corrupted",
                    "needs_cleanup": true,
                    "message": "Stored booking data is unreadable",
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Staging store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "success": false,
                    "error": "store_unavailable",
                    "message": "Booking storage is temporarily unavailable",
                })),
            )
                .into_response()
        }
    }
}

/// DELETE /api/pending-bookings/{transaction_id}
pub async fn delete_pending_booking(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> impl IntoResponse {
    match state.staging.remove(&transaction_id).await {
        Ok(()) => {
            info!(transaction_id = %transaction_id, "Pending booking deleted");
            (
                StatusCode::OK,
                Json(serde_json::json!({"success": true})),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to delete pending booking");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "success": false,
                    "error": "store_unavailable",
                })),
            )
                .into_response()
        }
    }
}
