//! HTTP surface: payment routes, internal pending-booking routes, health

pub mod payments;
pub mod pending_bookings;

use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;

use crate::health::HealthChecker;
use crate::services::callback::CallbackService;
use crate::services::checkout::CheckoutService;
use crate::staging::store::PendingBookingStore;

#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<CheckoutService>,
    pub callback: Arc<CallbackService>,
    pub staging: Arc<dyn PendingBookingStore>,
    pub health: HealthChecker,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(crate::health::health))
        .route("/health/ready", get(crate::health::readiness))
        .route("/health/live", get(crate::health::liveness))
        .route("/api/payments/initiate", post(payments::initiate_payment))
        .route(
            "/api/payments/phonepe-callback",
            post(payments::handle_gateway_callback),
        )
        .route("/payment-callback", get(payments::handle_client_return))
        .route(
            "/api/pending-bookings/get",
            post(pending_bookings::get_pending_booking),
        )
        .route(
            "/api/pending-bookings/{transaction_id}",
            delete(pending_bookings::delete_pending_booking),
        )
        .with_state(state)
}

async fn root() -> &'static str {
    "NIBOG payment service"
}
