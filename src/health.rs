//! Health check module
//! Provides health status for the service and its dependencies

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info};

use crate::api::AppState;
use crate::staging::{self, RedisPool};

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }

    pub fn warning(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Warning,
            response_time_ms: None,
            details,
        }
    }
}

#[derive(Clone)]
pub struct HealthChecker {
    staging_pool: Option<RedisPool>,
    payment_config_valid: bool,
    config_errors: Vec<String>,
}

impl HealthChecker {
    pub fn new(
        staging_pool: Option<RedisPool>,
        payment_config_valid: bool,
        config_errors: Vec<String>,
    ) -> Self {
        Self {
            staging_pool,
            payment_config_valid,
            config_errors,
        }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let mut checks = HashMap::new();

        let staging_health = match &self.staging_pool {
            Some(pool) => {
                let start = Instant::now();
                match timeout(Duration::from_secs(2), staging::health_check(pool)).await {
                    Ok(Ok(())) => ComponentHealth::up(Some(start.elapsed().as_millis())),
                    Ok(Err(e)) => ComponentHealth::down(Some(e.to_string())),
                    Err(_) => ComponentHealth::down(Some("health check timed out".to_string())),
                }
            }
            None => ComponentHealth::warning(Some("staging store is in-memory".to_string())),
        };
        checks.insert("staging_store".to_string(), staging_health);

        let config_health = if self.payment_config_valid {
            ComponentHealth::up(None)
        } else {
            ComponentHealth::warning(Some(self.config_errors.join("; ")))
        };
        checks.insert("gateway_config".to_string(), config_health);

        let status = if checks
            .values()
            .any(|c| c.status == ComponentState::Down)
        {
            HealthState::Unhealthy
        } else if checks
            .values()
            .any(|c| c.status == ComponentState::Warning)
        {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        };

        HealthStatus {
            status,
            checks,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// GET /health
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    let health_status = state.health.check_health().await;

    if health_status.status == HealthState::Unhealthy {
        error!("Health check failed, service unhealthy");
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ))
    } else {
        Ok(Json(health_status))
    }
}

/// GET /health/ready - checks all dependencies
pub async fn readiness(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    let result = health(State(state)).await;
    if result.is_err() {
        info!("Readiness check failed");
    }
    result
}

/// GET /health/live - basic liveness only
pub async fn liveness() -> &'static str {
    "OK"
}
