use nibog_payments::api::{self, AppState};
use nibog_payments::config::{AppConfig, GatewayEnvironment};
use nibog_payments::gateway::client::GatewayClient;
use nibog_payments::health::HealthChecker;
use nibog_payments::logging::init_tracing;
use nibog_payments::middleware::logging::{request_logging_middleware, UuidRequestId};
use nibog_payments::services::booking::HttpBookingBackend;
use nibog_payments::services::callback::CallbackService;
use nibog_payments::services::checkout::CheckoutService;
use nibog_payments::staging::store::{
    InMemoryPendingBookingStore, PendingBookingStore, RedisPendingBookingStore,
};
use nibog_payments::staging::{init_staging_pool, RedisPool, StagingPoolConfig};

use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info, warn};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenv().ok();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "🚀 Starting NIBOG payment service"
    );

    let app_config = AppConfig::from_env()?;
    app_config.validate()?;

    let payment_config = app_config.payment.clone();
    payment_config.log_summary();
    let validation = payment_config.validate();
    if !validation.is_valid {
        if payment_config.environment == GatewayEnvironment::Production {
            for err in &validation.errors {
                error!(error = %err, "Invalid production gateway configuration");
            }
            anyhow::bail!("refusing to start with invalid production gateway configuration");
        }
        for err in &validation.errors {
            warn!(error = %err, "Gateway configuration issue, continuing in sandbox");
        }
    }

    let skip_externals = std::env::var("SKIP_EXTERNALS")
        .unwrap_or_else(|_| "false".to_string())
        .to_lowercase()
        == "true";

    let (staging_pool, staging_store): (Option<RedisPool>, Arc<dyn PendingBookingStore>) =
        if skip_externals {
            info!("⏭️  Skipping Redis initialization (SKIP_EXTERNALS=true)");
            (None, Arc::new(InMemoryPendingBookingStore::new()))
        } else {
            info!("🔄 Initializing staging store connection pool...");
            let pool = init_staging_pool(StagingPoolConfig {
                redis_url: app_config.staging.redis_url.clone(),
                max_connections: app_config.staging.max_connections,
                connection_timeout: Duration::from_secs(5),
            })
            .await?;
            let store =
                RedisPendingBookingStore::new(pool.clone(), app_config.staging.gc_grace_secs);
            info!("✅ Staging store connection pool initialized");
            (Some(pool), Arc::new(store))
        };

    let gateway = Arc::new(GatewayClient::new(&app_config.gateway_http)?);
    let booking_backend = Arc::new(HttpBookingBackend::new(&app_config.booking_backend)?);

    let checkout = Arc::new(CheckoutService::new(
        payment_config.clone(),
        staging_store.clone(),
        gateway.clone(),
        app_config.staging.pending_ttl_secs,
    ));
    let callback = Arc::new(CallbackService::new(
        payment_config.clone(),
        staging_store.clone(),
        gateway.clone(),
        booking_backend,
    ));

    let health_checker = HealthChecker::new(
        staging_pool,
        validation.is_valid,
        validation.errors.clone(),
    );

    info!("🛣️  Setting up application routes...");
    let app = api::router(AppState {
        checkout,
        callback,
        staging: staging_store,
        health: health_checker,
    })
    .layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(axum::middleware::from_fn(request_logging_middleware))
            .layer(PropagateRequestIdLayer::x_request_id()),
    );
    info!("✅ Routes configured");

    let addr: SocketAddr =
        format!("{}:{}", app_config.server.host, app_config.server.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(
        address = %addr,
        environment = %payment_config.environment,
        "🚀 Server listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}
