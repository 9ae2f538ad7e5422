//! Redis-backed pending-booking staging layer
//!
//! The staging store is the external source of truth for transaction state:
//! multiple server instances must agree on whether a booking is staged,
//! promoted, or gone, so none of this state lives in process memory.

pub mod error;
pub mod keys;
pub mod store;

use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use std::time::Duration;
use tracing::{error, info};

use error::StagingError;

/// Redis connection pool type alias
pub type RedisPool = Pool<RedisConnectionManager>;

/// Staging pool configuration
#[derive(Debug, Clone)]
pub struct StagingPoolConfig {
    pub redis_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
}

impl Default for StagingPoolConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Initialize the Redis connection pool for the staging store
pub async fn init_staging_pool(config: StagingPoolConfig) -> Result<RedisPool, StagingError> {
    info!(
        max_connections = config.max_connections,
        "Initializing staging store connection pool"
    );

    // Validates the URL before the pool ever hands out a connection
    redis::Client::open(config.redis_url.clone()).map_err(|e| {
        error!("Invalid Redis URL: {}", e);
        StagingError::ConnectionError(e.to_string())
    })?;

    let manager = RedisConnectionManager::new(config.redis_url.clone()).map_err(|e| {
        error!("Failed to create Redis connection manager: {}", e);
        StagingError::ConnectionError(e.to_string())
    })?;

    let pool = Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .await
        .map_err(|e| {
            error!("Failed to build Redis connection pool: {}", e);
            StagingError::ConnectionError(e.to_string())
        })?;

    test_connection(&pool).await?;
    info!("Staging store connection pool initialized");
    Ok(pool)
}

async fn test_connection(pool: &RedisPool) -> Result<(), StagingError> {
    let mut conn = pool
        .get()
        .await
        .map_err(|e| StagingError::ConnectionError(e.to_string()))?;

    let _: String = redis::cmd("PING")
        .query_async(&mut *conn)
        .await
        .map_err(|e| {
            error!("Redis PING failed: {}", e);
            StagingError::ConnectionError(e.to_string())
        })?;

    Ok(())
}

/// Health check for the staging connection pool
pub async fn health_check(pool: &RedisPool) -> Result<(), StagingError> {
    test_connection(pool).await
}
