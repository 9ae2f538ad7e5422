//! Application configuration module
//! Handles environment variable loading, gateway credential resolution, and
//! configuration validation

use std::env;
use tracing::{info, warn};

/// PhonePe sandbox (UAT) host
pub const SANDBOX_GATEWAY_BASE: &str = "https://api-preprod.phonepe.com/apis/pg-sandbox";
/// PhonePe production host
pub const PRODUCTION_GATEWAY_BASE: &str = "https://api.phonepe.com/apis/hermes";

// PhonePe's published UAT test credentials. These are public, not secrets,
// and are only ever used as sandbox fallbacks.
const SANDBOX_DEFAULT_MERCHANT_ID: &str = "PGTESTPAYUAT";
const SANDBOX_DEFAULT_SALT_KEY: &str = "099eb0cd-02cf-4e2a-8aca-3e6c6aff0399";
const SANDBOX_DEFAULT_SALT_INDEX: &str = "1";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub staging: StagingConfig,
    pub gateway_http: GatewayHttpConfig,
    pub booking_backend: BookingBackendConfig,
    pub payment: PaymentConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Staging store configuration
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub redis_url: String,
    pub max_connections: u32,
    /// Logical lifetime of a pending booking, seconds
    pub pending_ttl_secs: u64,
    /// How long an expired record stays physically readable (answers 410
    /// instead of 404) before Redis garbage-collects it, seconds
    pub gc_grace_secs: u64,
}

/// Outbound gateway HTTP configuration
#[derive(Debug, Clone)]
pub struct GatewayHttpConfig {
    pub timeout_secs: u64,
    /// Bounded retries for status *queries* only; payment initiation is
    /// never retried automatically
    pub status_max_retries: u32,
}

/// External booking-backend collaborator configuration
#[derive(Debug, Clone)]
pub struct BookingBackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Gateway environment tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEnvironment {
    Sandbox,
    Production,
}

impl GatewayEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayEnvironment::Sandbox => "sandbox",
            GatewayEnvironment::Production => "production",
        }
    }
}

impl std::fmt::Display for GatewayEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Gateway credentials and URLs, resolved once at startup and passed
/// explicitly into the signer and services
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub environment: GatewayEnvironment,
    pub merchant_id: String,
    pub salt_key: String,
    pub salt_index: String,
    pub app_base_url: String,
    pub gateway_base_url: String,
}

/// Outcome of credential validation. Resolution itself never fails; callers
/// decide whether an invalid config is fatal (production) or a warning
/// (sandbox).
#[derive(Debug, Clone)]
pub struct ConfigValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl PaymentConfig {
    /// Resolve gateway configuration from the environment. Never fails:
    /// missing values surface through [`PaymentConfig::validate`].
    ///
    /// Credential precedence per field: tier-specific variable
    /// (`PHONEPE_SANDBOX_*` / `PHONEPE_PRODUCTION_*`), then the generic
    /// variable, then the public sandbox default (production has none).
    pub fn resolve() -> Self {
        let environment = match env::var("PHONEPE_ENVIRONMENT")
            .unwrap_or_else(|_| "sandbox".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" => GatewayEnvironment::Production,
            "sandbox" => GatewayEnvironment::Sandbox,
            other => {
                warn!(
                    value = other,
                    "Unknown PHONEPE_ENVIRONMENT, falling back to sandbox"
                );
                GatewayEnvironment::Sandbox
            }
        };

        let gateway_base_url = env::var("PHONEPE_BASE_URL").unwrap_or_else(|_| {
            match environment {
                GatewayEnvironment::Production => PRODUCTION_GATEWAY_BASE,
                GatewayEnvironment::Sandbox => SANDBOX_GATEWAY_BASE,
            }
            .to_string()
        });

        let app_base_url = env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            merchant_id: Self::resolve_credential(
                environment,
                "MERCHANT_ID",
                SANDBOX_DEFAULT_MERCHANT_ID,
            ),
            salt_key: Self::resolve_credential(environment, "SALT_KEY", SANDBOX_DEFAULT_SALT_KEY),
            salt_index: Self::resolve_credential(
                environment,
                "SALT_INDEX",
                SANDBOX_DEFAULT_SALT_INDEX,
            ),
            environment,
            app_base_url,
            gateway_base_url: gateway_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve_credential(
        environment: GatewayEnvironment,
        suffix: &str,
        sandbox_default: &str,
    ) -> String {
        let tier_var = format!(
            "PHONEPE_{}_{}",
            environment.as_str().to_uppercase(),
            suffix
        );
        if let Ok(value) = env::var(&tier_var) {
            if !value.trim().is_empty() {
                return value;
            }
        }

        let generic_var = format!("PHONEPE_{}", suffix);
        if let Ok(value) = env::var(&generic_var) {
            if !value.trim().is_empty() {
                return value;
            }
        }

        match environment {
            GatewayEnvironment::Sandbox => sandbox_default.to_string(),
            GatewayEnvironment::Production => String::new(),
        }
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut errors = Vec::new();

        if self.merchant_id.trim().is_empty() {
            errors.push("merchant id is not set".to_string());
        }
        if self.salt_key.trim().is_empty() {
            errors.push("salt key is not set".to_string());
        }
        if self.salt_index.trim().is_empty() {
            errors.push("salt index is not set".to_string());
        } else if self.salt_index.parse::<u32>().is_err() {
            errors.push("salt index must be a small integer".to_string());
        }

        if self.environment == GatewayEnvironment::Production
            && self.salt_key == SANDBOX_DEFAULT_SALT_KEY
        {
            errors.push("production environment is using the sandbox salt key".to_string());
        }

        if !self.app_base_url.starts_with("http://") && !self.app_base_url.starts_with("https://") {
            errors.push("APP_BASE_URL must be an absolute http(s) URL".to_string());
        }
        if !self.gateway_base_url.starts_with("http://")
            && !self.gateway_base_url.starts_with("https://")
        {
            errors.push("gateway base URL must be an absolute http(s) URL".to_string());
        }

        ConfigValidation {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Log a redacted configuration summary: booleans for "is set", never
    /// the secret values themselves.
    pub fn log_summary(&self) {
        info!(
            environment = %self.environment,
            gateway_base_url = %self.gateway_base_url,
            app_base_url = %self.app_base_url,
            merchant_id_set = !self.merchant_id.is_empty(),
            salt_key_set = !self.salt_key.is_empty(),
            salt_index = %self.salt_index,
            "Gateway configuration resolved"
        );
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            staging: StagingConfig::from_env()?,
            gateway_http: GatewayHttpConfig::from_env()?,
            booking_backend: BookingBackendConfig::from_env()?,
            payment: PaymentConfig::resolve(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.staging.validate()?;
        self.gateway_http.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl StagingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(StagingConfig {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            max_connections: env::var("STAGING_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STAGING_MAX_CONNECTIONS".to_string()))?,
            pending_ttl_secs: env::var("PENDING_BOOKING_TTL_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PENDING_BOOKING_TTL_SECS".to_string()))?,
            gc_grace_secs: env::var("PENDING_BOOKING_GC_GRACE_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("PENDING_BOOKING_GC_GRACE_SECS".to_string())
                })?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err(ConfigError::InvalidValue(
                "REDIS_URL must start with redis:// or rediss://".to_string(),
            ));
        }
        if self.pending_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PENDING_BOOKING_TTL_SECS cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl GatewayHttpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayHttpConfig {
            timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_TIMEOUT_SECS".to_string()))?,
            status_max_retries: env::var("STATUS_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STATUS_MAX_RETRIES".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_TIMEOUT_SECS cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl BookingBackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(BookingBackendConfig {
            base_url: env::var("BOOKING_API_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: env::var("BOOKING_API_KEY").ok().filter(|v| !v.is_empty()),
            timeout_secs: env::var("BOOKING_API_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BOOKING_API_TIMEOUT_SECS".to_string()))?,
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
