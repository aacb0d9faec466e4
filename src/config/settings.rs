//! # Configuration Settings
//!
//! Defines the configuration structure for the instance certificate core.

use crate::errors::{InstanceError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Certificate record store configuration
    #[validate(nested)]
    pub cert_store: CertStoreConfig,

    /// Certificate signer configuration
    #[validate(nested)]
    pub signer: SignerConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(InstanceError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Cross-field checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if self.cert_store.kind == CertStoreKind::Sql && !self.cert_store.is_sqlite() {
            return Err(InstanceError::validation(
                "Certificate store URL must start with 'sqlite:'",
            ));
        }

        if let Some(url) = &self.signer.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(InstanceError::validation(
                    "Signer URL must start with 'http://' or 'https://'",
                ));
            }
        }

        if self.observability.enable_metrics && self.observability.metrics_port == 0 {
            return Err(InstanceError::validation(
                "Metrics port must be set when metrics are enabled",
            ));
        }

        Ok(())
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            cert_store: CertStoreConfig::from_env()?,
            signer: SignerConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Backend used for certificate bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CertStoreKind {
    /// Run without bookkeeping persistence
    #[default]
    None,
    /// Process-local in-memory store
    Memory,
    /// SQL database through sqlx
    Sql,
}

impl CertStoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Memory => "memory",
            Self::Sql => "sql",
        }
    }
}

impl FromStr for CertStoreKind {
    type Err = InstanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "disabled" => Ok(Self::None),
            "memory" => Ok(Self::Memory),
            "sql" | "sqlite" => Ok(Self::Sql),
            other => Err(InstanceError::config(format!("Unknown certificate store: {}", other))),
        }
    }
}

impl std::fmt::Display for CertStoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Certificate record store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CertStoreConfig {
    /// Which backend to use
    pub kind: CertStoreKind,

    /// Database connection URL (SQL store only)
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// How long to wait for a pooled connection before giving up
    #[validate(range(
        min = 1,
        max = 60,
        message = "Acquire timeout must be between 1 and 60 seconds"
    ))]
    pub acquire_timeout_seconds: u64,

    /// Apply embedded migrations when the pool is created
    pub auto_migrate: bool,
}

impl Default for CertStoreConfig {
    fn default() -> Self {
        Self {
            kind: CertStoreKind::None,
            url: "sqlite://./data/zts-certificates.db".to_string(),
            max_connections: 10,
            acquire_timeout_seconds: 5,
            auto_migrate: true,
        }
    }
}

impl CertStoreConfig {
    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// Create CertStoreConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            kind: std::env::var("ZTS_CERT_STORE")
                .ok()
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(defaults.kind),
            url: std::env::var("ZTS_DATABASE_URL").unwrap_or(defaults.url),
            max_connections: env_parse("ZTS_DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            acquire_timeout_seconds: env_parse(
                "ZTS_DATABASE_ACQUIRE_TIMEOUT_SECONDS",
                defaults.acquire_timeout_seconds,
            )?,
            auto_migrate: env_flag("ZTS_DATABASE_AUTO_MIGRATE", defaults.auto_migrate),
        })
    }
}

/// Certificate signer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignerConfig {
    /// Base URL of the signing daemon (None = no signer configured)
    pub url: Option<String>,

    /// Per-request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Attempts per request, including the first
    #[validate(range(min = 1, max = 10, message = "Max attempts must be between 1 and 10"))]
    pub max_attempts: u32,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self { url: None, timeout_seconds: 10, max_attempts: 3 }
    }
}

impl SignerConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Create SignerConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: std::env::var("ZTS_SIGNER_URL").ok().filter(|v| !v.is_empty()),
            timeout_seconds: env_parse("ZTS_SIGNER_TIMEOUT_SECONDS", defaults.timeout_seconds)?,
            max_attempts: env_parse("ZTS_SIGNER_MAX_ATTEMPTS", defaults.max_attempts)?,
        })
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Service name attached to startup logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Enable the Prometheus metrics listener
    pub enable_metrics: bool,

    /// Metrics listener port
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "zts-instance".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
            enable_metrics: false,
            metrics_port: 9090,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if !self.enable_metrics || self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }

    /// Create ObservabilityConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            service_name: std::env::var("ZTS_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: std::env::var("ZTS_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: env_flag("ZTS_JSON_LOGGING", defaults.json_logging),
            enable_metrics: env_flag("ZTS_ENABLE_METRICS", defaults.enable_metrics),
            metrics_port: env_parse("ZTS_METRICS_PORT", defaults.metrics_port)?,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| InstanceError::config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}
