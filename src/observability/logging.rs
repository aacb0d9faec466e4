//! # Structured Logging
//!
//! Installs the `tracing-subscriber` formatter used by the binary.
//!
//! `RUST_LOG` wins over the configured level when set, so a single run can be
//! made more verbose without touching configuration.

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{InstanceError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            InstanceError::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json_logging { builder.json().try_init() } else { builder.try_init() };

    installed
        .map_err(|e| InstanceError::config(format!("Failed to install tracing subscriber: {}", e)))
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        cert_store = %config.cert_store.kind,
        signer_configured = config.signer.url.is_some(),
        metrics_enabled = config.observability.enable_metrics,
        json_logging = config.observability.json_logging,
        "Instance certificate core configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_log_level_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = ObservabilityConfig {
            log_level: "zts_instance=loudest".to_string(),
            ..Default::default()
        };
        assert!(matches!(init_logging(&config), Err(InstanceError::Config { .. })));
    }

    #[test]
    fn test_log_config_info() {
        let config = AppConfig::default();

        // This should not panic
        log_config_info(&config);
    }
}
