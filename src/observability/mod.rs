//! # Observability Infrastructure
//!
//! Structured logging and metrics for the instance certificate core.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::init_metrics;

use crate::config::ObservabilityConfig;
use crate::errors::Result;

/// Initialize logging, then metrics when enabled.
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_logging(config)?;
    init_metrics(config)?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        metrics_enabled = config.enable_metrics,
        "Observability initialized"
    );

    Ok(())
}
