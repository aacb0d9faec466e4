//! # Metrics
//!
//! Counters for identity issuance and certificate record operations, exported
//! through the Prometheus recorder when enabled. Without an installed recorder
//! the macros are no-ops.

use crate::config::ObservabilityConfig;
use crate::errors::{InstanceError, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const IDENTITY_ISSUANCE_TOTAL: &str = "zts_identity_issuance_total";
pub const CERT_RECORD_OPERATIONS_TOTAL: &str = "zts_cert_record_operations_total";

/// Install the Prometheus exporter if metrics are enabled.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let Some(address) = config.metrics_bind_address() else {
        return Ok(());
    };

    let address: SocketAddr = address
        .parse()
        .map_err(|e| InstanceError::config(format!("Invalid metrics address: {}", e)))?;

    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .map_err(|e| InstanceError::config(format!("Failed to install metrics exporter: {}", e)))?;

    tracing::info!(address = %address, "Prometheus metrics exporter listening");
    Ok(())
}

/// Count one identity generation attempt by outcome (`issued`, `declined`, `error`).
pub fn record_identity_issuance(outcome: &'static str) {
    metrics::counter!(IDENTITY_ISSUANCE_TOTAL, "outcome" => outcome).increment(1);
}

/// Count one record operation by outcome (`completed`, `error`, or a skip reason).
pub fn record_cert_record_operation(operation: &'static str, outcome: &'static str) {
    metrics::counter!(CERT_RECORD_OPERATIONS_TOTAL, "operation" => operation, "outcome" => outcome)
        .increment(1);
}
