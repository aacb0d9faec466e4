//! Integration tests for configuration management
//!
//! These tests validate that the configuration system properly reads
//! environment variables and rejects invalid values.

use std::env;
use std::sync::Mutex;

use zts_instance::config::{AppConfig, CertStoreKind};
use zts_instance::storage::build_cert_store;
use zts_instance::Result;

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ZTS_VARS: &[&str] = &[
    "ZTS_CERT_STORE",
    "ZTS_DATABASE_URL",
    "ZTS_DATABASE_MAX_CONNECTIONS",
    "ZTS_DATABASE_ACQUIRE_TIMEOUT_SECONDS",
    "ZTS_DATABASE_AUTO_MIGRATE",
    "ZTS_SIGNER_URL",
    "ZTS_SIGNER_TIMEOUT_SECONDS",
    "ZTS_SIGNER_MAX_ATTEMPTS",
    "ZTS_SERVICE_NAME",
    "ZTS_LOG_LEVEL",
    "ZTS_JSON_LOGGING",
    "ZTS_ENABLE_METRICS",
    "ZTS_METRICS_PORT",
];

/// Clears the ZTS environment on creation and restores it on drop.
struct EnvSnapshot {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvSnapshot {
    fn clean() -> Self {
        let saved = ZTS_VARS.iter().map(|key| (*key, env::var(key).ok())).collect();
        for key in ZTS_VARS {
            env::remove_var(key);
        }
        Self { saved }
    }
}

impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
fn test_config_defaults_integration() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    let _env = EnvSnapshot::clean();

    let config = AppConfig::from_env()?;
    assert_eq!(config.cert_store.kind, CertStoreKind::None);
    assert_eq!(config.cert_store.max_connections, 10);
    assert!(config.cert_store.auto_migrate);
    assert!(config.signer.url.is_none());
    assert_eq!(config.signer.max_attempts, 3);
    assert_eq!(config.observability.service_name, "zts-instance");
    assert_eq!(config.observability.log_level, "info");
    assert!(!config.observability.enable_metrics);

    Ok(())
}

#[test]
fn test_config_environment_integration() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    let _env = EnvSnapshot::clean();

    env::set_var("ZTS_CERT_STORE", "sqlite");
    env::set_var("ZTS_DATABASE_URL", "sqlite::memory:");
    env::set_var("ZTS_DATABASE_MAX_CONNECTIONS", "4");
    env::set_var("ZTS_DATABASE_AUTO_MIGRATE", "false");
    env::set_var("ZTS_SIGNER_URL", "https://signer.athenz.cloud:4443");
    env::set_var("ZTS_SIGNER_TIMEOUT_SECONDS", "30");
    env::set_var("ZTS_JSON_LOGGING", "true");
    env::set_var("ZTS_ENABLE_METRICS", "1");
    env::set_var("ZTS_METRICS_PORT", "9191");

    let config = AppConfig::from_env()?;
    assert_eq!(config.cert_store.kind, CertStoreKind::Sql);
    assert_eq!(config.cert_store.url, "sqlite::memory:");
    assert_eq!(config.cert_store.max_connections, 4);
    assert!(!config.cert_store.auto_migrate);
    assert_eq!(config.signer.url.as_deref(), Some("https://signer.athenz.cloud:4443"));
    assert_eq!(config.signer.timeout_seconds, 30);
    assert!(config.observability.json_logging);
    assert_eq!(config.observability.metrics_bind_address(), Some("0.0.0.0:9191".to_string()));

    Ok(())
}

#[test]
fn test_invalid_environment_values_rejected() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let _env = EnvSnapshot::clean();

    env::set_var("ZTS_DATABASE_MAX_CONNECTIONS", "plenty");
    assert!(AppConfig::from_env().is_err());
    env::remove_var("ZTS_DATABASE_MAX_CONNECTIONS");

    env::set_var("ZTS_DATABASE_MAX_CONNECTIONS", "500");
    assert!(AppConfig::from_env().is_err());
    env::remove_var("ZTS_DATABASE_MAX_CONNECTIONS");

    env::set_var("ZTS_CERT_STORE", "redis");
    assert!(AppConfig::from_env().is_err());
    env::remove_var("ZTS_CERT_STORE");

    env::set_var("ZTS_SIGNER_URL", "signer.athenz.cloud");
    assert!(AppConfig::from_env().is_err());
    env::remove_var("ZTS_SIGNER_URL");

    env::set_var("ZTS_SIGNER_MAX_ATTEMPTS", "0");
    assert!(AppConfig::from_env().is_err());
}

#[tokio::test]
async fn test_configured_memory_store_is_built() -> Result<()> {
    let config = {
        let _guard = ENV_MUTEX.lock().unwrap();
        let _env = EnvSnapshot::clean();
        env::set_var("ZTS_CERT_STORE", "memory");
        AppConfig::from_env()?
    };

    let store = build_cert_store(&config.cert_store).await?;
    assert_eq!(store.map(|s| s.store_type()), Some("memory"));

    Ok(())
}
