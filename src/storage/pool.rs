//! # Database Connection Pool Management
//!
//! SQLite pool creation for the SQL certificate record store.

use crate::config::CertStoreConfig;
use crate::errors::{InstanceError, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{str::FromStr, time::Duration};

/// Type alias for the database connection pool
pub type DbPool = Pool<Sqlite>;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a database connection pool with the specified configuration
pub async fn create_pool(config: &CertStoreConfig) -> Result<DbPool> {
    if !config.is_sqlite() {
        return Err(InstanceError::validation("database URL must start with 'sqlite:'"));
    }

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| {
            InstanceError::database(
                e,
                format!("Invalid SQLite connection string: {}", sanitize_url(&config.url)),
            )
        })?
        .create_if_missing(true)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                url = %sanitize_url(&config.url),
                busy_timeout_ms = SQLITE_BUSY_TIMEOUT.as_millis(),
                "Failed to create SQLite database pool"
            );
            InstanceError::database(
                e,
                format!("Failed to connect to database: {}", sanitize_url(&config.url)),
            )
        })?;

    tracing::info!(
        max_connections = config.max_connections,
        acquire_timeout_ms = config.acquire_timeout().as_millis(),
        "Database connection pool created"
    );

    if config.auto_migrate {
        tracing::info!("Auto-migration enabled, running database migrations");
        super::migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

/// Sanitize database URL for logging (remove credentials)
fn sanitize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.password().is_some() || !parsed.username().is_empty() => format!(
            "{}://***:***@{}{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or("unknown"),
            parsed.path()
        ),
        _ => url.to_string(),
    }
}
