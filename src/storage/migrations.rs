//! # Database Migration Management
//!
//! Schema migrations are embedded in the binary at compile time from
//! `./migrations` and applied on pool creation when `auto_migrate` is set.

use super::DbPool;
use crate::errors::Result;
use sqlx::migrate::Migrator;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!(available = MIGRATOR.iter().count(), "Starting database migration process");
    let start_time = std::time::Instant::now();

    MIGRATOR.run(pool).await?;

    info!(
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Database migrations completed"
    );
    Ok(())
}
