//! # Certificate Record Storage
//!
//! Pluggable persistence for certificate bookkeeping records.
//!
//! A [`CertRecordStore`] hands out short-lived [`CertRecordStoreConnection`]s.
//! Callers hold a connection for exactly one operation through a
//! [`ConnectionGuard`], which closes it when it leaves scope. That covers
//! errors, panics and dropped futures.
//!
//! # Available Stores
//!
//! - **InMemoryCertRecordStore**: `DashMap`-backed store for tests and single-node use
//! - **SqlCertRecordStore**: SQLite through `sqlx`, with embedded migrations

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod sql;

pub use memory::InMemoryCertRecordStore;
pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool};
pub use sql::SqlCertRecordStore;

use crate::config::{CertStoreConfig, CertStoreKind};
use crate::domain::X509CertRecord;
use crate::errors::Result;
use async_trait::async_trait;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A per-operation handle to a certificate record backend.
#[async_trait]
pub trait CertRecordStoreConnection: Send {
    /// Fetch the record for `(provider, instance_id)`.
    async fn get_x509_cert_record(
        &mut self,
        provider: &str,
        instance_id: &str,
    ) -> Result<Option<X509CertRecord>>;

    /// Insert a new record. `Ok(false)` when the backend refused the row.
    async fn insert_x509_cert_record(&mut self, record: &X509CertRecord) -> Result<bool>;

    /// Replace an existing record. `Ok(false)` when no row was updated.
    async fn update_x509_cert_record(&mut self, record: &X509CertRecord) -> Result<bool>;

    /// Delete the record for `(provider, instance_id)`. `Ok(false)` when no row was removed.
    async fn delete_x509_cert_record(&mut self, provider: &str, instance_id: &str)
        -> Result<bool>;

    /// Release the connection. Called exactly once by [`ConnectionGuard`].
    fn close(&mut self) {}
}

/// Factory for certificate record connections (a pool or a client).
#[async_trait]
pub trait CertRecordStore: Send + Sync + std::fmt::Debug {
    /// Get a connection to the backend.
    ///
    /// `Ok(None)` means the backend is currently unavailable; callers treat
    /// this as "no bookkeeping", never as a fault.
    async fn get_connection(&self) -> Result<Option<Box<dyn CertRecordStoreConnection>>>;

    /// Short backend name for logs and metrics.
    fn store_type(&self) -> &'static str;
}

/// Scoped ownership of one connection; closes it on drop.
pub struct ConnectionGuard {
    connection: Box<dyn CertRecordStoreConnection>,
    store_type: &'static str,
}

impl ConnectionGuard {
    pub fn new(connection: Box<dyn CertRecordStoreConnection>, store_type: &'static str) -> Self {
        Self { connection, store_type }
    }

    /// Acquire a guarded connection from `store`, or `None` if it has none to give.
    pub async fn acquire(store: &dyn CertRecordStore) -> Result<Option<Self>> {
        let store_type = store.store_type();
        Ok(store.get_connection().await?.map(|connection| Self::new(connection, store_type)))
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn CertRecordStoreConnection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connection.close();
        tracing::trace!(store_type = self.store_type, "Released certificate store connection");
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard").field("store_type", &self.store_type).finish()
    }
}

/// Build the configured record store, or `None` to run without bookkeeping.
pub async fn build_cert_store(config: &CertStoreConfig) -> Result<Option<Arc<dyn CertRecordStore>>> {
    let store: Option<Arc<dyn CertRecordStore>> = match config.kind {
        CertStoreKind::None => None,
        CertStoreKind::Memory => Some(Arc::new(InMemoryCertRecordStore::new())),
        CertStoreKind::Sql => {
            let pool = create_pool(config).await?;
            Some(Arc::new(SqlCertRecordStore::new(pool)))
        }
    };

    match &store {
        Some(store) => tracing::info!(store_type = store.store_type(), "Certificate record store ready"),
        None => tracing::warn!("No certificate record store configured, bookkeeping disabled"),
    }

    Ok(store)
}
