//! Process-local certificate record store backed by `DashMap`.
//!
//! Used for tests and single-node deployments. Availability and one-shot
//! faults can be toggled so callers can exercise their soft-failure paths.

use super::{CertRecordStore, CertRecordStoreConnection};
use crate::domain::X509CertRecord;
use crate::errors::{InstanceError, Result};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

type RecordKey = (String, String);

#[derive(Debug)]
struct Inner {
    records: DashMap<RecordKey, X509CertRecord>,
    available: AtomicBool,
    fail_next: AtomicBool,
    open_connections: AtomicUsize,
    connection_requests: AtomicUsize,
}

/// In-memory record store. Clones share the same records.
#[derive(Debug, Clone)]
pub struct InMemoryCertRecordStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryCertRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCertRecordStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                records: DashMap::new(),
                available: AtomicBool::new(true),
                fail_next: AtomicBool::new(false),
                open_connections: AtomicUsize::new(0),
                connection_requests: AtomicUsize::new(0),
            }),
        }
    }

    /// When `false`, `get_connection` yields no connection.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Make the next connection operation fail with a store error.
    pub fn set_fail_next(&self, fail: bool) {
        self.inner.fail_next.store(fail, Ordering::SeqCst);
    }

    /// Connections handed out and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::SeqCst)
    }

    /// Total `get_connection` calls, whether or not a connection was given.
    pub fn connection_requests(&self) -> usize {
        self.inner.connection_requests.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }

    /// Read a record without going through a connection.
    pub fn snapshot(&self, provider: &str, instance_id: &str) -> Option<X509CertRecord> {
        self.inner
            .records
            .get(&(provider.to_string(), instance_id.to_string()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl CertRecordStore for InMemoryCertRecordStore {
    async fn get_connection(&self) -> Result<Option<Box<dyn CertRecordStoreConnection>>> {
        self.inner.connection_requests.fetch_add(1, Ordering::SeqCst);

        if !self.inner.available.load(Ordering::SeqCst) {
            tracing::debug!("In-memory certificate store unavailable");
            return Ok(None);
        }

        self.inner.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(InMemoryCertRecordConnection {
            inner: Arc::clone(&self.inner),
            closed: false,
        })))
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

struct InMemoryCertRecordConnection {
    inner: Arc<Inner>,
    closed: bool,
}

impl InMemoryCertRecordConnection {
    fn check_fault(&self, operation: &str) -> Result<()> {
        if self.closed {
            return Err(InstanceError::store(format!("{} on closed connection", operation)));
        }
        if self.inner.fail_next.swap(false, Ordering::SeqCst) {
            return Err(InstanceError::store(format!("Injected failure during {}", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl CertRecordStoreConnection for InMemoryCertRecordConnection {
    async fn get_x509_cert_record(
        &mut self,
        provider: &str,
        instance_id: &str,
    ) -> Result<Option<X509CertRecord>> {
        self.check_fault("get")?;
        Ok(self
            .inner
            .records
            .get(&(provider.to_string(), instance_id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn insert_x509_cert_record(&mut self, record: &X509CertRecord) -> Result<bool> {
        self.check_fault("insert")?;
        match self.inner.records.entry((record.provider.clone(), record.instance_id.clone())) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn update_x509_cert_record(&mut self, record: &X509CertRecord) -> Result<bool> {
        self.check_fault("update")?;
        match self
            .inner
            .records
            .get_mut(&(record.provider.clone(), record.instance_id.clone()))
        {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_x509_cert_record(
        &mut self,
        provider: &str,
        instance_id: &str,
    ) -> Result<bool> {
        self.check_fault("delete")?;
        Ok(self.inner.records.remove(&(provider.to_string(), instance_id.to_string())).is_some())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.open_connections.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
