//! Instance identity issuance and certificate record bookkeeping.
//!
//! The record store is advisory. Its absence or unavailability is reported as
//! a [`LedgerOutcome::Skipped`] value and never as an error, so bookkeeping
//! trouble cannot block issuance. Each record operation takes one connection
//! from the store, performs a single backend call and releases it through a
//! [`ConnectionGuard`].

use crate::domain::{InstanceIdentity, X509CertRecord};
use crate::errors::{InstanceError, Result};
use crate::observability::metrics::{record_cert_record_operation, record_identity_issuance};
use crate::signer::CertSigner;
use crate::storage::{CertRecordStore, ConnectionGuard};
use crate::utils::{resolve_instance_id, InstanceCertificate};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const OP_GET: &str = "get";
const OP_INSERT: &str = "insert";
const OP_UPDATE: &str = "update";
const OP_DELETE: &str = "delete";

/// Why a record operation did not reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The manager has no record store
    StoreNotConfigured,
    /// The store had no connection to hand out
    ConnectionUnavailable,
    /// The certificate carried no instance id
    NoInstanceId,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreNotConfigured => "store_not_configured",
            Self::ConnectionUnavailable => "connection_unavailable",
            Self::NoInstanceId => "no_instance_id",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a record operation that did not fail hard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome<T> {
    /// The backend answered
    Completed(T),
    /// The backend was never consulted
    Skipped(SkipReason),
}

impl<T> LedgerOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Completed(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }

    /// The backend's answer, if there was one.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Skipped(_) => None,
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Skipped(reason) => reason.as_str(),
        }
    }
}

impl LedgerOutcome<Option<X509CertRecord>> {
    /// The record, absent for a skip and for a missing row alike.
    pub fn into_record(self) -> Option<X509CertRecord> {
        self.completed().flatten()
    }
}

impl LedgerOutcome<bool> {
    /// `true` only when the backend reported success.
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Completed(true))
    }
}

/// Issues instance identities and keeps their certificate records.
#[derive(Debug, Clone, Default)]
pub struct InstanceManager {
    cert_store: Option<Arc<dyn CertRecordStore>>,
}

impl InstanceManager {
    pub fn new(cert_store: Option<Arc<dyn CertRecordStore>>) -> Self {
        Self { cert_store }
    }

    pub fn set_cert_store(&mut self, cert_store: Option<Arc<dyn CertRecordStore>>) {
        self.cert_store = cert_store;
    }

    pub fn cert_store(&self) -> Option<&Arc<dyn CertRecordStore>> {
        self.cert_store.as_ref()
    }

    /// Ask `signer` to sign `csr` and assemble the resulting identity.
    ///
    /// `Ok(None)` means the signer declined. Signer faults, including one while
    /// fetching the CA chain after a successful signature, propagate as errors.
    /// The record store is not touched.
    #[instrument(
        skip(self, signer, csr, attributes),
        fields(name = %name, signer_type = %signer.signer_type())
    )]
    pub async fn generate_identity(
        &self,
        signer: &dyn CertSigner,
        csr: &str,
        name: &str,
        attributes: Option<&BTreeMap<String, String>>,
    ) -> Result<Option<InstanceIdentity>> {
        let certificate = match signer.generate_x509_certificate(csr).await {
            Ok(Some(certificate)) if !certificate.is_empty() => certificate,
            Ok(_) => {
                debug!("Certificate signer declined to issue a certificate");
                record_identity_issuance("declined");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Certificate signer failed");
                record_identity_issuance("error");
                return Err(e);
            }
        };

        let ca_certificate = match signer.get_ca_certificate().await {
            Ok(ca_certificate) => ca_certificate.filter(|ca| !ca.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to fetch CA certificate chain");
                record_identity_issuance("error");
                return Err(e);
            }
        };

        let identity = InstanceIdentity::new(
            name,
            certificate,
            ca_certificate,
            attributes.cloned().unwrap_or_default(),
        );

        debug!(
            has_ca_chain = identity.as_ref().is_some_and(|i| i.x509_certificate_signer.is_some()),
            "Generated instance identity"
        );
        record_identity_issuance("issued");
        Ok(identity)
    }

    /// Look up the record for the instance named in `certificate`'s SAN entries.
    #[instrument(skip(self, certificate), fields(provider = %provider, subject = %certificate.subject()))]
    pub async fn get_x509_cert_record_for_certificate(
        &self,
        provider: &str,
        certificate: &InstanceCertificate,
    ) -> Result<LedgerOutcome<Option<X509CertRecord>>> {
        let Some(instance_id) = resolve_instance_id(certificate) else {
            debug!("Certificate carries no instance id");
            record_cert_record_operation(OP_GET, SkipReason::NoInstanceId.as_str());
            return Ok(LedgerOutcome::Skipped(SkipReason::NoInstanceId));
        };

        self.get_x509_cert_record(provider, &instance_id).await
    }

    /// Fetch the record for `(provider, instance_id)`.
    #[instrument(skip(self), fields(provider = %provider, instance_id = %instance_id))]
    pub async fn get_x509_cert_record(
        &self,
        provider: &str,
        instance_id: &str,
    ) -> Result<LedgerOutcome<Option<X509CertRecord>>> {
        let outcome = async {
            let mut conn = match self.acquire().await? {
                LedgerOutcome::Completed(conn) => conn,
                LedgerOutcome::Skipped(reason) => return Ok(LedgerOutcome::Skipped(reason)),
            };
            let record = conn.get_x509_cert_record(provider, instance_id).await?;
            Ok::<_, InstanceError>(LedgerOutcome::Completed(record))
        }
        .await;

        observe(OP_GET, outcome)
    }

    /// Store a new record. Fails softly when a record already exists.
    #[instrument(skip(self, record), fields(provider = %record.provider, instance_id = %record.instance_id))]
    pub async fn insert_x509_cert_record(
        &self,
        record: &X509CertRecord,
    ) -> Result<LedgerOutcome<bool>> {
        let outcome = async {
            let mut conn = match self.acquire().await? {
                LedgerOutcome::Completed(conn) => conn,
                LedgerOutcome::Skipped(reason) => return Ok(LedgerOutcome::Skipped(reason)),
            };
            let inserted = conn.insert_x509_cert_record(record).await?;
            Ok::<_, InstanceError>(LedgerOutcome::Completed(inserted))
        }
        .await;

        observe(OP_INSERT, outcome)
    }

    /// Replace an existing record, typically after [`X509CertRecord::rotate`].
    #[instrument(skip(self, record), fields(provider = %record.provider, instance_id = %record.instance_id))]
    pub async fn update_x509_cert_record(
        &self,
        record: &X509CertRecord,
    ) -> Result<LedgerOutcome<bool>> {
        let outcome = async {
            let mut conn = match self.acquire().await? {
                LedgerOutcome::Completed(conn) => conn,
                LedgerOutcome::Skipped(reason) => return Ok(LedgerOutcome::Skipped(reason)),
            };
            let updated = conn.update_x509_cert_record(record).await?;
            Ok::<_, InstanceError>(LedgerOutcome::Completed(updated))
        }
        .await;

        observe(OP_UPDATE, outcome)
    }

    /// Remove the record for `(provider, instance_id)`.
    #[instrument(skip(self), fields(provider = %provider, instance_id = %instance_id))]
    pub async fn delete_x509_cert_record(
        &self,
        provider: &str,
        instance_id: &str,
    ) -> Result<LedgerOutcome<bool>> {
        let outcome = async {
            let mut conn = match self.acquire().await? {
                LedgerOutcome::Completed(conn) => conn,
                LedgerOutcome::Skipped(reason) => return Ok(LedgerOutcome::Skipped(reason)),
            };
            let deleted = conn.delete_x509_cert_record(provider, instance_id).await?;
            Ok::<_, InstanceError>(LedgerOutcome::Completed(deleted))
        }
        .await;

        observe(OP_DELETE, outcome)
    }

    async fn acquire(&self) -> Result<LedgerOutcome<ConnectionGuard>> {
        let Some(store) = self.cert_store.as_deref() else {
            return Ok(LedgerOutcome::Skipped(SkipReason::StoreNotConfigured));
        };

        Ok(match ConnectionGuard::acquire(store).await? {
            Some(conn) => LedgerOutcome::Completed(conn),
            None => {
                debug!(store_type = store.store_type(), "Certificate store has no connection available");
                LedgerOutcome::Skipped(SkipReason::ConnectionUnavailable)
            }
        })
    }
}

fn observe<T>(
    operation: &'static str,
    outcome: Result<LedgerOutcome<T>>,
) -> Result<LedgerOutcome<T>> {
    match &outcome {
        Ok(result) => {
            debug!(operation, outcome = result.outcome_label(), "Certificate record operation finished");
            record_cert_record_operation(operation, result.outcome_label());
        }
        Err(e) => {
            warn!(operation, error = %e, "Certificate record operation failed");
            record_cert_record_operation(operation, "error");
        }
    }
    outcome
}
