//! Common test utilities for all integration tests.
//!
//! Provides generated instance certificates, sample records and store setup.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rcgen::{CertificateParams, DnType, KeyPair, SanType};
use zts_instance::{InMemoryCertRecordStore, InstanceCertificate, InstanceManager, X509CertRecord};

/// Generate a self-signed PEM certificate with the given SAN entries.
pub fn instance_certificate_pem(common_name: &str, dns_names: &[&str], uris: &[&str]) -> String {
    let names: Vec<String> = dns_names.iter().map(|s| s.to_string()).collect();
    let mut params = CertificateParams::new(names).expect("build certificate params");
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.distinguished_name.push(DnType::OrganizationName, "Athenz");
    for uri in uris {
        params
            .subject_alt_names
            .push(SanType::URI((*uri).try_into().expect("valid URI SAN")));
    }

    let key_pair = KeyPair::generate().expect("generate key pair");
    params.self_signed(&key_pair).expect("self-sign certificate").pem()
}

/// Parse a generated certificate.
pub fn instance_certificate(dns_names: &[&str], uris: &[&str]) -> InstanceCertificate {
    InstanceCertificate::from_pem(&instance_certificate_pem("athenz.production", dns_names, uris))
        .expect("parse generated certificate")
}

pub fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp")
}

/// A record for a freshly registered instance.
pub fn sample_record(provider: &str, instance_id: &str) -> X509CertRecord {
    let mut record =
        X509CertRecord::new(provider, instance_id, "athenz.production", "101", "10.1.1.1", issued_at());
    record.hostname = Some(format!("{}.athenz.cloud", instance_id));
    record
}

/// A manager backed by a fresh in-memory store, plus a handle to that store.
pub fn manager_with_memory_store() -> (InstanceManager, InMemoryCertRecordStore) {
    let store = InMemoryCertRecordStore::new();
    let manager = InstanceManager::new(Some(Arc::new(store.clone())));
    (manager, store)
}
