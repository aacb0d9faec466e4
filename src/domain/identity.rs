//! Instance identity returned to callers after a successful issuance.

use serde::Serialize;
use std::collections::BTreeMap;

/// The signed identity handed back to a workload instance.
///
/// Built through [`InstanceIdentity::new`], which refuses an empty
/// certificate, so a declined signature never yields an identity. Identities
/// are serialized for callers and not read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceIdentity {
    /// Subject identity, usually the service's canonical name
    pub name: String,

    /// PEM-encoded signed certificate
    pub x509_certificate: String,

    /// PEM-encoded CA certificate chain, when the signer supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x509_certificate_signer: Option<String>,

    /// Opaque request attributes, copied verbatim
    pub attributes: BTreeMap<String, String>,
}

impl InstanceIdentity {
    /// Assemble an identity from a signed certificate.
    ///
    /// Returns `None` for an empty certificate so a partially populated
    /// identity can never be observed.
    pub fn new(
        name: impl Into<String>,
        x509_certificate: String,
        x509_certificate_signer: Option<String>,
        attributes: BTreeMap<String, String>,
    ) -> Option<Self> {
        if x509_certificate.is_empty() {
            return None;
        }
        Some(Self { name: name.into(), x509_certificate, x509_certificate_signer, attributes })
    }
}
