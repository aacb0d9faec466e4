//! Certificate signer trait definition.
//!
//! This module defines the `CertSigner` trait for pluggable certificate
//! authorities that turn a CSR into a signed instance certificate.

use crate::errors::Result;
use async_trait::async_trait;

/// Type of certificate signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertSignerType {
    /// Remote signing daemon reached over HTTP
    Http,
    /// Mock signer for testing
    Mock,
}

impl CertSignerType {
    /// Returns the string representation of the signer type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Mock => "mock",
        }
    }
}

impl std::fmt::Display for CertSignerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Certificate authority client used to issue instance identities.
///
/// Implementations must be thread-safe (`Send + Sync`) and suitable for use in
/// async contexts.
///
/// # Declined vs. failed
///
/// Signers report two distinct outcomes:
/// - `Ok(None)` (or an empty string): the authority declined to issue
/// - `Err(_)`: the authority could not be reached or answered malformed data
#[async_trait]
pub trait CertSigner: Send + Sync + std::fmt::Debug {
    /// Sign a PEM-encoded certificate signing request.
    ///
    /// The CSR is passed through unvalidated.
    async fn generate_x509_certificate(&self, csr: &str) -> Result<Option<String>>;

    /// Get the authority's own PEM certificate chain, if it publishes one.
    async fn get_ca_certificate(&self) -> Result<Option<String>>;

    /// Get the type of this signer.
    fn signer_type(&self) -> CertSignerType;
}
