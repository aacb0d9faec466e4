//! Mock certificate signer for tests.
//!
//! Returns fixed outputs for every CSR, can be told to decline, and can
//! inject a one-shot fault with [`MockCertSigner::set_fail_next`].

use super::backend::{CertSigner, CertSignerType};
use crate::errors::{InstanceError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug)]
pub struct MockCertSigner {
    certificate: Option<String>,
    ca_certificate: Option<String>,
    fail_next: AtomicBool,
    sign_calls: AtomicUsize,
    ca_calls: AtomicUsize,
}

impl MockCertSigner {
    /// A signer returning `certificate` for any CSR and `ca_certificate` as its chain.
    pub fn new(certificate: impl Into<String>, ca_certificate: impl Into<String>) -> Self {
        Self::with_outputs(Some(certificate.into()), Some(ca_certificate.into()))
    }

    /// A signer that declines every CSR.
    pub fn declining() -> Self {
        Self::with_outputs(None, None)
    }

    pub fn with_outputs(certificate: Option<String>, ca_certificate: Option<String>) -> Self {
        Self {
            certificate,
            ca_certificate,
            fail_next: AtomicBool::new(false),
            sign_calls: AtomicUsize::new(0),
            ca_calls: AtomicUsize::new(0),
        }
    }

    /// Make the next call fail with a signer error.
    pub fn set_fail_next(&self, fail: bool) {
        self.fail_next.store(fail, Ordering::SeqCst);
    }

    /// Number of signing requests received
    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Number of CA chain requests received
    pub fn ca_calls(&self) -> usize {
        self.ca_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(InstanceError::signer("mock signer unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CertSigner for MockCertSigner {
    async fn generate_x509_certificate(&self, _csr: &str) -> Result<Option<String>> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        Ok(self.certificate.clone())
    }

    async fn get_ca_certificate(&self) -> Result<Option<String>> {
        self.ca_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        Ok(self.ca_certificate.clone())
    }

    fn signer_type(&self) -> CertSignerType {
        CertSignerType::Mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_outputs() {
        let signer = MockCertSigner::new("cert", "caCert");
        assert_eq!(signer.generate_x509_certificate("csr").await.unwrap(), Some("cert".into()));
        assert_eq!(signer.get_ca_certificate().await.unwrap(), Some("caCert".into()));
        assert_eq!(signer.sign_calls(), 1);
        assert_eq!(signer.ca_calls(), 1);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let signer = MockCertSigner::new("cert", "caCert");
        signer.set_fail_next(true);
        assert!(signer.generate_x509_certificate("csr").await.is_err());
        assert!(signer.generate_x509_certificate("csr").await.is_ok());
    }

    #[tokio::test]
    async fn test_declining() {
        let signer = MockCertSigner::declining();
        assert!(signer.generate_x509_certificate("csr").await.unwrap().is_none());
    }
}
