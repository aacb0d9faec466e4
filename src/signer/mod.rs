//! Certificate signer abstraction for instance identity issuance.
//!
//! This module provides a pluggable architecture for the certificate
//! authority that signs instance CSRs.
//!
//! # Architecture
//!
//! - `CertSigner` trait defines the interface
//! - Concrete implementations (`HttpCertSigner`, `MockCertSigner`) implement the trait
//! - The `InstanceManager` receives the signer per call and never stores it
//!
//! # Available Signers
//!
//! - **HttpCertSigner**: Remote signing daemon reached over HTTP
//! - **MockCertSigner**: Testing signer with deterministic outputs
//!
//! # Example
//!
//! ```rust,ignore
//! use zts_instance::signer::{CertSigner, HttpCertSigner};
//!
//! let signer = HttpCertSigner::new("https://signer.example.com:4443", timeout)?;
//! match signer.generate_x509_certificate(&csr).await? {
//!     Some(pem) => println!("signed: {} bytes", pem.len()),
//!     None => println!("signer declined the request"),
//! }
//! ```

mod backend;
mod http;
mod mock;

pub use backend::{CertSigner, CertSignerType};
pub use http::{HttpCertSigner, RetryConfig};
pub use mock::MockCertSigner;
