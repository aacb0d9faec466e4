//! # ZTS Instance
//!
//! Certificate-lifecycle core for workload instance identities: it turns a
//! certificate signing request into a signed identity through an external
//! certificate signer, and keeps a best-effort record of every certificate it
//! issued in a pluggable record store.
//!
//! ## Architecture
//!
//! ```text
//! CLI → InstanceManager → CertSigner (HTTP signing daemon)
//!             ↓
//!       CertRecordStore → CertRecordStoreConnection (memory, SQLite)
//! ```
//!
//! The record store is advisory. A missing store or an unavailable connection
//! is reported as [`LedgerOutcome::Skipped`], never as an error, so it can
//! never block identity issuance.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zts_instance::{InstanceManager, MockCertSigner, InMemoryCertRecordStore, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = InstanceManager::new(Some(Arc::new(InMemoryCertRecordStore::new())));
//!     let signer = MockCertSigner::new("cert", "caCert");
//!     let identity = manager.generate_identity(&signer, "csr", "athenz.api", None).await?;
//!     assert!(identity.is_some());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod signer;
pub mod storage;
pub mod utils;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use domain::{InstanceIdentity, X509CertRecord};
pub use errors::{InstanceError, Result};
pub use services::{InstanceManager, LedgerOutcome, SkipReason};
pub use signer::{CertSigner, HttpCertSigner, MockCertSigner};
pub use storage::{
    CertRecordStore, CertRecordStoreConnection, InMemoryCertRecordStore, SqlCertRecordStore,
};
pub use utils::{resolve_instance_id, InstanceCertificate};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
