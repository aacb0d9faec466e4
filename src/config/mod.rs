//! # Configuration Management
//!
//! Environment-driven configuration for the certificate record store, the
//! certificate signer and observability.

pub mod settings;

pub use settings::{AppConfig, CertStoreConfig, CertStoreKind, ObservabilityConfig, SignerConfig};
