//! Utility functions and helpers

pub mod certificates;

pub use certificates::{resolve_instance_id, InstanceCertificate};
