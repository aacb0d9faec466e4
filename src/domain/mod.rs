//! Domain layer
//!
//! Pure data entities of the instance certificate core with no
//! infrastructure dependencies.
//!
//! - `identity`: the transient issuance result handed back to the caller
//! - `cert_record`: the durable bookkeeping row kept per instance

pub mod cert_record;
pub mod identity;

pub use cert_record::X509CertRecord;
pub use identity::InstanceIdentity;
