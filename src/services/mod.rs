//! Business logic services
//!
//! Identity issuance and certificate record bookkeeping, independent of any
//! transport or storage backend.

pub mod instance_manager;

pub use instance_manager::{InstanceManager, LedgerOutcome, SkipReason};
