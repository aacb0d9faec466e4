//! # Error Handling
//!
//! Error types for the instance certificate core, defined with `thiserror`.

pub mod types;

pub use types::{InstanceError, Result};
