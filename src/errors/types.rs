//! # Error Types
//!
//! Hard-failure error types for the instance certificate core using `thiserror`.
//!
//! Soft failures (a declined signature, a missing record store, an unavailable
//! connection) are never represented here. They travel as values
//! (`Option`, `bool`, [`crate::services::LedgerOutcome`]) so that storage
//! trouble can never surface as a fault on the issuance path.

/// Custom result type for instance certificate operations
pub type Result<T> = std::result::Result<T, InstanceError>;

/// Main error type for the instance certificate core
#[derive(thiserror::Error, Debug)]
pub enum InstanceError {
    /// The certificate signer could not be reached or answered with garbage
    #[error("Certificate signer error: {message}")]
    Signer { message: String },

    /// Malformed PEM or DER certificate input
    #[error("Certificate parse error: {message}")]
    CertificateParse { message: String },

    /// A record store connection failed mid-operation
    #[error("Record store error: {message}")]
    Store { message: String },

    /// Database errors raised by the SQL record store
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },
}

impl InstanceError {
    /// Create a new signer error
    pub fn signer<S: Into<String>>(message: S) -> Self {
        Self::Signer { message: message.into() }
    }

    /// Create a new certificate parse error
    pub fn certificate_parse<S: Into<String>>(message: S) -> Self {
        Self::CertificateParse { message: message.into() }
    }

    /// Create a new record store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store { message: message.into() }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Wrap a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Check if the failed operation may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Signer { .. } | Self::Store { .. } | Self::Io { .. })
    }
}

impl From<sqlx::Error> for InstanceError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<sqlx::migrate::MigrateError> for InstanceError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::Database {
            source: sqlx::Error::Migrate(Box::new(error)),
            context: "Database migration failed".to_string(),
        }
    }
}

impl From<std::io::Error> for InstanceError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for InstanceError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for InstanceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect();
        fields.sort();

        Self::validation(format!("Validation failed: {}", fields.join("; ")))
    }
}
