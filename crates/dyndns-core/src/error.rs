//! Error types for the dyndns system
//!
//! This module defines all error types used throughout the crate.
//!
//! The four reconciliation kinds map onto the worker's failure policy:
//! [`Error::ResolutionFailed`] and [`Error::ListFailed`] end the current
//! cycle for a domain, while [`Error::DeleteFailed`] and
//! [`Error::CreateFailed`] are local to a single record.

use thiserror::Error;

/// Result type alias for dyndns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dyndns system
#[derive(Error, Debug)]
pub enum Error {
    /// Every configured IP mirror failed
    #[error("IP resolution failed: all {attempted} mirror(s) exhausted")]
    ResolutionFailed {
        /// Number of mirrors that were attempted
        attempted: usize,
    },

    /// Listing the remote records of a domain failed
    #[error("Failed to list records for {domain}: {message}")]
    ListFailed {
        /// Domain whose records were requested
        domain: String,
        /// Underlying provider error
        message: String,
    },

    /// Deleting a stale record failed (no replacement was attempted)
    #[error("Failed to delete record {record_id} in {domain}: {message}")]
    DeleteFailed {
        /// Domain owning the record
        domain: String,
        /// Provider-assigned identifier of the record
        record_id: String,
        /// Underlying provider error
        message: String,
    },

    /// Creating the replacement record failed after the stale one was deleted
    #[error("Failed to create record '{hostname}' in {domain}: {message}")]
    CreateFailed {
        /// Domain owning the record
        domain: String,
        /// Relative hostname that was being recreated
        hostname: String,
        /// Underlying provider error
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (configuration files, log sinks)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// A worker task ended abnormally
    #[error("Worker for {domain} failed: {message}")]
    Worker {
        /// Domain the worker was responsible for
        domain: String,
        /// Panic or join failure description
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a list failure for `domain`
    pub fn list_failed(domain: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ListFailed {
            domain: domain.into(),
            message: cause.to_string(),
        }
    }

    /// Create a delete failure for `record_id` in `domain`
    pub fn delete_failed(
        domain: impl Into<String>,
        record_id: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::DeleteFailed {
            domain: domain.into(),
            record_id: record_id.into(),
            message: cause.to_string(),
        }
    }

    /// Create a create failure for `hostname` in `domain`
    pub fn create_failed(
        domain: impl Into<String>,
        hostname: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::CreateFailed {
            domain: domain.into(),
            hostname: hostname.into(),
            message: cause.to_string(),
        }
    }

    /// Whether this error ends the current cycle of a domain worker
    ///
    /// Record-local failures (delete/create) never do.
    pub fn is_cycle_fatal(&self) -> bool {
        !matches!(self, Self::DeleteFailed { .. } | Self::CreateFailed { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
