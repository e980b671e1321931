//! Search error types.
//!
//! This module defines the errors raised by the connection, the index
//! registry, the query facade, and the remote service implementations.

use thiserror::Error;

/// Errors that can occur while driving the remote search service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// A required construction or call parameter was blank or missing.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Index bindings conflict with each other.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No index could be resolved for an entity type.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service or the transport reported a fault.
    #[error("Service fault{}: {message}", status_suffix(.status))]
    ServiceFault {
        /// HTTP status, absent for transport-level failures.
        status: Option<u16>,
        /// Fault description.
        message: String,
    },

    /// The batch was submitted but not every document was acknowledged.
    #[error("Partial batch failure: {acknowledged} of {submitted} documents acknowledged")]
    PartialBatchFailure {
        /// Number of documents submitted.
        submitted: usize,
        /// Number of documents the service acknowledged.
        acknowledged: usize,
        /// Keys of the documents that were not acknowledged, in submission order.
        failed_keys: Vec<String>,
    },

    /// A document or response body could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The operation was cancelled before the remote call completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// The connection was used after it was disposed.
    #[error("Connection disposed")]
    Disposed,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

impl SearchError {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transport-level fault (no HTTP status).
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::ServiceFault {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a fault reported by the service with an HTTP status.
    pub fn service(status: u16, msg: impl Into<String>) -> Self {
        Self::ServiceFault {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Transport failures, request timeouts, throttling and server-side
    /// errors are transient; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ServiceFault { status: None, .. } => true,
            Self::ServiceFault {
                status: Some(status),
                ..
            } => *status == 408 || *status == 429 || (500..600).contains(status),
            Self::InvalidArgument(_)
            | Self::InvalidConfiguration(_)
            | Self::NotFound(_)
            | Self::PartialBatchFailure { .. }
            | Self::Serialization(_)
            | Self::Cancelled
            | Self::Disposed => false,
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<opensearch::Error> for SearchError {
    fn from(err: opensearch::Error) -> Self {
        match err.status_code() {
            Some(status) => Self::service(status.as_u16(), err.to_string()),
            None => Self::transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SearchError::transport("connection reset").is_transient());
        assert!(SearchError::service(503, "unavailable").is_transient());
        assert!(SearchError::service(429, "throttled").is_transient());
        assert!(SearchError::service(408, "timeout").is_transient());

        assert!(!SearchError::service(400, "bad request").is_transient());
        assert!(!SearchError::service(404, "missing").is_transient());
        assert!(!SearchError::invalid_argument("blank").is_transient());
        assert!(!SearchError::Cancelled.is_transient());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SearchError::service(503, "unavailable").to_string(),
            "Service fault (status 503): unavailable"
        );
        assert_eq!(
            SearchError::transport("reset").to_string(),
            "Service fault: reset"
        );
        assert_eq!(
            SearchError::PartialBatchFailure {
                submitted: 3,
                acknowledged: 2,
                failed_keys: vec!["b".to_string()],
            }
            .to_string(),
            "Partial batch failure: 2 of 3 documents acknowledged"
        );
    }
}
