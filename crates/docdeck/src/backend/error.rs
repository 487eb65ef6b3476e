//! Backend error types.

use thiserror::Error;

/// Errors from talking to the document-indexing backend.
///
/// Timeouts are a distinct variant so the operator sees "the server may
/// be overloaded" instead of a generic connection failure.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("The indexing server took longer than {limit_secs}s to respond; it may be overloaded")]
    Timeout { limit_secs: u64 },

    #[error("Could not reach the indexing server: {source}")]
    Connect {
        #[source]
        source: reqwest::Error,
    },

    #[error("The indexing server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to decode the indexing server's response: {source}")]
    Decode {
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response from the indexing server: {0}")]
    Malformed(String),

    #[error("Health check was aborted")]
    Aborted,
}

impl BackendError {
    /// Classifies a reqwest transport error, separating timeouts from
    /// other connectivity failures.
    pub(crate) fn from_transport(source: reqwest::Error, limit_secs: u64) -> Self {
        if source.is_timeout() {
            BackendError::Timeout { limit_secs }
        } else {
            BackendError::Connect { source }
        }
    }

    /// True for the timeout variant; used by tests and display logic.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout { .. })
    }
}
