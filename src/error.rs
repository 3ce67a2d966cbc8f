//! Error types returned by the OSV client.

use thiserror::Error;

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the client. Nothing is retried or swallowed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("batch request holds {size} queries, the maximum is {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("batch response carried {actual} results for {expected} queries")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("transport has been shut down")]
    TransportClosed,

    #[error("runtime: {0}")]
    Runtime(String),
}

impl Error {
    /// The exchange never produced a usable HTTP response.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::TransportClosed)
    }

    /// A response arrived but its body did not have the expected shape.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. } | Error::ResultCountMismatch { .. }
        )
    }

    /// HTTP status of a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
