//! Error types for hnreplies
//!
//! Per-item failures during a round (missing bodies, unparseable authors,
//! unknown parents) are counted and logged rather than returned, so the
//! variants here cover start-up, the transport primitive, and the reply store.

use thiserror::Error;

/// Result type alias for hnreplies operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for hnreplies
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.max_parallel")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error raised by the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote API answered with a non-success status
    #[error("HTTP {status} for {uri}")]
    Http {
        /// Status code returned by the remote API
        status: u16,
        /// Requested URI
        uri: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Author name that cannot be used as a reply store partition
    #[error("invalid author name: {0:?}")]
    InvalidAuthor(String),

    /// Query server error
    #[error("query server error: {0}")]
    ApiServer(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}
