//! Error types for IP discovery.

use thiserror::Error;

/// Errors from internal/external IP discovery.
#[derive(Debug, Error)]
pub enum NetInfoError {
    /// The UDP route probe for the internal address failed.
    #[error("Failed to discover local address: {0}")]
    Discover(#[source] std::io::Error),

    /// The external IP endpoint is not a valid URL.
    #[error("Invalid external IP endpoint: {0}")]
    InvalidUrl(String),

    /// The HTTP request to the external IP endpoint failed.
    #[error("Request to {url} failed: {message}")]
    Request {
        /// The endpoint that was queried.
        url: String,
        /// The underlying client error.
        message: String,
    },

    /// The response body could not be read.
    #[error("Failed to read response from {url}: {message}")]
    Body {
        /// The endpoint that was queried.
        url: String,
        /// The underlying body error.
        message: String,
    },
}

/// Result type for IP discovery.
pub type NetInfoResult<T> = Result<T, NetInfoError>;
