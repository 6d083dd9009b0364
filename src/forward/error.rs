//! Error types for the forwarding engine.

use thiserror::Error;

/// Session-fatal errors from a forwarding session.
///
/// Per-relay copy errors never appear here; they end the affected relay and
/// are logged locally.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Failed to bind the listening port.
    #[error("Failed to bind forward listener on port {port}: {source}")]
    Bind {
        /// The port the session tried to listen on.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The listener failed while accepting a connection.
    #[error("Failed to accept inbound connection: {0}")]
    Accept(#[source] std::io::Error),

    /// A relay could not dial the target while fail-fast mode was active.
    #[error("Failed to dial forward target {target}: {source}")]
    RelayDial {
        /// The configured forward target.
        target: String,
        /// The underlying I/O error from the dial.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for forwarding operations.
pub type ForwardResult<T> = Result<T, ForwardError>;
