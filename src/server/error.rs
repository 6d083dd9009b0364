//! Error types for the HTTP responder.

use thiserror::Error;

/// Errors fatal to the HTTP responder.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Failed to bind the server port.
    #[error("Failed to bind HTTP server on port {port}: {source}")]
    Bind {
        /// The port the server tried to listen on.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The listener failed while accepting a connection.
    #[error("Failed to accept HTTP connection: {0}")]
    Accept(#[source] std::io::Error),

    /// The working directory could not be resolved for file mode.
    #[error("Failed to resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}

/// Result type for the HTTP responder.
pub type ServeResult<T> = Result<T, ServeError>;
