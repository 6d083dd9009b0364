//! Error types for port probing.

use thiserror::Error;

/// Errors from a single port probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Failed to bind a listener on the probed port.
    #[error("Failed to bind port {port}: {source}")]
    Bind {
        /// The port the probe tried to bind.
        port: u16,
        /// The underlying I/O error, propagated verbatim.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;
