//! The transport capability trait.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bound, listening endpoint producing inbound connections.
///
/// The sequence of connections is lazy and unbounded; a listener that has
/// been dropped can only be "restarted" by creating a new one. Dropping the
/// listener closes it.
pub trait Listener: Send + 'static {
    /// Connection type produced by [`accept`](Listener::accept).
    type Conn;

    /// Wait for the next inbound connection.
    fn accept(&self) -> impl Future<Output = io::Result<Self::Conn>> + Send;

    /// The address this listener is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Capability interface over the low-level socket primitives.
///
/// Implemented by [`TokioTransport`](super::TokioTransport) for real sockets
/// and [`MemoryTransport`](super::MemoryTransport) for tests. Connections
/// and listeners are closed by dropping them, which makes double-close a
/// non-issue by construction.
pub trait Transport: Send + Sync + 'static {
    /// Duplex byte stream produced by dial and accept.
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Listener type produced by [`listen`](Transport::listen).
    type Listener: Listener<Conn = Self::Conn>;

    /// Open an outbound TCP connection to `target` (`host:port`).
    fn dial(&self, target: &str) -> impl Future<Output = io::Result<Self::Conn>> + Send;

    /// Bind a TCP listener on `addr`.
    fn listen(&self, addr: SocketAddr) -> impl Future<Output = io::Result<Self::Listener>> + Send;

    /// Discover the local address the host would use to reach
    /// `probe_target`, via a UDP "connect" that sends no data.
    ///
    /// This is the `udp` arm of the dial contract; it is consumed only by
    /// internal IP discovery.
    fn discover_local_addr(
        &self,
        probe_target: &str,
    ) -> impl Future<Output = io::Result<SocketAddr>> + Send;
}
