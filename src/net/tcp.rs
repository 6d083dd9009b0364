//! Real network stack backed by tokio.

use super::transport::{Listener, Transport};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

/// Transport over the operating system's socket API.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTransport;

impl TokioTransport {
    /// Create the real transport.
    pub fn new() -> Self {
        Self
    }
}

impl Listener for TcpListener {
    type Conn = TcpStream;

    async fn accept(&self) -> io::Result<TcpStream> {
        let (stream, _peer_addr) = TcpListener::accept(self).await?;
        Ok(stream)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

impl Transport for TokioTransport {
    type Conn = TcpStream;
    type Listener = TcpListener;

    async fn dial(&self, target: &str) -> io::Result<TcpStream> {
        TcpStream::connect(target).await
    }

    async fn listen(&self, addr: SocketAddr) -> io::Result<TcpListener> {
        TcpListener::bind(addr).await
    }

    async fn discover_local_addr(&self, probe_target: &str) -> io::Result<SocketAddr> {
        // Connecting a UDP socket never sends a datagram; it only asks the
        // kernel to pick the route and source address.
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.connect(probe_target).await?;
        socket.local_addr()
    }
}
