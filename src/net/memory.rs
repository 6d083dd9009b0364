//! In-memory transport double for deterministic tests.
//!
//! Listeners register in a process-local table keyed by port (host-local
//! semantics: the host part of a dial target is ignored). Dialing a
//! registered port hands the listener one end of a [`tokio::io::duplex`]
//! pipe and returns the other. Dropping a listener removes its registration,
//! so a port probed through this transport is released exactly like a real
//! socket close.

use super::transport::{Listener, Transport};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

/// Pipe capacity per direction, generous enough for test payloads.
const PIPE_CAPACITY: usize = 64 * 1024;

/// First port handed out when a listener asks for port 0.
const EPHEMERAL_START: u16 = 49152;

#[derive(Debug)]
struct Registry {
    listeners: Mutex<HashMap<u16, mpsc::UnboundedSender<DuplexStream>>>,
    next_ephemeral: Mutex<u16>,
    local_addr: SocketAddr,
}

/// Deterministic in-memory replacement for the real network stack.
///
/// Clones share one listener table, so a single instance (cloned freely)
/// models one host.
#[derive(Clone)]
pub struct MemoryTransport {
    registry: Arc<Registry>,
}

impl MemoryTransport {
    /// Create an empty in-memory host.
    pub fn new() -> Self {
        Self::with_local_addr(SocketAddr::from(([10, 0, 0, 2], 0)))
    }

    /// Create an in-memory host reporting `local_addr` from
    /// [`discover_local_addr`](Transport::discover_local_addr).
    pub fn with_local_addr(local_addr: SocketAddr) -> Self {
        Self {
            registry: Arc::new(Registry {
                listeners: Mutex::new(HashMap::new()),
                next_ephemeral: Mutex::new(EPHEMERAL_START),
                local_addr,
            }),
        }
    }

    fn allocate_ephemeral(&self, occupied: &HashMap<u16, mpsc::UnboundedSender<DuplexStream>>) -> u16 {
        let mut next = self
            .registry
            .next_ephemeral
            .lock()
            .expect("ephemeral counter poisoned");
        loop {
            let candidate = *next;
            *next = next.checked_add(1).unwrap_or(EPHEMERAL_START);
            if !occupied.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener half of the in-memory transport.
#[derive(Debug)]
pub struct MemoryListener {
    port: u16,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<DuplexStream>>,
    registry: Arc<Registry>,
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        if let Ok(mut listeners) = self.registry.listeners.lock() {
            listeners.remove(&self.port);
        }
    }
}

impl Listener for MemoryListener {
    type Conn = DuplexStream;

    async fn accept(&self) -> io::Result<DuplexStream> {
        self.inbound
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "listener closed"))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], self.port)))
    }
}

/// Extract the port from a `host:port` dial target.
fn target_port(target: &str) -> io::Result<u16> {
    let port = target
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse::<u16>().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid dial target: {target}"),
            )
        })?;
    Ok(port)
}

impl Transport for MemoryTransport {
    type Conn = DuplexStream;
    type Listener = MemoryListener;

    async fn dial(&self, target: &str) -> io::Result<DuplexStream> {
        let port = target_port(target)?;
        let sender = {
            let listeners = self
                .registry
                .listeners
                .lock()
                .expect("listener table poisoned");
            listeners.get(&port).cloned()
        };
        let Some(sender) = sender else {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("connection refused: {target}"),
            ));
        };

        let (near, far) = tokio::io::duplex(PIPE_CAPACITY);
        sender.send(far).map_err(|_| {
            io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("connection refused: {target}"),
            )
        })?;
        Ok(near)
    }

    async fn listen(&self, addr: SocketAddr) -> io::Result<MemoryListener> {
        let mut listeners = self
            .registry
            .listeners
            .lock()
            .expect("listener table poisoned");

        let port = if addr.port() == 0 {
            self.allocate_ephemeral(&listeners)
        } else if listeners.contains_key(&addr.port()) {
            return Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("address in use: {addr}"),
            ));
        } else {
            addr.port()
        };

        let (tx, rx) = mpsc::unbounded_channel();
        listeners.insert(port, tx);
        Ok(MemoryListener {
            port,
            inbound: tokio::sync::Mutex::new(rx),
            registry: Arc::clone(&self.registry),
        })
    }

    async fn discover_local_addr(&self, _probe_target: &str) -> io::Result<SocketAddr> {
        Ok(self.registry.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_listen_dial_roundtrip() {
        let transport = MemoryTransport::new();
        let listener = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7100)))
            .await
            .unwrap();

        let mut client = transport.dial("127.0.0.1:7100").await.unwrap();
        let mut server = listener.accept().await.unwrap();

        client.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn test_listen_addr_in_use() {
        let transport = MemoryTransport::new();
        let _held = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7200)))
            .await
            .unwrap();

        let err = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7200)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn test_drop_releases_port() {
        let transport = MemoryTransport::new();
        let listener = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7300)))
            .await
            .unwrap();
        drop(listener);

        assert!(transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7300)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_dial_unregistered_port_refused() {
        let transport = MemoryTransport::new();
        let err = transport.dial("127.0.0.1:7400").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[tokio::test]
    async fn test_ephemeral_ports_are_distinct() {
        let transport = MemoryTransport::new();
        let first = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 0)))
            .await
            .unwrap();
        let second = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 0)))
            .await
            .unwrap();
        assert_ne!(
            first.local_addr().unwrap().port(),
            second.local_addr().unwrap().port()
        );
    }

    #[tokio::test]
    async fn test_discover_local_addr_is_fixed() {
        let transport =
            MemoryTransport::with_local_addr(SocketAddr::from(([192, 168, 1, 7], 0)));
        let addr = transport.discover_local_addr("8.8.8.8:80").await.unwrap();
        assert_eq!(addr, SocketAddr::from(([192, 168, 1, 7], 0)));
    }

    #[test]
    fn test_target_port_parsing() {
        assert_eq!(target_port("127.0.0.1:80").unwrap(), 80);
        assert_eq!(target_port("[::1]:443").unwrap(), 443);
        assert!(target_port("no-port").is_err());
        assert!(target_port("host:notaport").is_err());
    }
}
