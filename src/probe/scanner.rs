//! Bind-and-release port scanning over a [`Transport`].

use super::error::{ProbeError, ProbeResult};
use crate::net::Transport;
use futures::stream::{self, StreamExt};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, trace};

/// Highest TCP port number.
pub const MAX_PORT: u16 = 65535;

/// Default number of concurrent probes during a scan.
pub const DEFAULT_SCAN_CONCURRENCY: usize = 512;

/// Probes ports by binding them through the transport seam.
pub struct PortScanner<T: Transport> {
    transport: Arc<T>,
    concurrency: usize,
}

impl<T: Transport> PortScanner<T> {
    /// Create a scanner with the default probe concurrency.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            concurrency: DEFAULT_SCAN_CONCURRENCY,
        }
    }

    /// Override the number of probes in flight during a scan.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Probe a single port.
    ///
    /// `Ok(())` means the port could be bound at probe time; the temporary
    /// listener is dropped before returning, so the port is free again for
    /// the caller. `Err` carries the underlying bind failure.
    pub async fn probe(&self, port: u16) -> ProbeResult<()> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener = self
            .transport
            .listen(addr)
            .await
            .map_err(|source| ProbeError::Bind { port, source })?;
        drop(listener);
        Ok(())
    }

    /// Probe a single port, swallowing the error detail.
    pub async fn is_available(&self, port: u16) -> bool {
        match self.probe(port).await {
            Ok(()) => true,
            Err(err) => {
                trace!("Port {} unavailable: {}", port, err);
                false
            }
        }
    }

    /// Scan the full port range and return the unavailable ports in
    /// ascending order.
    ///
    /// Probes run concurrently (bounded by the configured concurrency), so
    /// completion order is arbitrary; the result is sorted afterward.
    /// Individual probe failures are treated as "unavailable" and never
    /// abort the scan.
    pub async fn scan_all(&self) -> Vec<u16> {
        let mut unavailable: Vec<u16> = stream::iter(0..=MAX_PORT)
            .map(|port| async move { (port, self.probe(port).await.is_err()) })
            .buffer_unordered(self.concurrency)
            .filter_map(|(port, taken)| async move { taken.then_some(port) })
            .collect()
            .await;
        unavailable.sort_unstable();
        debug!("Full scan found {} unavailable ports", unavailable.len());
        unavailable
    }

    /// Scan the supplied ports, preserving the caller's order, and return
    /// the unavailable subset.
    pub async fn scan_list(&self, ports: &[u16]) -> Vec<u16> {
        stream::iter(ports.iter().copied())
            .map(|port| async move { (port, self.probe(port).await.is_err()) })
            .buffered(self.concurrency)
            .filter_map(|(port, taken)| async move { taken.then_some(port) })
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::MemoryTransport;

    fn scanner(transport: &MemoryTransport) -> PortScanner<MemoryTransport> {
        PortScanner::new(Arc::new(transport.clone())).with_concurrency(64)
    }

    #[tokio::test]
    async fn test_probe_leaves_port_free() {
        let transport = MemoryTransport::new();
        let scanner = scanner(&transport);

        // Two probes in a row both succeed: the first one must have
        // released its listener.
        assert!(scanner.probe(7000).await.is_ok());
        assert!(scanner.probe(7000).await.is_ok());

        // And a real listener can still claim the port afterward.
        assert!(transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7000)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_probe_held_port_reports_bind_error() {
        let transport = MemoryTransport::new();
        let scanner = scanner(&transport);
        let _held = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7000)))
            .await
            .unwrap();

        let err = scanner.probe(7000).await.unwrap_err();
        let ProbeError::Bind { port, .. } = err;
        assert_eq!(port, 7000);
        assert!(!scanner.is_available(7000).await);
    }

    #[tokio::test]
    async fn test_scan_list_empty_is_empty() {
        let transport = MemoryTransport::new();
        assert!(scanner(&transport).scan_list(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_scan_list_reports_only_held_ports() {
        let transport = MemoryTransport::new();
        let scanner = scanner(&transport);
        let _held = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 8080)))
            .await
            .unwrap();

        let unavailable = scanner.scan_list(&[80, 8080, 4000]).await;
        assert_eq!(unavailable, vec![8080]);
    }

    #[tokio::test]
    async fn test_scan_all_ascending_with_two_held_ports() {
        let transport = MemoryTransport::new();
        let scanner = scanner(&transport);
        let _first = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7001)))
            .await
            .unwrap();
        let _second = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7000)))
            .await
            .unwrap();

        let unavailable = scanner.scan_all().await;
        assert_eq!(unavailable, vec![7000, 7001]);
    }
}
