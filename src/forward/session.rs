//! Forwarding session: one listener, one accept loop, many relays.

use super::error::{ForwardError, ForwardResult};
use super::relay;
use crate::net::{Listener, Transport};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, info, warn};

/// Configuration for one forwarding session.
#[derive(Debug, Clone)]
pub struct ForwardConfig {
    /// Local port to listen on.
    pub listen_port: u16,
    /// Target address (`host:port`) dialed for each inbound connection.
    ///
    /// Forwarding a port to itself is legal; the engine does not reject it,
    /// the traffic simply loops.
    pub target: String,
    /// Terminate the whole session on the first relay dial failure.
    ///
    /// Off by default: a dial failure then costs only the affected
    /// connection.
    pub fail_fast: bool,
    /// Upper bound on simultaneously active relays.
    ///
    /// `None` (the default) means unbounded fan-out; when set, the accept
    /// loop waits for a free slot before taking the next connection.
    pub max_relays: Option<usize>,
}

impl ForwardConfig {
    /// Configuration with default failure scoping and no relay bound.
    pub fn new(listen_port: u16, target: impl Into<String>) -> Self {
        Self {
            listen_port,
            target: target.into(),
            fail_fast: false,
            max_relays: None,
        }
    }
}

#[derive(Default)]
struct GaugeInner {
    active: AtomicUsize,
    total: AtomicU64,
}

/// Cloneable live counters for a forwarding session.
#[derive(Clone, Default)]
pub struct RelayGauge {
    inner: Arc<GaugeInner>,
}

impl RelayGauge {
    /// Number of relays currently running.
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Total connections accepted over the session's lifetime.
    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::SeqCst)
    }

    fn enter(&self) -> RelayTicket {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        self.inner.total.fetch_add(1, Ordering::SeqCst);
        RelayTicket {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Decrements the active count when the relay task ends, however it ends.
struct RelayTicket {
    inner: Arc<GaugeInner>,
}

impl Drop for RelayTicket {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A forwarding session over a [`Transport`].
pub struct Forwarder<T: Transport> {
    transport: Arc<T>,
    config: ForwardConfig,
    shutdown_rx: watch::Receiver<bool>,
    gauge: RelayGauge,
}

impl<T: Transport> Forwarder<T> {
    /// Create a session; nothing is bound until [`run`](Forwarder::run).
    pub fn new(transport: Arc<T>, config: ForwardConfig, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            transport,
            config,
            shutdown_rx,
            gauge: RelayGauge::default(),
        }
    }

    /// Handle to the session's relay counters.
    pub fn gauge(&self) -> RelayGauge {
        self.gauge.clone()
    }

    /// Bind the listener and run the accept loop until a session-fatal
    /// error or the shutdown signal.
    ///
    /// Bind failure is returned immediately. An accept failure ends the
    /// session; so does a relay dial failure when fail-fast is enabled.
    /// In-flight relays are not cancelled on termination; their own
    /// connections ending stops them.
    pub async fn run(mut self) -> ForwardResult<()> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.listen_port));
        let listener = self
            .transport
            .listen(addr)
            .await
            .map_err(|source| ForwardError::Bind {
                port: self.config.listen_port,
                source,
            })?;

        info!(
            "Forwarding 0.0.0.0:{} -> {}",
            self.config.listen_port, self.config.target
        );

        let limiter = self
            .config
            .max_relays
            .map(|slots| Arc::new(Semaphore::new(slots)));

        // Relays report dial failures here; the channel is only drained in
        // fail-fast mode. Capacity 1 is enough: one failure ends the session.
        let (fail_tx, mut fail_rx) = mpsc::channel::<io::Error>(1);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let inbound = accepted.map_err(ForwardError::Accept)?;
                    debug!("Accepted inbound connection on port {}", self.config.listen_port);

                    let permit = match &limiter {
                        // Admission control: hold the next accept until a
                        // relay slot frees up.
                        Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
                        None => None,
                    };

                    let transport = Arc::clone(&self.transport);
                    let target = self.config.target.clone();
                    let fail_tx = fail_tx.clone();
                    let ticket = self.gauge.enter();
                    tokio::spawn(async move {
                        let _permit = permit;
                        let _ticket = ticket;
                        relay::run(transport, inbound, &target, &fail_tx).await;
                    });
                }
                failure = fail_rx.recv(), if self.config.fail_fast => {
                    if let Some(source) = failure {
                        warn!(
                            "Ending forwarding session on port {}: dial to {} failed",
                            self.config.listen_port, self.config.target
                        );
                        return Err(ForwardError::RelayDial {
                            target: self.config.target.clone(),
                            source,
                        });
                    }
                }
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!(
                            "Forwarding session on port {} shutting down",
                            self.config.listen_port
                        );
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::MemoryTransport;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::time::{sleep, timeout};

    const TICK: Duration = Duration::from_millis(5);

    async fn dial_with_retry(transport: &MemoryTransport, target: &str) -> DuplexStream {
        for _ in 0..200 {
            if let Ok(conn) = transport.dial(target).await {
                return conn;
            }
            sleep(TICK).await;
        }
        panic!("forwarder never started listening on {target}");
    }

    async fn wait_for_active(gauge: &RelayGauge, expected: usize) {
        for _ in 0..200 {
            if gauge.active() == expected {
                return;
            }
            sleep(TICK).await;
        }
        panic!("active relay count never reached {expected}");
    }

    fn spawn_forwarder(
        transport: &MemoryTransport,
        config: ForwardConfig,
    ) -> (
        tokio::task::JoinHandle<ForwardResult<()>>,
        RelayGauge,
        watch::Sender<bool>,
    ) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let forwarder = Forwarder::new(Arc::new(transport.clone()), config, shutdown_rx);
        let gauge = forwarder.gauge();
        let handle = tokio::spawn(forwarder.run());
        (handle, gauge, shutdown_tx)
    }

    #[tokio::test]
    async fn test_roundtrip_both_directions() {
        let transport = MemoryTransport::new();
        let backend = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7101)))
            .await
            .unwrap();

        let (handle, _gauge, shutdown_tx) =
            spawn_forwarder(&transport, ForwardConfig::new(7100, "127.0.0.1:7101"));

        let mut client = dial_with_retry(&transport, "127.0.0.1:7100").await;
        let mut server = timeout(Duration::from_secs(1), backend.accept())
            .await
            .unwrap()
            .unwrap();

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        timeout(Duration::from_secs(1), server.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").await.unwrap();
        timeout(Duration::from_secs(1), client.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"pong");

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_client_close_reaches_target_and_gauge_shrinks() {
        let transport = MemoryTransport::new();
        let backend = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7201)))
            .await
            .unwrap();

        let (_handle, gauge, _shutdown_tx) =
            spawn_forwarder(&transport, ForwardConfig::new(7200, "127.0.0.1:7201"));

        let client = dial_with_retry(&transport, "127.0.0.1:7200").await;
        let mut server = timeout(Duration::from_secs(1), backend.accept())
            .await
            .unwrap()
            .unwrap();
        wait_for_active(&gauge, 1).await;

        drop(client);
        let mut rest = Vec::new();
        timeout(Duration::from_secs(1), server.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert!(rest.is_empty());

        drop(server);
        wait_for_active(&gauge, 0).await;
        assert_eq!(gauge.total(), 1);
    }

    #[tokio::test]
    async fn test_dial_failure_keeps_session_alive_by_default() {
        let transport = MemoryTransport::new();
        // Nothing listens on the target port.
        let (handle, _gauge, shutdown_tx) =
            spawn_forwarder(&transport, ForwardConfig::new(7300, "127.0.0.1:7301"));

        let mut failed = dial_with_retry(&transport, "127.0.0.1:7300").await;
        // The relay drops our connection after its dial fails.
        let mut rest = Vec::new();
        timeout(Duration::from_secs(1), failed.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();

        // The accept loop is still running and still takes connections.
        sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        let _second = dial_with_retry(&transport, "127.0.0.1:7300").await;

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_dial_failure_ends_session_in_fail_fast_mode() {
        let transport = MemoryTransport::new();
        let mut config = ForwardConfig::new(7400, "127.0.0.1:7401");
        config.fail_fast = true;
        let (handle, _gauge, _shutdown_tx) = spawn_forwarder(&transport, config);

        let _client = dial_with_retry(&transport, "127.0.0.1:7400").await;

        let result = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        match result {
            Err(ForwardError::RelayDial { target, .. }) => {
                assert_eq!(target, "127.0.0.1:7401");
            }
            other => panic!("Expected RelayDial error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bind_failure_is_immediate() {
        let transport = MemoryTransport::new();
        let _held = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7500)))
            .await
            .unwrap();

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let forwarder = Forwarder::new(
            Arc::new(transport.clone()),
            ForwardConfig::new(7500, "127.0.0.1:7501"),
            shutdown_rx,
        );
        match forwarder.run().await {
            Err(ForwardError::Bind { port, .. }) => assert_eq!(port, 7500),
            other => panic!("Expected Bind error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_max_relays_bounds_admission() {
        let transport = MemoryTransport::new();
        let backend = transport
            .listen(SocketAddr::from(([0, 0, 0, 0], 7601)))
            .await
            .unwrap();

        let mut config = ForwardConfig::new(7600, "127.0.0.1:7601");
        config.max_relays = Some(1);
        let (_handle, gauge, _shutdown_tx) = spawn_forwarder(&transport, config);

        let _first = dial_with_retry(&transport, "127.0.0.1:7600").await;
        let _first_backend = timeout(Duration::from_secs(1), backend.accept())
            .await
            .unwrap()
            .unwrap();
        wait_for_active(&gauge, 1).await;

        // A second connection is accepted by the transport but must not be
        // relayed while the first one holds the only slot.
        let _second = dial_with_retry(&transport, "127.0.0.1:7600").await;
        sleep(Duration::from_millis(50)).await;
        assert_eq!(gauge.active(), 1);
    }
}
