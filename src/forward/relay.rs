//! Per-connection relay: dial the target, then duplex-copy.

use crate::net::Transport;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Relay one inbound connection to `target`.
///
/// On dial failure the inbound connection is dropped (closed) and the error
/// is offered to the session's failure channel; whether that ends the
/// session is the session's decision, not the relay's. On dial success the
/// relay runs until either direction finishes.
pub(super) async fn run<T: Transport>(
    transport: Arc<T>,
    inbound: T::Conn,
    target: &str,
    failures: &mpsc::Sender<io::Error>,
) {
    let outbound = match transport.dial(target).await {
        Ok(conn) => conn,
        Err(err) => {
            debug!("Relay dial to {} failed: {}", target, err);
            // A full channel means a failure is already pending; drop this one.
            let _ = failures.try_send(err);
            return;
        }
    };

    splice(inbound, outbound).await;
}

/// Duplex-copy between two streams until EOF or error on either side.
///
/// Both directions run concurrently inside `copy_bidirectional`; whichever
/// finishes first shuts its peer down, and both connections are closed when
/// the streams drop here. Connection teardown kinds are normal completion,
/// not errors.
async fn splice<A, B>(mut inbound: A, mut outbound: B)
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    match tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await {
        Ok((sent, received)) => {
            trace!("Relay finished: {} bytes out, {} bytes back", sent, received);
        }
        Err(err) => match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => {
                trace!("Relay closed by peer: {}", err);
            }
            _ => debug!("Relay copy error: {}", err),
        },
    }
}
