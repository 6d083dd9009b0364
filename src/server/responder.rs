//! The hyper-backed HTTP responder.

use super::error::{ServeError, ServeResult};
use super::files;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

/// Configuration for the HTTP responder.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Port to listen on.
    pub port: u16,
    /// Serve the working directory as static files instead of the text
    /// response.
    pub use_file: bool,
}

/// A bound HTTP responder, ready to serve.
pub struct HttpResponder {
    listener: TcpListener,
    port: u16,
    /// Root directory for file mode, captured at bind time.
    file_root: Option<Arc<PathBuf>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HttpResponder {
    /// Bind the server port.
    ///
    /// Binding failure is fatal and returned immediately. In file mode the
    /// working directory is resolved here, so a later `cd` by the process
    /// does not change what is served.
    pub async fn bind(
        config: ResponderConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> ServeResult<Self> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind {
                port: config.port,
                source,
            })?;
        let port = listener
            .local_addr()
            .map_err(|source| ServeError::Bind {
                port: config.port,
                source,
            })?
            .port();

        let file_root = if config.use_file {
            Some(Arc::new(
                std::env::current_dir().map_err(ServeError::WorkingDir)?,
            ))
        } else {
            None
        };

        Ok(Self {
            listener,
            port,
            file_root,
            shutdown_rx,
        })
    }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the shutdown signal or an accept failure.
    pub async fn serve(mut self) -> ServeResult<()> {
        info!(
            "HTTP server listening on 0.0.0.0:{} ({})",
            self.port,
            if self.file_root.is_some() {
                "file mode"
            } else {
                "text mode"
            }
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer_addr) = accepted.map_err(ServeError::Accept)?;
                    debug!("HTTP connection from {}", peer_addr);

                    let port = self.port;
                    let file_root = self.file_root.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let file_root = file_root.clone();
                            async move { respond(req, port, file_root).await }
                        });
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            debug!("HTTP connection error: {}", err);
                        }
                    });
                }
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("HTTP server on port {} shutting down", self.port);
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn respond(
    req: Request<Incoming>,
    port: u16,
    file_root: Option<Arc<PathBuf>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match file_root {
        Some(root) => files::serve(&root, req.uri().path()).await,
        None => text_response(port, req.uri().path()),
    };
    Ok(response)
}

/// The fixed text-mode body: `You're now on port <port> [<request-path>]`.
fn text_response(port: u16, path: &str) -> Response<Full<Bytes>> {
    let body = format!("You're now on port {port} [{path}]");
    Response::builder()
        .status(200)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
