//! Internal and external IP discovery.
//!
//! The internal address comes from a UDP "connect" to a well-known external
//! endpoint: no datagram is sent, the kernel just picks the route and the
//! socket's local address is the answer. The external address comes from an
//! HTTP endpoint that returns the caller's IP as the whole response body.

mod error;

pub use error::{NetInfoError, NetInfoResult};

use crate::net::Transport;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::net::IpAddr;
use tracing::debug;

/// Default external endpoint answering with the caller's public IP.
pub const DEFAULT_EXTERNAL_IP_URL: &str = "http://myexternalip.com/raw";

/// Default address the internal-IP route probe "connects" to.
pub const DEFAULT_PROBE_TARGET: &str = "8.8.8.8:80";

/// Discover the host's internal IP address.
pub async fn internal_ip<T: Transport>(
    transport: &T,
    probe_target: &str,
) -> NetInfoResult<IpAddr> {
    let addr = transport
        .discover_local_addr(probe_target)
        .await
        .map_err(NetInfoError::Discover)?;
    Ok(addr.ip())
}

/// Discover the host's external IP address by querying `endpoint`.
///
/// The whole response body is taken as the address, with a trailing newline
/// trimmed. A body that does not parse as an IP yields `Ok(None)` rather
/// than an error.
pub async fn external_ip(endpoint: &str) -> NetInfoResult<Option<IpAddr>> {
    let uri: Uri = endpoint
        .parse()
        .map_err(|_| NetInfoError::InvalidUrl(endpoint.to_string()))?;

    let client: Client<_, Empty<Bytes>> = Client::builder(TokioExecutor::new()).build_http();
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Empty::new())
        .unwrap();

    let response = client
        .request(request)
        .await
        .map_err(|err| NetInfoError::Request {
            url: endpoint.to_string(),
            message: err.to_string(),
        })?;

    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|err| NetInfoError::Body {
            url: endpoint.to_string(),
            message: err.to_string(),
        })?
        .to_bytes();

    let text = String::from_utf8_lossy(&body);
    let parsed = text.trim_end_matches('\n').parse().ok();
    if parsed.is_none() {
        debug!("External IP endpoint returned an unparseable body");
    }
    Ok(parsed)
}
