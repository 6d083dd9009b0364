//! Configuration schema definitions.

use crate::netinfo::{DEFAULT_EXTERNAL_IP_URL, DEFAULT_PROBE_TARGET};
use crate::probe::DEFAULT_SCAN_CONCURRENCY;
use serde::{Deserialize, Serialize};

/// Default port for the HTTP responder.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// HTTP responder settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Forwarding engine settings.
    #[serde(default)]
    pub forward: ForwardSettings,

    /// Port scan and IP discovery settings.
    #[serde(default)]
    pub check: CheckConfig,
}

impl Config {
    /// Merge another config into this one; `other`'s non-default scalars
    /// win.
    pub fn merge(&mut self, other: Config) {
        self.server.merge(other.server);
        self.forward.merge(other.forward);
        self.check.merge(other.check);
    }
}

/// HTTP responder settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port used by `serve` when `--port` is not given.
    pub port: u16,

    /// Serve the working directory as static files by default.
    pub file: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HTTP_PORT,
            file: false,
        }
    }
}

impl ServerConfig {
    fn merge(&mut self, other: ServerConfig) {
        if other.port != DEFAULT_HTTP_PORT {
            self.port = other.port;
        }
        if other.file {
            self.file = true;
        }
    }
}

/// Forwarding engine settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardSettings {
    /// Terminate a forwarding session on the first relay dial failure.
    pub fail_fast: bool,

    /// Upper bound on simultaneously active relays; absent means unbounded.
    pub max_relays: Option<usize>,
}

impl ForwardSettings {
    fn merge(&mut self, other: ForwardSettings) {
        if other.fail_fast {
            self.fail_fast = true;
        }
        if other.max_relays.is_some() {
            self.max_relays = other.max_relays;
        }
    }
}

/// Port scan and IP discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Number of probes in flight during a scan.
    pub concurrency: usize,

    /// HTTP endpoint answering with the caller's public IP.
    pub external_ip_url: String,

    /// Address the internal-IP route probe "connects" to.
    pub probe_target: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_SCAN_CONCURRENCY,
            external_ip_url: DEFAULT_EXTERNAL_IP_URL.to_string(),
            probe_target: DEFAULT_PROBE_TARGET.to_string(),
        }
    }
}

impl CheckConfig {
    fn merge(&mut self, other: CheckConfig) {
        if other.concurrency != DEFAULT_SCAN_CONCURRENCY {
            self.concurrency = other.concurrency;
        }
        if other.external_ip_url != DEFAULT_EXTERNAL_IP_URL {
            self.external_ip_url = other.external_ip_url;
        }
        if other.probe_target != DEFAULT_PROBE_TARGET {
            self.probe_target = other.probe_target;
        }
    }
}
