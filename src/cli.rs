//! Command-line interface definitions for portway.
//!
//! Uses clap's derive API for type-safe argument parsing. Port numbers are
//! validated by clap's `u16` value parser, so out-of-range input is rejected
//! as a usage error before any engine runs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ordered list of ports parsed from a comma-separated flag value.
///
/// An empty list (explicit `--ports ""`) is distinct from the flag being
/// absent, which means "scan the full range".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortList(pub Vec<u16>);

impl std::fmt::Display for PortList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(u16::to_string).collect();
        write!(f, "{}", rendered.join(","))
    }
}

/// Host-local network utility.
///
/// portway opens a small HTTP responder, checks local TCP ports for
/// availability, or relays TCP connections from a local port to a remote
/// target.
#[derive(Parser, Debug)]
#[command(name = "portway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to additional config file.
    ///
    /// Merged on top of the user config, giving it the highest priority
    /// below CLI flags.
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Subcommands for portway.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a local HTTP server (e.g. serve --port 8080).
    Serve {
        /// Port to listen on.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Serve the current working directory as static files instead of
        /// the text response.
        #[arg(short = 'f', long = "file")]
        file: bool,
    },

    /// Relay TCP connections from a local port to a target address
    /// (e.g. forward --target 127.0.0.1:8080 --port 9000).
    Forward {
        /// Target address to dial for each inbound connection (host:port).
        #[arg(short = 't', long = "target", value_parser = parse_target)]
        target: String,

        /// Local port to listen on.
        #[arg(short = 'p', long = "port")]
        port: u16,

        /// Terminate the whole session on the first relay dial failure
        /// instead of dropping only the affected connection.
        #[arg(long = "fail-fast")]
        fail_fast: bool,
    },

    /// Check local TCP ports for availability, or report IP addresses
    /// (e.g. check --ports 80,8080,4000).
    Check {
        /// Comma-separated list of ports to check. Without this flag the
        /// full range 0-65535 is scanned.
        #[arg(long = "ports", value_name = "LIST", value_parser = parse_port_list)]
        ports: Option<PortList>,

        /// Report the internal and external IP addresses instead of
        /// scanning ports.
        #[arg(long = "ip")]
        ip: bool,
    },
}

/// Parse a comma-separated port list (e.g. "80,8080,4000").
///
/// An empty string parses to an empty list. Whitespace around entries is
/// tolerated.
fn parse_port_list(input: &str) -> Result<PortList, String> {
    let mut ports = Vec::new();
    for part in input.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let port: u16 = trimmed
            .parse()
            .map_err(|_| format!("invalid port number: {trimmed}"))?;
        ports.push(port);
    }
    Ok(PortList(ports))
}

/// Validate a forward target as `host:port` with a 16-bit port.
///
/// The host part is not resolved here; resolution happens at dial time.
fn parse_target(input: &str) -> Result<String, String> {
    let Some((host, port)) = input.rsplit_once(':') else {
        return Err(format!("target must be host:port, got: {input}"));
    };
    if host.is_empty() {
        return Err(format!("target is missing a host: {input}"));
    }
    port.parse::<u16>()
        .map_err(|_| format!("target has an invalid port: {input}"))?;
    Ok(input.to_string())
}
