//! portway: host-local network utility
//!
//! This crate provides three capabilities behind one binary:
//!
//! - **serve**: a minimal HTTP responder on a local port, answering either
//!   with a fixed text body or with static files from the working directory
//! - **check**: a TCP port-availability scanner covering the full 16-bit
//!   port space or an explicit list, plus internal/external IP discovery
//! - **forward**: a byte-transparent TCP relay from a local listening port
//!   to a remote `host:port` target
//!
//! # Architecture
//!
//! - **net**: the transport seam — a narrow dial/listen capability trait
//!   with a real tokio-backed stack and a deterministic in-memory double
//! - **probe**: port probing via bind-and-release, with bounded concurrency
//! - **forward**: the relay engine — one accept loop per session, one relay
//!   task per connection, duplex copy until either side closes
//! - **server**: the HTTP responder shim
//! - **netinfo**: internal/external IP discovery
//! - **config**: TOML configuration with hierarchy merging
//!
//! The engines never classify transport errors. Bind and accept failures end
//! a session and surface to the caller; per-probe and per-relay failures are
//! absorbed locally and logged.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod forward;
pub mod net;
pub mod netinfo;
pub mod probe;
pub mod runner;
pub mod server;
