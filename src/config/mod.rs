//! Configuration for portway.
//!
//! TOML configuration loaded from (lowest to highest priority):
//!
//! 1. Built-in defaults
//! 2. User config: `~/.config/portway/config.toml`
//! 3. Additional config file (via `--config` flag)
//! 4. CLI flags
//!
//! Every source is optional; with no config file at all the defaults apply.
//! Scalars are overridden by later sources when set to a non-default value.
//!
//! ```toml
//! [server]
//! port = 9090
//!
//! [forward]
//! fail_fast = true
//! max_relays = 256
//!
//! [check]
//! concurrency = 128
//! external_ip_url = "http://myexternalip.com/raw"
//! ```

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{CheckConfig, Config, ForwardSettings, ServerConfig, DEFAULT_HTTP_PORT};
