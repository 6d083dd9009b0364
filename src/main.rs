//! portway: host-local network utility
//!
//! Entry point for the portway binary. Handles CLI parsing, logging
//! initialization, configuration loading, and dispatches to the selected
//! engine. Usage and runtime errors exit with code 1; the message goes to
//! stderr.

use anyhow::{Context, Result};
use clap::Parser;
use portway::{cli::Cli, config::ConfigLoader, runner};
use tracing::debug;

fn main() -> Result<()> {
    // Parse CLI arguments first; clap handles usage errors itself.
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;
    debug!("Parsed CLI arguments: {:?}", cli);

    // Load configuration with hierarchy merging (defaults, user config,
    // --config overlay). CLI flags are applied on top in the runner.
    let config = ConfigLoader::new()
        .load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    debug!("Loaded configuration: {:?}", config);

    runner::run(cli, config)
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so they never mix with command output on stdout.
///
/// # Verbosity Levels
/// - 0 (default): Only warnings and errors
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
