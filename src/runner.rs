//! Subcommand execution.
//!
//! Builds the tokio runtime, wires ctrl-c into the shared shutdown channel,
//! and hands validated parameters to the engines. All user-facing output of
//! the `check` command is rendered here; the engines only return data.

use crate::cli::{Cli, Commands, PortList};
use crate::config::Config;
use crate::forward::{ForwardConfig, Forwarder};
use crate::net::TokioTransport;
use crate::netinfo;
use crate::probe::PortScanner;
use crate::server::{HttpResponder, ResponderConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;

/// Execute the parsed command line against the merged configuration.
pub fn run(cli: Cli, config: Config) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match cli.command {
        Commands::Serve { port, file } => {
            let responder_config = ResponderConfig {
                port: port.unwrap_or(config.server.port),
                use_file: file || config.server.file,
            };
            rt.block_on(serve(responder_config))
        }
        Commands::Forward {
            target,
            port,
            fail_fast,
        } => {
            let mut forward_config = ForwardConfig::new(port, target);
            forward_config.fail_fast = fail_fast || config.forward.fail_fast;
            forward_config.max_relays = config.forward.max_relays;
            rt.block_on(forward(forward_config))
        }
        Commands::Check { ports, ip } => rt.block_on(check(ports, ip, &config)),
    }
}

async fn serve(config: ResponderConfig) -> Result<()> {
    let responder = HttpResponder::bind(config, shutdown_signal())
        .await
        .context("Failed to start HTTP server")?;
    responder.serve().await?;
    Ok(())
}

async fn forward(config: ForwardConfig) -> Result<()> {
    let forwarder = Forwarder::new(Arc::new(TokioTransport::new()), config, shutdown_signal());
    forwarder.run().await?;
    Ok(())
}

async fn check(ports: Option<PortList>, ip: bool, config: &Config) -> Result<()> {
    if ip {
        let transport = TokioTransport::new();
        let internal = netinfo::internal_ip(&transport, &config.check.probe_target)
            .await
            .context("Failed to discover internal IP")?;
        let external = netinfo::external_ip(&config.check.external_ip_url)
            .await
            .context("Failed to discover external IP")?;

        println!("Your internal IP: {internal}");
        match external {
            Some(addr) => println!("Your external IP: {addr}"),
            None => println!("Your external IP: unknown"),
        }
        return Ok(());
    }

    let scanner = PortScanner::new(Arc::new(TokioTransport::new()))
        .with_concurrency(config.check.concurrency);

    match ports {
        None => {
            let unavailable = scanner.scan_all().await;
            println!("Unavailable ports in this machine are:");
            println!("{}", render_ports(&unavailable));
        }
        Some(list) => {
            let unavailable = scanner.scan_list(&list.0).await;
            println!("The only unavailable ports among {list} are:");
            println!("{}", render_ports(&unavailable));
        }
    }
    Ok(())
}

fn render_ports(ports: &[u16]) -> String {
    if ports.is_empty() {
        return "none".to_string();
    }
    let rendered: Vec<String> = ports.iter().map(u16::to_string).collect();
    rendered.join(",")
}

/// Watch channel flipped when the process receives ctrl-c.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });
    shutdown_rx
}
