// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # HIVE Swarm Host CLI
//!
//! The `hive` binary hosts an agent swarm on one machine.
//!
//! ## Commands
//!
//! - `hive serve` - Run the HTTP control surface (also the default)
//! - `hive swarm [IDS..]` - Start agents and run until interrupted
//! - `hive agents` - List the agents configured under the agents directory
//!
//! Configuration resolves defaults, then the `--config` file, then `HIVE_*`
//! environment variables; `--host`/`--port` override the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use hive_core::application::swarm_service::SwarmService;
use hive_core::domain::agent::AgentId;
use hive_core::domain::config::HiveConfig;
use hive_core::presentation::api;
use std::path::PathBuf;
use tracing::info;

mod bootstrap;

/// HIVE Swarm Host - run autonomous agent swarms
#[derive(Parser)]
#[command(name = "hive")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON)
    #[arg(
        short,
        long,
        global = true,
        env = "HIVE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API host (overrides configuration)
    #[arg(long, global = true)]
    host: Option<String>,

    /// HTTP API port (overrides configuration)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HIVE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP control surface
    Serve,

    /// Start a swarm of agents and run until interrupted
    Swarm {
        /// Agent ids to start; defaults to every configured agent
        ids: Vec<String>,
    },

    /// List the agents configured under the agents directory
    Agents,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let mut config = HiveConfig::resolve(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command {
        Some(Commands::Serve) | None => serve(config).await,
        Some(Commands::Swarm { ids }) => run_swarm(config, ids).await,
        Some(Commands::Agents) => list_agents(&config),
    }
}

async fn serve(config: HiveConfig) -> Result<()> {
    let services = bootstrap::build(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    println!("{} listening on {}", "HIVE".green().bold(), addr);
    info!(%addr, "control surface up");

    axum::serve(listener, api::app(services.state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let report = services.swarm.stop(config.stop_timeout).await?;
    if !report.failed_to_stop.is_empty() {
        eprintln!(
            "{} {} agent(s) did not stop in time",
            "warning:".yellow(),
            report.failed_to_stop.len()
        );
    }
    services.resources.shutdown().await;
    Ok(())
}

async fn run_swarm(config: HiveConfig, ids: Vec<String>) -> Result<()> {
    let services = bootstrap::build(&config)?;

    let ids: Vec<AgentId> = if ids.is_empty() {
        services.swarm.available_agents()
    } else {
        ids.into_iter().map(AgentId::new).collect()
    };
    if ids.is_empty() {
        anyhow::bail!(
            "no agents configured under {}",
            config.agents_dir.display()
        );
    }

    let report = services.swarm.start(ids).await?;
    for id in &report.started {
        println!("{} {}", "started".green(), id);
    }
    for (id, reason) in &report.failed {
        eprintln!("{} {}: {}", "failed".red(), id, reason);
    }
    if report.started.is_empty() {
        anyhow::bail!("no agents started");
    }

    println!("swarm running, press Ctrl-C to stop");
    shutdown_signal().await;

    let report = services.swarm.stop(config.stop_timeout).await?;
    for id in &report.stopped {
        println!("{} {}", "stopped".green(), id);
    }
    for id in &report.failed {
        eprintln!("{} {}", "had failed:".red(), id);
    }
    for id in &report.failed_to_stop {
        eprintln!("{} {}", "did not stop:".red(), id);
    }
    services.resources.shutdown().await;
    Ok(())
}

fn list_agents(config: &HiveConfig) -> Result<()> {
    let ids = hive_core::domain::agent::AgentConfig::available(&config.agents_dir);
    if ids.is_empty() {
        println!(
            "no agents configured under {}",
            config.agents_dir.display()
        );
        return Ok(());
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
