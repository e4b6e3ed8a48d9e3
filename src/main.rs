//! # AREA Blueprint CLI
//!
//! Inspect what the blueprint editor would show for the configured backend.

use std::sync::Arc;

use anyhow::{Context, Result};
use area_blueprint::{
    blueprint::{GraphOrchestrator, TracingNotifier, availability, build_sidebar},
    config::ConfigLoader,
    telemetry::init_tracing,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "area-blueprint", version, about = "AREA blueprint graph inspector")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch hooks and reactions and print the projected graph.
    Graph,
    /// Print the sidebar templates gated by connection status.
    Sidebar,
    /// List the registered service adapters.
    Services,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    init_tracing(&config).context("initializing telemetry")?;
    info!(profile = %config.profile, base_url = %config.api_base_url, "Configuration loaded");

    let orchestrator = GraphOrchestrator::from_config(&config, Arc::new(TracingNotifier))
        .context("building orchestrator")?;

    match cli.command {
        Command::Graph => {
            orchestrator.refresh().await;
            print_json(&orchestrator.graph())
        }
        Command::Sidebar => {
            let connections = orchestrator.loader().connections().await;
            let about = orchestrator
                .loader()
                .about()
                .await
                .context("fetching available services")?;
            print_json(&build_sidebar(&about, &availability(&connections)))
        }
        Command::Services => print_json(&orchestrator.registry().list_metadata()),
    }
}
