//! Rendezvous gateway binary.
//!
//! Producers and consumers register under a service name and then exchange
//! payloads over a persistent bidirectional stream, addressing each other by
//! name instead of network address.

use anyhow::Context;
use clap::Parser;
use rendezvous_core::{
    cli::commands::Commands,
    cli::handlers::{handle_register, handle_server, init_logging},
    config::{GatewayConfig, LoggingSettings},
};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Server(cmd) => {
            let config = GatewayConfig::load(&cmd.config).context("Failed to load configuration")?;
            let _guard = init_logging(cli.command.logging(), &config.logging)?;
            info!("Rendezvous gateway starting up");
            handle_server(config).await
        }
        Commands::Register(cmd) => {
            let _guard = init_logging(cli.command.logging(), &LoggingSettings::default())?;
            handle_register(cmd).await
        }
    }
}
