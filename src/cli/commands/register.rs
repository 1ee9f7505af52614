use clap::Args;

use super::config::LoggingConfig;
use crate::registry::ServiceRole;

#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Gateway endpoint
    #[arg(
        short = 'e',
        long,
        default_value = "http://127.0.0.1:5566",
        env = "RENDEZVOUS_ENDPOINT"
    )]
    pub endpoint: String,

    /// Service name to register under
    #[arg(short = 'n', long)]
    pub name: String,

    /// Declared role (producer or consumer)
    #[arg(short = 'r', long)]
    pub role: ServiceRole,

    /// Print the full response as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub logging: LoggingConfig,
}
