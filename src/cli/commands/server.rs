use clap::Args;

use super::config::LoggingConfig;
use crate::config::ConfigArgs;

#[derive(Debug, Args)]
pub struct ServerCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LoggingConfig,
}
