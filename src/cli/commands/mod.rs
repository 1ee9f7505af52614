pub mod config;
pub mod register;
pub mod server;

pub use config::LoggingConfig;
pub use register::RegisterCommand;
pub use server::ServerCommand;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Start the rendezvous gateway
    Server(ServerCommand),
    /// Register a service with a running gateway and print its identity
    Register(RegisterCommand),
}

impl Commands {
    pub fn logging(&self) -> &LoggingConfig {
        match self {
            Commands::Server(cmd) => &cmd.logging,
            Commands::Register(cmd) => &cmd.logging,
        }
    }
}
