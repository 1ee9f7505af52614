//! Configuration management for the rendezvous gateway.
//!
//! Configuration is layered from several sources:
//! 1. Default configuration (embedded in binary)
//! 2. System-wide configuration file (`/etc/rendezvous/config.toml`)
//! 3. User-specified configuration file
//! 4. Environment variables (prefixed with `RENDEZVOUS_`, nested keys joined with `__`)
//! 5. Command-line arguments
//!
//! Later sources override earlier ones.
//!
//! # Environment Variables
//!
//! - `RENDEZVOUS_SERVER__HOST` - Listen address
//! - `RENDEZVOUS_SERVER__PORT` - Listen port
//! - `RENDEZVOUS_SESSION__IDLE_TIMEOUT_SECS` - Idle timeout for streams (0 disables)
//! - `RENDEZVOUS_SESSION__OUTBOUND_BUFFER` - Per-connection outbound queue depth
//! - `RENDEZVOUS_LOGGING__DIRECTORY` - Directory for the rolling log file

use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");
const SYSTEM_CONFIG: &str = "/etc/rendezvous/config.toml";

/// Command-line overrides for the configuration file values.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, env = "RENDEZVOUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen host
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Seconds of inbound silence before a stream is closed (0 disables)
    #[arg(long = "idle-timeout", value_name = "SECS")]
    pub idle_timeout_secs: Option<u64>,

    /// Frames queued per connection before deliveries to it fail
    #[arg(long)]
    pub outbound_buffer: Option<usize>,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listener settings
    pub server: ServerSettings,
    /// Stream session settings
    #[serde(default)]
    pub session: SessionSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Per-stream session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Idle timeout in seconds, 0 to disable
    #[serde(default)]
    pub idle_timeout_secs: u64,
    /// Outbound queue capacity per connection
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 0,
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

impl SessionSettings {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when no filter is given
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write a daily rolling log file here in addition to stderr
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from all sources
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        Self::load_from(args, Path::new(SYSTEM_CONFIG))
    }

    fn load_from(args: &ConfigArgs, system_config: &Path) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(system_config).required(false));

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("RENDEZVOUS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: GatewayConfig = builder.build()?.try_deserialize()?;

        if let Some(host) = &args.host {
            config.server.host = host.clone();
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if let Some(secs) = args.idle_timeout_secs {
            config.session.idle_timeout_secs = secs;
        }
        if let Some(buffer) = args.outbound_buffer {
            config.session.outbound_buffer = buffer;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.session.outbound_buffer == 0 {
            return Err(Error::Config("session.outbound_buffer must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Socket address the server should listen on
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address: {}", e)))
    }
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}
