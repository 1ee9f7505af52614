use clap::Args;

/// Logging options shared by every subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct LoggingConfig {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "RENDEZVOUS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log filter directives
    #[arg(long = "log-filter", env = "RENDEZVOUS_LOG_FILTER")]
    pub log_filter: Option<String>,
}

impl LoggingConfig {
    /// Level picked from `-v` count, then `--log-level`, then `fallback`.
    pub fn get_effective_level<'a>(&'a self, fallback: &'a str) -> &'a str {
        match (self.verbose, self.log_level.as_deref()) {
            (v, _) if v >= 2 => "trace",
            (1, _) => "debug",
            (_, Some(level)) => level,
            _ => fallback,
        }
    }
}
