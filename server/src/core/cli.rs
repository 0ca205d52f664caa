use clap::Parser;

use std::path::PathBuf;

use super::constants::{
    ENV_CONFIG, ENV_HOST, ENV_OPENOBSERVE_AUTH, ENV_OPENOBSERVE_MAX_ATTEMPTS, ENV_OPENOBSERVE_ORG,
    ENV_OPENOBSERVE_TIMEOUT_SECS, ENV_OPENOBSERVE_URL, ENV_PORT,
};

#[derive(Parser)]
#[command(name = "tracebridge")]
#[command(version, about = "Jaeger query API on top of OpenObserve", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// OpenObserve base URL (e.g. http://localhost:5080)
    #[arg(long, env = ENV_OPENOBSERVE_URL)]
    pub openobserve_url: Option<String>,

    /// Base64 `user:password` credential for OpenObserve
    #[arg(long, env = ENV_OPENOBSERVE_AUTH, hide_env_values = true)]
    pub openobserve_auth: Option<String>,

    /// OpenObserve organization
    #[arg(long, env = ENV_OPENOBSERVE_ORG)]
    pub openobserve_org: Option<String>,

    /// Backend request timeout in seconds
    #[arg(long, env = ENV_OPENOBSERVE_TIMEOUT_SECS)]
    pub openobserve_timeout_secs: Option<u64>,

    /// Attempts per backend search, including the first
    #[arg(long, env = ENV_OPENOBSERVE_MAX_ATTEMPTS)]
    pub openobserve_max_attempts: Option<u32>,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub openobserve_url: Option<String>,
    pub openobserve_auth: Option<String>,
    pub openobserve_org: Option<String>,
    pub openobserve_timeout_secs: Option<u64>,
    pub openobserve_max_attempts: Option<u32>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            openobserve_url: cli.openobserve_url,
            openobserve_auth: cli.openobserve_auth,
            openobserve_org: cli.openobserve_org,
            openobserve_timeout_secs: cli.openobserve_timeout_secs,
            openobserve_max_attempts: cli.openobserve_max_attempts,
        }
    }
}

/// Parse CLI arguments
pub fn parse() -> CliConfig {
    Cli::parse().into()
}
