//! CLI module for Switchyard
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `serve` - Start the admin HTTP server
//! - `backends list` - Show registered backends in rank order
//! - `capabilities list` - Show capability routing with fallback chains
//! - `admission` - Show rate limiter and pool state
//! - `check` - Validate a configuration file
//! - `simulate` - Run one dispatch against a scripted transport
//! - `config init` - Write an annotated sample configuration
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! switchyard serve
//!
//! # What happens to summarization when gpt-4o is down?
//! switchyard simulate --capability summarization --role analyst --fail gpt-4o
//!
//! # Generate shell completions
//! switchyard completions bash > ~/.bash_completion.d/switchyard
//! ```

pub mod admission;
pub mod backends;
pub mod capabilities;
pub mod check;
pub mod completions;
pub mod config;
pub mod output;
pub mod serve;
pub mod simulate;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::config::SwitchyardConfig;
use crate::dispatch::ExecutionTransport;
use crate::engine::Engine;
use crate::telemetry::{AuditFanout, TelemetryFanout};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "switchyard.toml";

/// Switchyard - capability orchestration engine
#[derive(Parser, Debug)]
#[command(
    name = "switchyard",
    version,
    about = "Capability routing with ranked fallback, admission control and authorization"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the admin HTTP server
    Serve(ServeArgs),
    /// Inspect backends
    #[command(subcommand)]
    Backends(BackendsCommands),
    /// Inspect capabilities
    #[command(subcommand)]
    Capabilities(CapabilitiesCommands),
    /// Show admission control state
    Admission(AdmissionArgs),
    /// Validate a configuration file
    Check(CheckArgs),
    /// Simulate a dispatch with scripted backend failures
    Simulate(SimulateArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "SWITCHYARD_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "SWITCHYARD_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SWITCHYARD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Do not update backend status from dispatch outcomes
    #[arg(long)]
    pub no_health: bool,
}

#[derive(Subcommand, Debug)]
pub enum BackendsCommands {
    /// List configured backends
    List(BackendsListArgs),
}

#[derive(Args, Debug)]
pub struct BackendsListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Filter by status (available, degraded, unavailable)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Only backends declaring this capability, in rank order
    #[arg(long)]
    pub capability: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum CapabilitiesCommands {
    /// List capabilities with their active backend and fallback chain
    List(CapabilitiesListArgs),
}

#[derive(Args, Debug)]
pub struct CapabilitiesListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct AdmissionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Capability to dispatch
    #[arg(long)]
    pub capability: String,

    /// Role of the requesting actor
    #[arg(long)]
    pub role: String,

    /// Id of the requesting actor
    #[arg(long, default_value = "cli")]
    pub actor: String,

    /// Backends that fail immediately (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub fail: Vec<String>,

    /// Backends that never reply and hit their attempt timeout (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub slow: Vec<String>,

    /// JSON payload passed to the transport
    #[arg(long)]
    pub payload: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load configuration for an offline command.
///
/// A missing file at the default path yields the default configuration; a
/// missing file anywhere else is an error.
pub fn load_config(path: &Path) -> Result<SwitchyardConfig, Box<dyn std::error::Error>> {
    let config = if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        SwitchyardConfig::default()
    } else {
        SwitchyardConfig::load(Some(path))?
    };
    Ok(config.with_env_overrides())
}

/// Build an engine for an offline command, without telemetry or audit output.
pub fn offline_engine(
    config: &SwitchyardConfig,
    transport: Arc<dyn ExecutionTransport>,
) -> Result<Engine, Box<dyn std::error::Error>> {
    Ok(Engine::new(
        config,
        transport,
        Arc::new(TelemetryFanout::new()),
        Arc::new(AuditFanout::new()),
    )?)
}
