//! CLI for oplog
//!
//! Commands:
//! - render: resolve one template against ad-hoc arguments
//! - run: push a JSON scenario through the interceptor and print the records
//! - config: print the effective configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use oplog_engine::{EngineConfig, LogFormat};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "oplog")]
#[command(about = "oplog - template-driven operation log engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "OPLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single template
    Render(commands::render::RenderArgs),

    /// Run a scenario file through the interceptor
    Run(commands::run::RunArgs),

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref())?;
    init_tracing(cli.verbose, config.log_format);

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Run(args) => commands::run::run(args, config).await,
        Commands::Config => commands::config::run(&config),
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
    }
}
