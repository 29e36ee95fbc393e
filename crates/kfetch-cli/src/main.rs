//! kfetch CLI - host info banner over an exclusive channel
//!
//! Provides commands for:
//! - Serving the channel as a FUSE node
//! - Querying a mounted node, optionally setting the field mask
//! - Rendering a report in-process without a mount
//! - Inspecting configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kfetch_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, render::RenderCommand, serve::ServeCommand, show::ShowCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "kfetch", version, about = "Host information banner over an exclusive channel")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mount the kfetch node and serve it until interrupted
    Serve(ServeCommand),
    /// Query a mounted node
    Show(ShowCommand),
    /// Render a report in-process, without a mount
    Render(RenderCommand),
    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Log filter directive: `-v` count wins, else the configured level.
fn log_directive(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Loads `path` if given (it must parse), else the default path or defaults.
fn load_config(path: Option<&Path>) -> Result<(Config, PathBuf)> {
    match path {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok((config, path.to_path_buf()))
        }
        None => {
            let path = Config::default_path();
            Ok((Config::load_or_default(&path), path))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = load_config(cli.config.as_deref())?;

    // Setup tracing
    let filter = log_directive(cli.verbose, &config.logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config_path = %config_path.display(), "Loaded configuration");

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config, format).await,
        Commands::Show(cmd) => cmd.execute(&config, format).await,
        Commands::Render(cmd) => cmd.execute(&config, format).await,
        Commands::Config(cmd) => cmd.execute(&config, &config_path, format).await,
    }
}
