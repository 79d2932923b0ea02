//! sp2blob CLI - Copy SharePoint document library files into Azure Blob Storage
//!
//! Provides commands for:
//! - Copying (or just listing) matching files from a library folder tree
//! - Showing and validating the effective configuration

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, copy::CopyCommand, CommandContext};
use output::OutputFormat;
use sp2blob_core::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "sp2blob",
    version,
    about = "Copy SharePoint document library files into Azure Blob Storage"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file (KEY=value, or YAML with a .yaml extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy matching files from SharePoint into a blob container
    Copy(CopyCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Log filter used when `RUST_LOG` is not set
///
/// `-v` flags win over `-q`, which wins over the configured level.
fn default_log_level(verbose: u8, quiet: bool, configured: Option<&str>) -> String {
    match (verbose, quiet) {
        (0, true) => "warn".to_string(),
        (0, false) => configured.unwrap_or("info").to_string(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let loaded = Config::load_with_warnings(&config_path);

    let configured_level = loaded.as_ref().ok().map(|(c, _)| c.logging.level.as_str());
    init_tracing(
        &default_log_level(cli.verbose, cli.quiet, configured_level),
        cli.log_json,
    );

    if let Ok((_, warnings)) = &loaded {
        for warning in warnings {
            tracing::warn!(config_path = %config_path.display(), "{warning}");
        }
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let ctx = CommandContext {
        format,
        quiet: cli.quiet,
        config_path,
        loaded: loaded.map(|(config, _)| config),
    };

    match cli.command {
        Commands::Copy(cmd) => cmd.execute(ctx).await,
        Commands::Config(cmd) => cmd.execute(ctx).await,
    }
}
