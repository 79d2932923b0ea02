//! Config command - View and check sp2blob configuration
//!
//! Provides the `sp2blob config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON) with the secret redacted
//! 2. Validates the configuration file and reports every error

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use sp2blob_core::config::Config;

use super::{CommandContext, EXIT_CONFIG};
use crate::output::{get_formatter, plural, OutputFormatter};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, mut ctx: CommandContext) -> Result<ExitCode> {
        let formatter = get_formatter(ctx.is_json(), ctx.quiet);
        let loaded = ctx.take_config();

        match self {
            ConfigCommand::Show => execute_show(loaded, &ctx, formatter.as_ref()),
            ConfigCommand::Validate => Ok(execute_validate(loaded, &ctx, formatter.as_ref())),
        }
    }
}

fn execute_show(
    loaded: Result<Config>,
    ctx: &CommandContext,
    formatter: &dyn OutputFormatter,
) -> Result<ExitCode> {
    let config = loaded.with_context(|| {
        format!(
            "Failed to load configuration from {}",
            ctx.config_path.display()
        )
    })?;

    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Errors found in `loaded`, rendered as `field: message`
fn collect_errors(loaded: &Result<Config>) -> Vec<String> {
    match loaded {
        Ok(config) => config.validate().iter().map(|e| e.to_string()).collect(),
        Err(e) => vec![format!("Failed to load configuration: {e:#}")],
    }
}

fn execute_validate(
    loaded: Result<Config>,
    ctx: &CommandContext,
    formatter: &dyn OutputFormatter,
) -> ExitCode {
    info!(config_path = %ctx.config_path.display(), "Validating configuration");

    let errors = collect_errors(&loaded);

    if ctx.is_json() {
        let json = serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": ctx.config_path.display().to_string(),
            "errors": errors,
        });
        formatter.print_json(&json);
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", ctx.config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {}:",
            plural(errors.len() as u64, "error")
        ));
        formatter.info(&format!("File: {}", ctx.config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.error(&format!("  {error}"));
        }
    }

    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_CONFIG)
    }
}
