//! Subcommands of the `sp2blob` binary

pub mod config;
pub mod copy;

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use sp2blob_core::config::Config;

use crate::output::OutputFormat;

/// Exit code for an invalid or unreadable configuration
pub const EXIT_CONFIG: u8 = 2;

/// State shared by every subcommand, built once in `main`
pub struct CommandContext {
    pub format: OutputFormat,
    pub quiet: bool,
    /// File the configuration was read from
    pub config_path: PathBuf,
    /// Result of loading that file
    pub loaded: Result<Config>,
}

impl CommandContext {
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Takes the loaded configuration, or the load error
    pub fn take_config(&mut self) -> Result<Config> {
        std::mem::replace(&mut self.loaded, Err(anyhow!("configuration already taken")))
    }
}
