//! Command-line overrides for the chunk store.

use std::path::PathBuf;

use clap::Args;

use crate::Config;

/// Settings that can be overridden from the command line.
///
/// Flattened into a binary's own parser; values override `strata.ron`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    /// Ceiling on live chunks.
    #[arg(long, global = true)]
    pub max_chunks: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Directory holding save files.
    #[arg(long, global = true)]
    pub save_dir: Option<PathBuf>,

    /// Path to config directory (overrides default location).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Config directory to load from: `--config` or the platform default.
    pub fn config_dir(&self) -> Result<PathBuf, crate::ConfigError> {
        match &self.config {
            Some(dir) => Ok(dir.clone()),
            None => Config::default_dir(),
        }
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(max) = args.max_chunks {
            self.world.max_chunks = max;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref dir) = args.save_dir {
            self.persistence.save_dir = Some(dir.clone());
        }
    }
}
