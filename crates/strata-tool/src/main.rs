//! Command-line maintenance for strata save files.
//!
//! `inspect` prints what a save holds; `upgrade` re-encodes a save of any
//! readable version in the current format.

mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use strata_config::{CliArgs, Config, ConfigError};
use strata_persist::{PersistError, PersistenceCodec, supported_versions};
use tracing::info;

use crate::report::SaveSummary;

#[derive(Parser, Debug)]
#[command(name = "strata-tool", about = "Inspect and upgrade strata save files")]
struct ToolArgs {
    #[command(flatten)]
    overrides: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the header, tables and counts of a save file
    Inspect {
        /// Save file (defaults to the configured save path)
        file: Option<PathBuf>,
        /// Chunk edge length the save must have been written for
        #[arg(long, default_value_t = 16)]
        chunk_edge: u8,
    },
    /// Re-encode a save in the current format version
    Upgrade {
        /// Save file to read
        input: PathBuf,
        /// Where to write the upgraded save
        output: PathBuf,
        /// Chunk edge length the save must have been written for
        #[arg(long, default_value_t = 16)]
        chunk_edge: u8,
    },
}

/// Failures surfaced to the command line.
#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
}

fn main() -> ExitCode {
    let args = ToolArgs::parse();

    let mut config = match &args.overrides.config {
        Some(dir) => match Config::load_or_create(dir) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    config.apply_cli_overrides(&args.overrides);

    if let Err(e) = strata_log::init_logging(None, cfg!(debug_assertions), Some(&config)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = match args.command {
        Command::Inspect { file, chunk_edge } => inspect(&config, file, chunk_edge),
        Command::Upgrade {
            input,
            output,
            chunk_edge,
        } => upgrade(&input, &output, chunk_edge),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_save(path: &Path) -> Result<Vec<u8>, ToolError> {
    std::fs::read(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn inspect(config: &Config, file: Option<PathBuf>, chunk_edge: u8) -> Result<(), ToolError> {
    let path = match file {
        Some(path) => path,
        None => config.persistence.save_path()?,
    };
    let bytes = read_save(&path)?;
    let snapshot = PersistenceCodec::with_chunk_edge(chunk_edge)
        .decode(&bytes)
        .map_err(|source| ToolError::Persist {
            path: path.clone(),
            source,
        })?;

    println!("{}", path.display());
    println!("{}", SaveSummary::of(&snapshot));
    info!(
        "Readable format versions: {:?}",
        supported_versions().collect::<Vec<_>>()
    );
    Ok(())
}

fn upgrade(input: &Path, output: &Path, chunk_edge: u8) -> Result<(), ToolError> {
    let bytes = read_save(input)?;
    let upgraded = PersistenceCodec::with_chunk_edge(chunk_edge)
        .upgrade(&bytes)
        .map_err(|source| ToolError::Persist {
            path: input.to_path_buf(),
            source,
        })?;
    std::fs::write(output, &upgraded).map_err(|source| ToolError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    info!(
        "Upgraded {} (version {}) to {} ({} bytes)",
        input.display(),
        bytes.first().copied().unwrap_or_default(),
        output.display(),
        upgraded.len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
