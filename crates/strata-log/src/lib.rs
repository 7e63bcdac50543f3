//! Structured logging for the strata crates.
//!
//! Library crates only emit `tracing` events; binaries call [`init_logging`]
//! once to install a subscriber. Console output carries uptime, target and
//! level. Debug builds can additionally write JSON lines to `strata.log` for
//! post-mortem analysis of load and save runs.

use std::path::{Path, PathBuf};

use strata_config::Config;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE: &str = "strata.log";

/// Where log output ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOutputs {
    /// Effective filter directive.
    pub filter: String,
    /// JSON log file, if one was opened.
    pub file: Option<PathBuf>,
}

/// Filter directive for a config: its `debug.log_level`, or
/// [`DEFAULT_FILTER`] when absent or blank.
pub fn filter_directive(config: Option<&Config>) -> String {
    config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the config's log level. With
/// `debug_build` set and a writable `log_dir`, a JSON file layer is added;
/// failing to open the file only disables that layer.
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use strata_config::Config;
/// use strata_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config)).ok();
/// ```
pub fn init_logging(
    log_dir: Option<&Path>,
    debug_build: bool,
    config: Option<&Config>,
) -> Result<LogOutputs, TryInitError> {
    let directive = filter_directive(config);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));
    let filter = env_filter.to_string();

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).try_init()?;
        return Ok(LogOutputs {
            filter,
            file: Some(log_dir.join(LOG_FILE)),
        });
    }

    subscriber.try_init()?;
    Ok(LogOutputs { filter, file: None })
}
