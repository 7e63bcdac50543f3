//! Configuration for the strata chunk store.
//!
//! Settings persist to disk as `strata.ron` and can be overridden from the
//! command line. Every section defaults independently, so older or partial
//! files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE, Config, DebugConfig, LightingConfig, PersistenceConfig, WorldConfig,
};
pub use error::ConfigError;
