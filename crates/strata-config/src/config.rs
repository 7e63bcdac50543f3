//! Configuration sections with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the config file inside the config directory.
pub const CONFIG_FILE: &str = "strata.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Chunk pool and address space.
    pub world: WorldConfig,
    /// Light queries.
    pub lighting: LightingConfig,
    /// Save file location.
    pub persistence: PersistenceConfig,
    /// Logging.
    pub debug: DebugConfig,
}

/// Chunk pool and address space settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Ceiling on live chunks. Must cover the view distance.
    pub max_chunks: usize,
    /// Addressable half-extents in chunk units per axis.
    pub extents: [i32; 3],
    /// Initial distance anchor for reclamation, in chunk coordinates.
    pub anchor: [i32; 3],
}

/// Light query settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// When disabled every light query returns full brightness.
    pub global_illumination: bool,
}

/// Save file settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Directory holding save files. `None` uses the platform data directory.
    pub save_dir: Option<PathBuf>,
    /// Save file name inside `save_dir`.
    pub file_name: String,
}

/// Debug/development settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g. "debug", "info,strata_persist=trace").
    pub log_level: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_chunks: 4096,
            extents: [1024, 64, 1024],
            anchor: [0, 0, 0],
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            global_illumination: true,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_dir: None,
            file_name: "world.sav".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl PersistenceConfig {
    /// Directory saves are written to.
    pub fn resolved_save_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.save_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("strata").join("saves"))
                .ok_or(ConfigError::NoPlatformDir("data")),
        }
    }

    /// Full path of the save file.
    pub fn save_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.resolved_save_dir()?.join(&self.file_name))
    }
}

impl Config {
    /// Platform config directory (`<config_dir>/strata`).
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join("strata"))
            .ok_or(ConfigError::NoPlatformDir("config"))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as [`CONFIG_FILE`].
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Rejects settings the chunk store cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.max_chunks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "world.max_chunks",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(axis) = self.world.extents.iter().position(|&e| e <= 0) {
            return Err(ConfigError::InvalidValue {
                field: "world.extents",
                reason: format!("axis {axis} must be positive"),
            });
        }
        let volume = self
            .world
            .extents
            .iter()
            .try_fold(1u64, |acc, &e| acc.checked_mul(2 * e as u64));
        if volume.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "world.extents",
                reason: "chunk coordinate space exceeds 64-bit keys".to_string(),
            });
        }
        if self.persistence.file_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persistence.file_name",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let ron_str =
            ron::ser::to_string_pretty(&Config::default(), ron::ser::PrettyConfig::new()).unwrap();
        assert!(ron_str.contains("max_chunks: 4096"));
        assert!(ron_str.contains("file_name: \"world.sav\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.persistence.save_dir = Some(PathBuf::from("/tmp/strata"));
        config.world.anchor = [3, -1, 7];
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(world: (max_chunks: 64))").unwrap();
        assert_eq!(config.world.max_chunks, 64);
        assert_eq!(config.world.extents, [1024, 64, 1024]);
        assert_eq!(config.lighting, LightingConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.world.max_chunks = 512;
        config.lighting.global_illumination = false;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.debug.log_level = "debug".to_string();
        modified.save(dir.path()).unwrap();

        let reloaded = config.reload(dir.path()).unwrap().unwrap();
        assert_eq!(reloaded.debug.log_level, "debug");
        assert!(modified.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_explicit_save_dir_wins() {
        let persistence = PersistenceConfig {
            save_dir: Some(PathBuf::from("saves")),
            file_name: "slot1.sav".to_string(),
        };
        assert_eq!(persistence.save_path().unwrap(), PathBuf::from("saves/slot1.sav"));
    }

    #[test]
    fn test_validate_rejects_unusable_world() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.world.max_chunks = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "world.max_chunks", .. })
        ));

        let mut config = Config::default();
        config.world.extents = [8, 0, 8];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "world.extents", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unaddressable_extents() {
        let mut config = Config::default();
        config.world.extents = [1 << 20, 1 << 20, 1 << 20];
        assert!(config.validate().is_ok());

        config.world.extents = [1 << 22, 1 << 22, 1 << 22];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "world.extents", .. })
        ));
    }
}
