//! Configuration manager - main API for config operations

use crate::persistence::ConfigFile;
use crate::{Config, ConfigError, ConfigResult, ValidationError};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "EARSHOT";

/// Loads, saves and locates the configuration file
pub struct ConfigManager {
    file: ConfigFile,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a config manager using the platform config directory
    ///
    /// - Linux: `~/.config/earshot/`
    /// - macOS: `~/Library/Application Support/earshot/`
    /// - Windows: `%APPDATA%\earshot\`
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("", "", "earshot").ok_or(ConfigError::NoConfigDir)?;
        Self::with_directory(dirs.config_dir().to_path_buf())
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        Ok(Self {
            file: ConfigFile::new(config_dir.join("config.toml")),
            config_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Path {
        self.file.path()
    }

    /// Where the catalog lives; relative paths are taken from the config directory
    pub fn catalog_path(&self, config: &Config) -> PathBuf {
        if config.app.catalog_path.is_absolute() {
            config.app.catalog_path.clone()
        } else {
            self.config_dir.join(&config.app.catalog_path)
        }
    }

    /// Loads the configuration file, or defaults when there is none
    pub fn load(&self) -> ConfigResult<Config> {
        self.file.read()
    }

    /// Validates and atomically writes the configuration
    ///
    /// Returns where the previous file was copied, if there was one.
    pub fn save(&self, config: &Config) -> ConfigResult<Option<PathBuf>> {
        self.file.write(config)
    }

    /// Loads, applies `update_fn` and saves the result
    ///
    /// Nothing is written when `update_fn` or validation fails.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use earshot_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.player.skip_forward_secs = 45;
    ///     Ok(())
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<Option<PathBuf>>
    where
        F: FnOnce(&mut Config) -> ConfigResult<()>,
    {
        let mut config = self.load()?;
        update_fn(&mut config)?;
        self.save(&config)
    }

    /// Sets one dotted key in the config file
    pub fn set(&self, key: &str, value: &str) -> ConfigResult<Option<PathBuf>> {
        self.update(|config| config.set(key, value))
    }

    /// Writes a default config file if there is none yet
    ///
    /// Returns true when a file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.file.path().exists() {
            log::info!("Config already present at {}", self.file.path().display());
            return Ok(false);
        }
        self.save(&Config::default())?;
        Ok(true)
    }

    /// Replaces the config file with defaults, keeping a backup of the old one
    pub fn reset(&self) -> ConfigResult<Option<PathBuf>> {
        self.save(&Config::default())
    }

    /// Problems in the file as written, without env overrides
    pub fn validate(&self) -> ConfigResult<Vec<ValidationError>> {
        Ok(self.load()?.validate().err().unwrap_or_default())
    }

    /// Loads the config and applies `EARSHOT_SECTION_FIELD` environment overrides
    ///
    /// Example: `EARSHOT_PLAYER_SKIP_FORWARD_SECS=45`
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            for error in errors {
                log::warn!("After environment overrides: {}", error);
            }
        }

        Ok(config)
    }
}

/// `player.skip_forward_secs` -> `EARSHOT_PLAYER_SKIP_FORWARD_SECS`
fn env_var_name(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.replace('.', "_").to_ascii_uppercase())
}

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    for key in Config::keys() {
        let var = env_var_name(&key);
        if let Some(raw) = lookup(&var) {
            if let Err(e) = config.set(&key, &raw) {
                log::warn!("Ignoring {}: {}", var, e);
            }
        }
    }
}
