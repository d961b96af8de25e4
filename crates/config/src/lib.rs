//! Earshot configuration
//!
//! Settings live in a single TOML file split into sections. Each section is a
//! type implementing [`ConfigSection`], so it validates itself and accepts
//! values by dotted key (`player.skip_forward_secs`).
//!
//! - Missing files load as defaults
//! - Invalid values are reported as warnings on load and rejected on save
//! - Saves are atomic and keep a `.backup` of the previous file
//!
//! # Example
//!
//! ```rust,no_run
//! use earshot_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Skip forward: {}s", config.player.skip_forward_secs);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

pub mod app_config;
mod player_config;

pub use error::{ConfigError, ConfigResult};
pub use manager::ConfigManager;
pub use validation::{ConfigSection, ValidationError, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use player_config::PlayerConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Playback session preferences
    pub player: PlayerConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates every section, returning all errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.player.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Sets one value by dotted key, e.g. `set("player.default_volume", "80")`
    ///
    /// The value is parsed for the field's type but not range checked;
    /// call [`Config::validate`] afterwards.
    pub fn set(&mut self, key: &str, raw: &str) -> ConfigResult<()> {
        match key.split_once('.') {
            Some((section, field)) if section == AppConfig::NAME => self.app.set_field(field, raw),
            Some((section, field)) if section == PlayerConfig::NAME => {
                self.player.set_field(field, raw)
            }
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    /// Every dotted key [`Config::set`] accepts
    pub fn keys() -> impl Iterator<Item = String> {
        let app = AppConfig::FIELDS
            .iter()
            .map(|field| format!("{}.{}", AppConfig::NAME, field));
        let player = PlayerConfig::FIELDS
            .iter()
            .map(|field| format!("{}.{}", PlayerConfig::NAME, field));
        app.chain(player)
    }

    /// The config as it is written to disk
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}
