//! The config file on disk
//!
//! Writes go to a temp file in the target directory and are renamed over
//! `config.toml`; the file being replaced is copied to `config.toml.backup`.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub(crate) struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn backup_path(&self) -> PathBuf {
        self.path.with_extension("toml.backup")
    }

    /// Reads the file; a missing file reads as defaults
    ///
    /// Out-of-range values are logged and kept so a hand-edited file is
    /// never discarded. Saving such a config is refused.
    pub(crate) fn read(&self) -> ConfigResult<Config> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", self.path.display());
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            return Err(ConfigError::Empty {
                path: self.path.clone(),
            });
        }

        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if config.version > CONFIG_VERSION {
            log::warn!(
                "{} has format version {}, this build reads {}; unknown keys are ignored",
                self.path.display(),
                config.version,
                CONFIG_VERSION
            );
        }
        if let Err(errors) = config.validate() {
            for error in &errors {
                log::warn!("{}: {}", self.path.display(), error);
            }
        }

        Ok(config)
    }

    /// Validates and atomically replaces the file
    ///
    /// Returns the backup path when an existing file was copied aside.
    pub(crate) fn write(&self, config: &Config) -> ConfigResult<Option<PathBuf>> {
        config.validate().map_err(ConfigError::Invalid)?;
        let text = config.to_toml()?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let backup = self.copy_aside()?;

        let write_err = |source: std::io::Error| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(text.as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(&self.path).map_err(|e| write_err(e.error))?;

        log::info!("Saved config to {}", self.path.display());
        Ok(backup)
    }

    fn copy_aside(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup = self.backup_path();
        fs::copy(&self.path, &backup).map_err(|source| ConfigError::Write {
            path: backup.clone(),
            source,
        })?;
        log::debug!("Copied previous config to {}", backup.display());
        Ok(Some(backup))
    }
}
