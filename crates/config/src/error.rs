use crate::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file exists but holds nothing; never silently treated as defaults
    #[error("{} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Refused to write settings that fail validation
    #[error("invalid settings: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    /// Covers the config file, its backup, the temp file and the directory
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no config directory could be determined for this platform")]
    NoConfigDir,

    #[error("unknown setting '{0}'")]
    UnknownKey(String),

    #[error("'{value}' is not a valid value for {key}")]
    InvalidValue { key: String, value: String },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
