//! Validation and key access for configuration sections
//!
//! Each section implements [`ConfigSection`]; the [`Validator`] helpers
//! produce field-level [`ValidationError`]s that sections collect.

use crate::{ConfigError, ConfigResult};
use std::fmt;
use std::str::FromStr;

/// A named table in the config file
pub trait ConfigSection: Default {
    /// Table name, also the first part of a dotted key (`player.default_volume`)
    const NAME: &'static str;

    /// Field names accepted by [`ConfigSection::set_field`]
    const FIELDS: &'static [&'static str];

    /// Validates the section, returning every problem found
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Parses `raw` into the named field
    fn set_field(&mut self, field: &str, raw: &str) -> ConfigResult<()>;
}

/// A problem with one config field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted key of the field, e.g. `player.skip_forward_secs`
    pub field: String,
    pub message: String,
    /// The rejected value, when there is one to show
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::new(field, message)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} (got {})", self.field, self.message, value),
            None => write!(f, "{} {}", self.field, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within an inclusive range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Keeps the failures out of a list of checks
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Parses a raw string into `target`, leaving it untouched on failure
pub(crate) fn parse_field<T: FromStr>(
    section: &str,
    field: &str,
    raw: &str,
    target: &mut T,
) -> ConfigResult<()> {
    *target = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: format!("{}.{}", section, field),
            value: raw.to_string(),
        })?;
    Ok(())
}

pub(crate) fn unknown_field(section: &str, field: &str) -> ConfigError {
    ConfigError::UnknownKey(format!("{}.{}", section, field))
}
