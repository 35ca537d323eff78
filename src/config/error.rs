use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Errors raised while locating, reading or validating the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration field has an unusable value
    #[error("invalid config field '{field}': {reason}")]
    InvalidConfigField {
        /// The field that is invalid
        field: String,
        /// Reason why the field is invalid
        reason: String,
    },

    /// I/O operation error
    #[error("I/O error on '{path}': {details}")]
    IoError {
        /// Path where I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// Config directory cannot be determined
    #[error("cannot locate config directory: {0}")]
    NoConfigDir(#[from] io::Error),

    /// TOML parsing error with location context
    #[error("failed to parse TOML at '{location}': {details}")]
    TomlParseError {
        /// Location of TOML being parsed (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },
}

impl ConfigError {
    /// Creates a TOML parsing error with optional file path context.
    pub fn toml_parse(error: impl fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => p.to_string_lossy().to_string(),
            None => "string".to_string(),
        };

        ConfigError::TomlParseError {
            location,
            details: error.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidConfigField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
