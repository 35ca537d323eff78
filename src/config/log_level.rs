use serde::{Deserialize, Serialize};
use std::fmt;

/// Logging level for the client.
///
/// Used as the filter when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors.
    Error,

    /// Warnings and errors, including failed player commands.
    Warn,

    /// Connection changes and discovery results (default level).
    #[default]
    Info,

    /// Every signal and skipped property.
    Debug,

    /// Everything, including span entry and exit.
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}
