//! Client configuration.
//!
//! Everything the client tunes at runtime lives in [`ClientConfig`], which
//! is read from `config.toml` in the application config directory. Every
//! field has a default, so a missing file or a partial file both work.

mod error;
mod loading;
mod log_level;
mod paths;

#[cfg(test)]
mod tests;

use std::time::Duration;

pub use error::ConfigError;
pub use log_level::LogLevel;
pub use paths::ConfigPaths;
use serde::{Deserialize, Serialize};

/// What a gated command does in strict mode when the player lacks the
/// capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Drop the command and return `Ok(())`
    #[default]
    Ignore,

    /// Return [`MprisError::UnsupportedOperation`](crate::mpris::MprisError)
    Reject,
}

/// Settings for [`MprisClient`](crate::mpris::MprisClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Player to bind when it is available (bus name, short name or identity)
    pub preferred_player: Option<String>,

    /// Bus name substrings of players discovery skips
    pub ignored_players: Vec<String>,

    /// Check capability flags before sending gated commands
    pub strict_mode: bool,

    /// Strict mode behaviour for unsupported commands
    pub unsupported_policy: UnsupportedPolicy,

    /// Period of position ticks while playing, in milliseconds
    pub tick_interval_ms: u64,

    /// Period of position reads from the player, in milliseconds
    pub resync_interval_ms: u64,

    /// Limit for subscribing to and fetching the initial state of a player
    pub bind_timeout_ms: u64,

    /// Limit for enumerating players and reading their identities
    pub discovery_timeout_ms: u64,

    /// Bind to another player automatically when the bound one goes away
    pub auto_reconnect: bool,

    /// Logging verbosity
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            preferred_player: None,
            ignored_players: Vec::new(),
            strict_mode: false,
            unsupported_policy: UnsupportedPolicy::default(),
            tick_interval_ms: 500,
            resync_interval_ms: 5_000,
            bind_timeout_ms: 3_000,
            discovery_timeout_ms: 2_000,
            auto_reconnect: true,
            log_level: LogLevel::default(),
        }
    }
}

impl ClientConfig {
    /// Position tick period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Position resync period
    pub fn resync_interval(&self) -> Duration {
        Duration::from_millis(self.resync_interval_ms)
    }

    /// Bind timeout
    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_timeout_ms)
    }

    /// Discovery timeout
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}
