use std::{
    env,
    io::{Error, ErrorKind},
    path::PathBuf,
};

const APP_DIR: &str = "mpris2-client";

/// Locations of the client's files
///
/// Follows the XDG Base Directory specification
pub struct ConfigPaths;

impl ConfigPaths {
    /// Returns the configuration directory path for the application
    ///
    /// Follows the XDG Base Directory specification:
    /// - First checks `XDG_CONFIG_HOME`
    /// - Falls back to `$HOME/.config`
    /// - Appends "mpris2-client" to the base config directory
    ///
    /// # Errors
    /// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` environment variables are set
    pub fn config_dir() -> Result<PathBuf, Error> {
        let config_home = env::var("XDG_CONFIG_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.config")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_CONFIG_HOME nor HOME environment variable found",
                )
            })?;

        Ok(PathBuf::from(config_home).join(APP_DIR))
    }

    /// Returns the state directory, `$XDG_STATE_HOME/mpris2-client` or
    /// `$HOME/.local/state/mpris2-client`
    ///
    /// # Errors
    /// Returns an error if neither `XDG_STATE_HOME` nor `HOME` is set
    pub fn state_dir() -> Result<PathBuf, Error> {
        let state_home = env::var("XDG_STATE_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.local/state")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_STATE_HOME nor HOME environment variable found",
                )
            })?;

        Ok(PathBuf::from(state_home).join(APP_DIR))
    }

    /// Get the log directory
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    /// Returns error if directory cannot be located or created
    pub fn log_dir() -> Result<PathBuf, Error> {
        let log_dir = Self::state_dir()?.join("logs");

        if !log_dir.exists() {
            std::fs::create_dir_all(&log_dir)?;
        }

        Ok(log_dir)
    }

    /// Path of the main configuration file
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be located
    pub fn main_config() -> Result<PathBuf, Error> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Path of the runtime state file
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be located
    pub fn runtime_state() -> Result<PathBuf, Error> {
        Ok(Self::config_dir()?.join("runtime-state.json"))
    }
}
