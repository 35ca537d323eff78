use std::{fs, io::ErrorKind, path::Path};

use tracing::{debug, instrument};

use super::{ClientConfig, ConfigError, ConfigPaths};

impl ClientConfig {
    /// Load the configuration from the default location.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns error if the config directory cannot be located, or the file
    /// exists but cannot be read, parsed or validated
    pub fn load() -> Result<Self, ConfigError> {
        let path = ConfigPaths::main_config()?;
        Self::load_from(&path)
    }

    /// Load the configuration from `path`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read, parsed or
    /// validated
    #[instrument]
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::IoError {
                    path: path.to_path_buf(),
                    details: e.to_string(),
                });
            }
        };

        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::toml_parse(e, Some(path)))?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML or fails validation
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::toml_parse(e, None))?;
        config.validate()?;

        Ok(config)
    }

    /// Check value ranges serde cannot express
    ///
    /// # Errors
    /// Returns the first field with an unusable value
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("tick_interval_ms", self.tick_interval_ms),
            ("resync_interval_ms", self.resync_interval_ms),
            ("bind_timeout_ms", self.bind_timeout_ms),
            ("discovery_timeout_ms", self.discovery_timeout_ms),
        ];

        for (field, value) in intervals {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }

        if self
            .preferred_player
            .as_deref()
            .is_some_and(|player| player.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "preferred_player",
                "must not be empty when set",
            ));
        }

        Ok(())
    }
}
