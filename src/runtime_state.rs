use std::{
    io::{Error, ErrorKind},
    path::Path,
    time::SystemTime,
};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::config::ConfigPaths;

/// State that persists between command-line invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Bus name of the player bound last
    pub last_player: Option<String>,

    /// Last time this state was updated
    pub last_updated: SystemTime,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            last_player: None,
            last_updated: SystemTime::now(),
        }
    }
}

impl RuntimeState {
    /// Load runtime state from the default location.
    ///
    /// Missing or unreadable state yields the defaults.
    pub async fn load() -> Self {
        match ConfigPaths::runtime_state() {
            Ok(path) => Self::load_from(&path).await,
            Err(e) => {
                warn!(error = %e, "Cannot locate runtime state, using defaults");
                Self::default()
            }
        }
    }

    /// Load runtime state from `path`.
    ///
    /// Missing or unreadable state yields the defaults.
    #[instrument]
    pub async fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No runtime state file found");
                return Self::default();
            }
            Err(e) => {
                warn!(error = %e, "Cannot read runtime state, using defaults");
                return Self::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid runtime state file, using defaults");
            Self::default()
        })
    }

    /// Save runtime state to the default location
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub async fn save(&self) -> Result<(), Error> {
        let path = ConfigPaths::runtime_state()?;
        self.save_to(&path).await
    }

    /// Save runtime state to `path`
    ///
    /// # Errors
    /// Returns error if file cannot be written or directory cannot be created
    #[instrument(skip(self))]
    pub async fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self).map_err(Error::other)?;
        fs::write(path, content).await?;

        Ok(())
    }

    /// Remember `player` as the last bound player and persist.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn remember_player(player: &str) {
        let mut state = Self::load().await;
        if state.last_player.as_deref() == Some(player) {
            return;
        }

        state.last_player = Some(player.to_string());
        state.last_updated = SystemTime::now();
        if let Err(e) = state.save().await {
            warn!(error = %e, "Cannot save runtime state");
        }
    }
}
