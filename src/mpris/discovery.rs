use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{MprisError, PlayerRef};
use crate::bus::{Bus, MPRIS_PREFIX, ROOT_INTERFACE};

/// Enumerates MPRIS players on the bus
#[derive(Clone)]
pub(crate) struct Discovery {
    bus: Arc<dyn Bus>,
    ignored_players: Vec<String>,
    timeout: Duration,
}

impl Discovery {
    pub(crate) fn new(bus: Arc<dyn Bus>, ignored_players: Vec<String>, timeout: Duration) -> Self {
        Self {
            bus,
            ignored_players,
            timeout,
        }
    }

    /// Whether `bus_name` matches one of the configured ignore patterns
    pub(crate) fn should_ignore_player(&self, bus_name: &str) -> bool {
        self.ignored_players
            .iter()
            .any(|pattern| !pattern.is_empty() && bus_name.contains(pattern.as_str()))
    }

    /// Bus names of every non-ignored player, in bus order
    ///
    /// # Errors
    /// Returns error if the bus cannot list names in time
    pub(crate) async fn list_names(&self) -> Result<Vec<String>, MprisError> {
        let names = timeout(self.timeout, self.bus.list_names(MPRIS_PREFIX))
            .await
            .map_err(|_| MprisError::Timeout {
                operation: "list players".to_string(),
            })??;

        Ok(names
            .into_iter()
            .filter(|name| !self.should_ignore_player(name))
            .collect())
    }

    /// Every non-ignored player, enriched with identity and desktop entry
    ///
    /// # Errors
    /// Returns error if the bus cannot list names in time
    #[instrument(skip(self))]
    pub(crate) async fn list_players(&self) -> Result<Vec<PlayerRef>, MprisError> {
        let names = self.list_names().await?;
        let players = join_all(names.iter().map(|name| self.describe(name))).await;

        info!(count = players.len(), "Discovered MPRIS players");
        Ok(players)
    }

    async fn describe(&self, bus_name: &str) -> PlayerRef {
        let mut player = PlayerRef::from_bus_name(bus_name);

        match timeout(self.timeout, self.bus.get_all(bus_name, ROOT_INTERFACE)).await {
            Ok(Ok(root)) => {
                if let Some(identity) = root
                    .get("Identity")
                    .and_then(|value| value.as_str())
                    .filter(|identity| !identity.trim().is_empty())
                {
                    player.identity = identity.to_string();
                }
                player.desktop_entry = root
                    .get("DesktopEntry")
                    .and_then(|value| value.as_str())
                    .filter(|entry| !entry.is_empty())
                    .map(ToString::to_string);
            }
            Ok(Err(e)) => debug!(player = bus_name, error = %e, "Cannot read player identity"),
            Err(_) => warn!(player = bus_name, "Timed out reading player identity"),
        }

        player
    }
}

/// Pick the player to bind: the preference when it is present, else the
/// first one.
pub(crate) fn select_player<'a>(
    players: &'a [PlayerRef],
    preferred: Option<&str>,
) -> Option<&'a PlayerRef> {
    preferred
        .and_then(|query| players.iter().find(|player| player.matches(query)))
        .or_else(|| players.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> Vec<PlayerRef> {
        vec![
            PlayerRef::from_bus_name("org.mpris.MediaPlayer2.spotify"),
            PlayerRef::from_bus_name("org.mpris.MediaPlayer2.vlc.instance7"),
        ]
    }

    #[test]
    fn preference_wins_when_present() {
        let players = players();
        let selected = select_player(&players, Some("vlc")).map(|p| p.bus_name.as_str());
        assert_eq!(selected, Some("org.mpris.MediaPlayer2.vlc.instance7"));
    }

    #[test]
    fn falls_back_to_first_player() {
        let players = players();
        let selected = select_player(&players, Some("mpv")).map(|p| p.bus_name.as_str());
        assert_eq!(selected, Some("org.mpris.MediaPlayer2.spotify"));
        assert!(select_player(&[], None).is_none());
    }
}
