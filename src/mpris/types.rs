use std::fmt;

use serde::{Deserialize, Serialize};

use super::MprisError;
use crate::bus::MPRIS_PREFIX;

/// Current playback status of a media player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// A track is currently playing
    Playing,

    /// A track is currently paused
    Paused,

    /// There is no track currently playing
    #[default]
    Stopped,
}

impl PlaybackStatus {
    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        }
    }
}

impl TryFrom<&str> for PlaybackStatus {
    type Error = MprisError;

    fn try_from(status: &str) -> Result<Self, Self::Error> {
        match status {
            "Playing" => Ok(Self::Playing),
            "Paused" => Ok(Self::Paused),
            "Stopped" => Ok(Self::Stopped),
            other => Err(MprisError::MalformedPayload {
                property: "PlaybackStatus".to_string(),
                reason: format!("unknown status '{other}'"),
            }),
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loop / repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopStatus {
    /// Playback stops when there are no more tracks to play
    #[default]
    None,

    /// The current track starts again from the beginning once finished
    Track,

    /// Playback loops through the list of tracks
    Playlist,
}

impl LoopStatus {
    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Track => "Track",
            Self::Playlist => "Playlist",
        }
    }

    /// Next mode in the cycle None → Track → Playlist → None
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Track,
            Self::Track => Self::Playlist,
            Self::Playlist => Self::None,
        }
    }
}

impl TryFrom<&str> for LoopStatus {
    type Error = MprisError;

    fn try_from(status: &str) -> Result<Self, Self::Error> {
        match status {
            "None" => Ok(Self::None),
            "Track" => Ok(Self::Track),
            "Playlist" => Ok(Self::Playlist),
            other => Err(MprisError::MalformedPayload {
                property: "LoopStatus".to_string(),
                reason: format!("unknown loop status '{other}'"),
            }),
        }
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding state of the client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindState {
    /// No player bound
    #[default]
    Unbound,

    /// Initial property fetch and signal subscription in progress
    Binding,

    /// Player bound and signals flowing
    Bound,
}

/// Identity of a discovered player
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerRef {
    /// Well-known D-Bus name, e.g. `org.mpris.MediaPlayer2.vlc`
    pub bus_name: String,

    /// Human-readable player name
    pub identity: String,

    /// Desktop entry id without the `.desktop` suffix
    pub desktop_entry: Option<String>,
}

impl PlayerRef {
    /// Player known only by its bus name; identity falls back to the short name
    pub fn from_bus_name(bus_name: &str) -> Self {
        let mut player = Self {
            bus_name: bus_name.to_string(),
            identity: String::new(),
            desktop_entry: None,
        };
        player.identity = player.short_name().to_string();
        player
    }

    /// Bus name with the MPRIS prefix stripped, e.g. `vlc.instance42`
    pub fn short_name(&self) -> &str {
        self.bus_name
            .strip_prefix(MPRIS_PREFIX)
            .unwrap_or(&self.bus_name)
    }

    /// Whether `query` designates this player.
    ///
    /// Accepts the full bus name, the short name, a short name without its
    /// instance suffix (`vlc` matches `vlc.instance42`) or the identity,
    /// compared case-insensitively.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }

        if self.bus_name == query {
            return true;
        }

        let short = self.short_name();
        let wanted = query.strip_prefix(MPRIS_PREFIX).unwrap_or(query);

        short == wanted
            || short
                .strip_prefix(wanted)
                .is_some_and(|rest| rest.starts_with('.'))
            || self.identity.eq_ignore_ascii_case(query)
    }
}

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identity, self.bus_name)
    }
}
