use std::sync::Arc;

use super::{LoopStatus, Metadata, PlaybackStatus};

/// Notification raised by the client.
///
/// Delivered through [`MprisClient::events`](super::MprisClient::events)
/// after the dispatcher has applied the underlying change, never from
/// inside a command call.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A player was bound (`true`) or the binding was lost (`false`)
    Connection(bool),

    /// Playback status changed
    PlaybackStatus(PlaybackStatus),

    /// Periodic position estimate in microseconds while playing
    PlaybackTick(i64),

    /// New track or updated tags
    Metadata(Arc<Metadata>),

    /// Volume changed
    Volume(f64),

    /// Loop mode changed; only raised when the player reports one
    LoopStatus(LoopStatus),

    /// Shuffle changed; only raised when the player reports it
    Shuffle(bool),

    /// Player jumped to a new position in microseconds
    Position(i64),

    /// Playback rate changed
    Rate(f64),

    /// Fullscreen state changed
    Fullscreen(bool),

    /// One or more capability flags changed
    CapabilitiesChanged,

    /// A player appeared or disappeared; carries the current bus names
    PlayersChanged(Vec<String>),
}

impl ClientEvent {
    /// Short name for logs and the command line
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::PlaybackStatus(_) => "playback_status",
            Self::PlaybackTick(_) => "playback_tick",
            Self::Metadata(_) => "metadata",
            Self::Volume(_) => "volume",
            Self::LoopStatus(_) => "loop_status",
            Self::Shuffle(_) => "shuffle",
            Self::Position(_) => "position",
            Self::Rate(_) => "rate",
            Self::Fullscreen(_) => "fullscreen",
            Self::CapabilitiesChanged => "capabilities",
            Self::PlayersChanged(_) => "players",
        }
    }
}
