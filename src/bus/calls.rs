use std::fmt;

use super::{PLAYER_INTERFACE, ROOT_INTERFACE};
use crate::mpris::LoopStatus;

/// Method invocation on a player's MPRIS interfaces
#[derive(Debug, Clone, PartialEq)]
pub enum MethodCall {
    /// `Player.Previous`
    Previous,
    /// `Player.Next`
    Next,
    /// `Player.Pause`
    Pause,
    /// `Player.PlayPause`
    PlayPause,
    /// `Player.Stop`
    Stop,
    /// `Player.Play`
    Play,
    /// `Player.Seek` by a relative offset in microseconds
    Seek {
        /// Signed offset in microseconds
        offset: i64,
    },
    /// `Player.SetPosition` to an absolute position in microseconds
    SetPosition {
        /// Track the position applies to
        track_id: String,
        /// Absolute position in microseconds
        position: i64,
    },
    /// `Player.OpenUri`
    OpenUri {
        /// URI to open
        uri: String,
    },
    /// `MediaPlayer2.Raise`
    Raise,
    /// `MediaPlayer2.Quit`
    Quit,
}

impl MethodCall {
    /// Interface the method belongs to
    pub fn interface(&self) -> &'static str {
        match self {
            Self::Raise | Self::Quit => ROOT_INTERFACE,
            _ => PLAYER_INTERFACE,
        }
    }

    /// D-Bus member name
    pub fn member(&self) -> &'static str {
        match self {
            Self::Previous => "Previous",
            Self::Next => "Next",
            Self::Pause => "Pause",
            Self::PlayPause => "PlayPause",
            Self::Stop => "Stop",
            Self::Play => "Play",
            Self::Seek { .. } => "Seek",
            Self::SetPosition { .. } => "SetPosition",
            Self::OpenUri { .. } => "OpenUri",
            Self::Raise => "Raise",
            Self::Quit => "Quit",
        }
    }
}

impl fmt::Display for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.interface(), self.member())
    }
}

/// Write to a writable MPRIS property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyWrite {
    /// `Player.Volume`
    Volume(f64),
    /// `Player.LoopStatus`
    LoopStatus(LoopStatus),
    /// `Player.Shuffle`
    Shuffle(bool),
    /// `Player.Rate`
    Rate(f64),
    /// `MediaPlayer2.Fullscreen`
    Fullscreen(bool),
}

impl PropertyWrite {
    /// Interface the property belongs to
    pub fn interface(&self) -> &'static str {
        match self {
            Self::Fullscreen(_) => ROOT_INTERFACE,
            _ => PLAYER_INTERFACE,
        }
    }

    /// D-Bus property name
    pub fn property(&self) -> &'static str {
        match self {
            Self::Volume(_) => "Volume",
            Self::LoopStatus(_) => "LoopStatus",
            Self::Shuffle(_) => "Shuffle",
            Self::Rate(_) => "Rate",
            Self::Fullscreen(_) => "Fullscreen",
        }
    }
}

impl fmt::Display for PropertyWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.interface(), self.property())
    }
}
