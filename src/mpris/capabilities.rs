use std::fmt;

use tracing::debug;

use crate::bus::{MethodCall, PropMap, PropValue, PropertyWrite};

/// Client operation that may be gated by a capability flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Skip to the next track
    Next,
    /// Go back to the previous track
    Previous,
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Toggle play / pause
    PlayPause,
    /// Stop playback
    Stop,
    /// Relative seek
    Seek,
    /// Absolute seek
    SetPosition,
    /// Open a URI
    OpenUri,
    /// Bring the player window to front
    Raise,
    /// Ask the player to exit
    Quit,
    /// Change fullscreen
    SetFullscreen,
    /// Change volume
    SetVolume,
    /// Change loop mode
    SetLoopStatus,
    /// Change shuffle
    SetShuffle,
    /// Change playback rate
    SetRate,
}

impl Operation {
    /// Operation name used in errors and logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::PlayPause => "play_pause",
            Self::Stop => "stop",
            Self::Seek => "seek",
            Self::SetPosition => "set_position",
            Self::OpenUri => "open_uri",
            Self::Raise => "raise",
            Self::Quit => "quit",
            Self::SetFullscreen => "set_fullscreen",
            Self::SetVolume => "set_volume",
            Self::SetLoopStatus => "set_loop_status",
            Self::SetShuffle => "set_shuffle",
            Self::SetRate => "set_rate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&MethodCall> for Operation {
    fn from(call: &MethodCall) -> Self {
        match call {
            MethodCall::Previous => Self::Previous,
            MethodCall::Next => Self::Next,
            MethodCall::Pause => Self::Pause,
            MethodCall::PlayPause => Self::PlayPause,
            MethodCall::Stop => Self::Stop,
            MethodCall::Play => Self::Play,
            MethodCall::Seek { .. } => Self::Seek,
            MethodCall::SetPosition { .. } => Self::SetPosition,
            MethodCall::OpenUri { .. } => Self::OpenUri,
            MethodCall::Raise => Self::Raise,
            MethodCall::Quit => Self::Quit,
        }
    }
}

impl From<&PropertyWrite> for Operation {
    fn from(write: &PropertyWrite) -> Self {
        match write {
            PropertyWrite::Volume(_) => Self::SetVolume,
            PropertyWrite::LoopStatus(_) => Self::SetLoopStatus,
            PropertyWrite::Shuffle(_) => Self::SetShuffle,
            PropertyWrite::Rate(_) => Self::SetRate,
            PropertyWrite::Fullscreen(_) => Self::SetFullscreen,
        }
    }
}

/// Optional members the bound player exposes.
///
/// Filled wholesale from the initial `GetAll` snapshot of both interfaces;
/// every flag reads `false` (rates `0.0`, lists empty) until then.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    can_quit: bool,
    can_raise: bool,
    can_set_fullscreen: bool,
    has_track_list: bool,
    supported_uri_schemes: Vec<String>,
    supported_mime_types: Vec<String>,

    can_go_next: bool,
    can_go_previous: bool,
    can_play: bool,
    can_pause: bool,
    can_seek: bool,
    can_control: bool,
    has_loop_status: bool,
    has_shuffle: bool,
    minimum_rate: f64,
    maximum_rate: f64,
}

impl Capabilities {
    /// Build the registry from the root and player interface snapshots
    pub fn from_snapshot(root: &PropMap, player: &PropMap) -> Self {
        let mut capabilities = Self::default();

        for (name, value) in root.iter().chain(player.iter()) {
            capabilities.apply(name, value);
        }

        capabilities
    }

    /// Apply a changed property. Returns whether any flag changed.
    ///
    /// Names that are not capabilities are ignored.
    pub fn apply(&mut self, name: &str, value: &PropValue) -> bool {
        let before = self.clone();

        let decoded = match name {
            "CanQuit" => value.as_bool().map(|v| self.can_quit = v),
            "CanRaise" => value.as_bool().map(|v| self.can_raise = v),
            "CanSetFullscreen" => value.as_bool().map(|v| self.can_set_fullscreen = v),
            "HasTrackList" => value.as_bool().map(|v| self.has_track_list = v),
            "SupportedUriSchemes" => value
                .as_string_list()
                .map(|v| self.supported_uri_schemes = v),
            "SupportedMimeTypes" => value
                .as_string_list()
                .map(|v| self.supported_mime_types = v),
            "CanGoNext" => value.as_bool().map(|v| self.can_go_next = v),
            "CanGoPrevious" => value.as_bool().map(|v| self.can_go_previous = v),
            "CanPlay" => value.as_bool().map(|v| self.can_play = v),
            "CanPause" => value.as_bool().map(|v| self.can_pause = v),
            "CanSeek" => value.as_bool().map(|v| self.can_seek = v),
            "CanControl" => value.as_bool().map(|v| self.can_control = v),
            "MinimumRate" => value.as_f64().map(|v| self.minimum_rate = v),
            "MaximumRate" => value.as_f64().map(|v| self.maximum_rate = v),
            "LoopStatus" => {
                self.has_loop_status = true;
                Some(())
            }
            "Shuffle" => {
                self.has_shuffle = true;
                Some(())
            }
            _ => Some(()),
        };

        if decoded.is_none() {
            debug!(property = name, ?value, "Ignoring capability with unexpected type");
        }

        *self != before
    }

    /// Whether the player accepts `Quit`
    pub fn can_quit(&self) -> bool {
        self.can_quit
    }

    /// Whether the player accepts `Raise`
    pub fn can_raise(&self) -> bool {
        self.can_raise
    }

    /// Whether `Fullscreen` is writable
    pub fn can_set_fullscreen(&self) -> bool {
        self.can_set_fullscreen
    }

    /// Whether the player implements the track list interface
    pub fn has_track_list(&self) -> bool {
        self.has_track_list
    }

    /// URI schemes accepted by `OpenUri`
    pub fn supported_uri_schemes(&self) -> &[String] {
        &self.supported_uri_schemes
    }

    /// MIME types the player can play
    pub fn supported_mime_types(&self) -> &[String] {
        &self.supported_mime_types
    }

    /// Whether `Next` does anything
    pub fn can_go_next(&self) -> bool {
        self.can_go_next
    }

    /// Whether `Previous` does anything
    pub fn can_go_previous(&self) -> bool {
        self.can_go_previous
    }

    /// Whether `Play` does anything
    pub fn can_play(&self) -> bool {
        self.can_play
    }

    /// Whether `Pause` does anything
    pub fn can_pause(&self) -> bool {
        self.can_pause
    }

    /// Whether `Seek` and `SetPosition` do anything
    pub fn can_seek(&self) -> bool {
        self.can_seek
    }

    /// Whether the player can be controlled at all
    pub fn can_control(&self) -> bool {
        self.can_control
    }

    /// Whether the player reports `LoopStatus`
    pub fn has_loop_status(&self) -> bool {
        self.has_loop_status
    }

    /// Whether the player reports `Shuffle`
    pub fn has_shuffle(&self) -> bool {
        self.has_shuffle
    }

    /// Lowest accepted playback rate, `0.0` when unreported
    pub fn minimum_rate(&self) -> f64 {
        self.minimum_rate
    }

    /// Highest accepted playback rate, `0.0` when unreported
    pub fn maximum_rate(&self) -> f64 {
        self.maximum_rate
    }

    /// Accepted rate range, if the player reported a sane one
    pub fn rate_bounds(&self) -> Option<(f64, f64)> {
        (self.maximum_rate > 0.0 && self.minimum_rate <= self.maximum_rate)
            .then_some((self.minimum_rate, self.maximum_rate))
    }

    /// Whether the capability flags allow `call`
    pub fn permits_call(&self, call: &MethodCall) -> bool {
        match call {
            MethodCall::Next => self.can_go_next,
            MethodCall::Previous => self.can_go_previous,
            MethodCall::Play => self.can_play,
            MethodCall::Pause | MethodCall::PlayPause => self.can_pause,
            MethodCall::Stop | MethodCall::OpenUri { .. } => self.can_control,
            MethodCall::Seek { .. } | MethodCall::SetPosition { .. } => self.can_seek,
            MethodCall::Raise => self.can_raise,
            MethodCall::Quit => self.can_quit,
        }
    }

    /// Whether the capability flags allow `write`
    pub fn permits_write(&self, write: &PropertyWrite) -> bool {
        match write {
            PropertyWrite::Volume(_) => self.can_control,
            PropertyWrite::LoopStatus(_) => self.has_loop_status && self.can_control,
            PropertyWrite::Shuffle(_) => self.has_shuffle && self.can_control,
            PropertyWrite::Fullscreen(_) => self.can_set_fullscreen,
            PropertyWrite::Rate(rate) => {
                self.can_control
                    && self
                        .rate_bounds()
                        .is_some_and(|(min, max)| (min..=max).contains(rate))
            }
        }
    }
}
