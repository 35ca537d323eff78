#![allow(missing_docs)]

use zbus::{Result, proxy, zvariant::ObjectPath};

/// `org.mpris.MediaPlayer2` root interface.
///
/// Only the members written through the proxy are declared; reads go through
/// a batched `GetAll`.
#[proxy(
    interface = "org.mpris.MediaPlayer2",
    default_path = "/org/mpris/MediaPlayer2"
)]
pub trait MediaPlayer2 {
    /// Quit the media player application
    fn quit(&self) -> Result<()>;

    /// Raise the media player window to the foreground
    fn raise(&self) -> Result<()>;

    /// Whether the player is in fullscreen mode
    #[zbus(property)]
    fn fullscreen(&self) -> Result<bool>;

    /// Set the player's fullscreen mode
    #[zbus(property)]
    fn set_fullscreen(&self, fullscreen: bool) -> Result<()>;
}

/// `org.mpris.MediaPlayer2.Player` interface
#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2"
)]
pub trait MediaPlayer2Player {
    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn play_pause(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn next(&self) -> Result<()>;

    fn previous(&self) -> Result<()>;

    /// Seek by a relative offset in microseconds
    fn seek(&self, offset: i64) -> Result<()>;

    /// Set absolute playback position in microseconds
    fn set_position(&self, track_id: &ObjectPath<'_>, position: i64) -> Result<()>;

    fn open_uri(&self, uri: &str) -> Result<()>;

    /// Emitted when the position jumps discontinuously
    #[zbus(signal)]
    fn seeked(&self, position: i64) -> Result<()>;

    #[zbus(property)]
    fn loop_status(&self) -> Result<String>;

    #[zbus(property)]
    fn set_loop_status(&self, status: &str) -> Result<()>;

    #[zbus(property)]
    fn rate(&self) -> Result<f64>;

    #[zbus(property)]
    fn set_rate(&self, rate: f64) -> Result<()>;

    #[zbus(property)]
    fn shuffle(&self) -> Result<bool>;

    #[zbus(property)]
    fn set_shuffle(&self, shuffle: bool) -> Result<()>;

    #[zbus(property)]
    fn volume(&self) -> Result<f64>;

    #[zbus(property)]
    fn set_volume(&self, volume: f64) -> Result<()>;

    /// Current playback position in microseconds; never signalled
    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> Result<i64>;
}
