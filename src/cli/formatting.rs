//! Formatting utilities for CLI output.
//!
//! Provides consistent styling for player listings, status output and the
//! notification feed of `watch`.

use crate::mpris::{ClientEvent, Metadata, PlayerRef, Session};

/// ANSI color codes for terminal output
pub struct Colors;

impl Colors {
    /// Reset all formatting
    pub const RESET: &'static str = "\x1b[0m";
    /// Bold text
    pub const BOLD: &'static str = "\x1b[1m";
    /// Dim text
    pub const DIM: &'static str = "\x1b[2m";

    /// Red color
    pub const RED: &'static str = "\x1b[31m";
    /// Green color
    pub const GREEN: &'static str = "\x1b[32m";
    /// Yellow color
    pub const YELLOW: &'static str = "\x1b[33m";
    /// Cyan color
    pub const CYAN: &'static str = "\x1b[36m";
}

/// Formats section headers with styling
pub fn format_header(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::CYAN, text, Colors::RESET)
}

/// Formats field labels with styling
pub fn format_label(text: &str) -> String {
    format!("{}{}{}", Colors::DIM, text, Colors::RESET)
}

/// Formats success messages with styling
pub fn format_success(text: &str) -> String {
    format!("{}{}{}", Colors::GREEN, text, Colors::RESET)
}

/// Formats error messages with red styling
pub fn format_error(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::RED, text, Colors::RESET)
}

/// Formats a position or length in microseconds as `m:ss` or `h:mm:ss`
pub fn format_time(micros: i64) -> String {
    let total = micros.max(0) / 1_000_000;
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// One line per player for `list`; `last_used` marks the remembered player
pub fn format_player(index: usize, player: &PlayerRef, last_used: bool) -> String {
    let marker = if last_used {
        format!("{}*{}", Colors::YELLOW, Colors::RESET)
    } else {
        " ".to_string()
    };

    format!(
        "{marker} {index}. {}{}{} {}",
        Colors::BOLD,
        player.identity,
        Colors::RESET,
        format_label(&player.bus_name)
    )
}

fn track_line(metadata: &Metadata) -> String {
    let title = metadata.title().unwrap_or("Unknown title");
    let artists = metadata.artist_display();

    if artists.is_empty() {
        title.to_string()
    } else {
        format!("{title} - {artists}")
    }
}

/// Full status block for `status`
pub fn format_status(session: &Session, position: i64) -> String {
    let Some(player) = session.player() else {
        return format_label("Not connected");
    };

    let metadata = session.metadata();
    let capabilities = session.capabilities();
    let length = metadata
        .length()
        .map_or_else(|| "?".to_string(), format_time);

    let mut lines = vec![
        format_header(&player.identity),
        format!("{} {}", format_label("Status:  "), session.playback_status()),
        format!("{} {}", format_label("Track:   "), track_line(&metadata)),
    ];

    if let Some(album) = metadata.album() {
        lines.push(format!("{} {album}", format_label("Album:   ")));
    }

    lines.push(format!(
        "{} {} / {length}",
        format_label("Position:"),
        format_time(position)
    ));
    lines.push(format!(
        "{} {:.0}%",
        format_label("Volume:  "),
        session.volume() * 100.0
    ));

    if capabilities.has_loop_status() {
        lines.push(format!("{} {}", format_label("Loop:    "), session.loop_status()));
    }
    if capabilities.has_shuffle() {
        let shuffle = if session.shuffle() { "on" } else { "off" };
        lines.push(format!("{} {shuffle}", format_label("Shuffle: ")));
    }

    lines.join("\n")
}

/// One line per notification for `watch`
pub fn format_event(event: &ClientEvent) -> String {
    let detail = match event {
        ClientEvent::Connection(true) => format_success("connected"),
        ClientEvent::Connection(false) => format_error("disconnected"),
        ClientEvent::PlaybackStatus(status) => status.to_string(),
        ClientEvent::PlaybackTick(position) | ClientEvent::Position(position) => {
            format_time(*position)
        }
        ClientEvent::Metadata(metadata) => track_line(metadata),
        ClientEvent::Volume(volume) => format!("{:.0}%", volume * 100.0),
        ClientEvent::LoopStatus(status) => status.to_string(),
        ClientEvent::Shuffle(flag) | ClientEvent::Fullscreen(flag) => flag.to_string(),
        ClientEvent::Rate(rate) => format!("{rate}x"),
        ClientEvent::CapabilitiesChanged => String::new(),
        ClientEvent::PlayersChanged(players) => players.join(", "),
    };

    format!("{} {detail}", format_label(&format!("[{}]", event.kind())))
}
