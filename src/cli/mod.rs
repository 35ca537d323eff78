//! Command-line front end.
//!
//! Each invocation starts a client on the session bus, binds a player
//! (the `--player` argument, the configured preference or the last player
//! used, in that order), runs one command and waits for it to reach the
//! player before exiting.

mod error;
pub mod formatting;
mod position;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use tracing::{debug, instrument};

pub use error::CliError;
use formatting::{format_event, format_player, format_status};

use crate::{
    config::ClientConfig,
    mpris::{LoopStatus, MprisClient, PlayerRef},
    runtime_state::RuntimeState,
};

/// Observe and control MPRIS2 media players
#[derive(Parser, Debug)]
#[command(name = "mpris2-client", version, about)]
pub struct Cli {
    /// Player to control: bus name, short name (`vlc`) or identity
    #[arg(short, long, global = true)]
    pub player: Option<String>,

    /// Skip commands the player doesn't advertise support for
    #[arg(long, global = true)]
    pub strict: bool,

    /// Alternative configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Command-line subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List running players
    List,
    /// Show what the player is doing
    Status,
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Toggle play / pause
    PlayPause,
    /// Stop playback
    Stop,
    /// Next track
    Next,
    /// Previous track
    Previous,
    /// Seek relative to the current position
    Seek {
        /// Offset in seconds, negative to go back
        #[arg(allow_negative_numbers = true)]
        offset: f64,
    },
    /// Jump to a position: seconds, mm:ss, 50% or +10/-10
    Position {
        /// Target position
        #[arg(allow_hyphen_values = true)]
        position: String,
    },
    /// Set the volume
    Volume {
        /// Volume, 1.0 being the nominal level
        level: f64,
    },
    /// Set the loop mode
    Loop {
        /// Loop mode
        mode: LoopArg,
    },
    /// Set shuffle
    Shuffle {
        /// New state
        state: Switch,
    },
    /// Open a URI in the player
    Open {
        /// URI to open
        uri: String,
    },
    /// Bring the player window to front
    Raise,
    /// Ask the player to exit
    Quit,
    /// Set fullscreen
    Fullscreen {
        /// New state
        state: Switch,
    },
    /// Print notifications until interrupted
    Watch,
}

impl Command {
    /// Whether the command keeps running until interrupted
    pub fn is_long_running(&self) -> bool {
        matches!(self, Self::Watch)
    }
}

/// Loop mode argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LoopArg {
    /// No looping
    None,
    /// Repeat the current track
    Track,
    /// Repeat the playlist
    Playlist,
}

impl From<LoopArg> for LoopStatus {
    fn from(arg: LoopArg) -> Self {
        match arg {
            LoopArg::None => LoopStatus::None,
            LoopArg::Track => LoopStatus::Track,
            LoopArg::Playlist => LoopStatus::Playlist,
        }
    }
}

/// On / off argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    /// Turn on
    On,
    /// Turn off
    Off,
    /// Flip the current state
    Toggle,
}

impl Switch {
    fn resolve(self, current: bool) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Toggle => !current,
        }
    }
}

impl Cli {
    /// Load the configuration and apply command-line overrides
    ///
    /// # Errors
    /// Returns error if the configuration file is unusable
    pub fn load_config(&self) -> Result<ClientConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load_from(path)?,
            None => ClientConfig::load()?,
        };

        if let Some(player) = &self.player {
            config.preferred_player = Some(player.clone());
        }
        if self.strict {
            config.strict_mode = true;
        }

        Ok(config)
    }
}

/// Run one command and return what to print.
///
/// `requested` is the player named on the command line. Unlike a configured
/// preference it never falls back to another player.
///
/// # Errors
/// Returns error if no player is available, the requested one isn't running
/// or the command fails
#[instrument(skip(config))]
pub async fn run(
    command: Command,
    mut config: ClientConfig,
    requested: Option<String>,
) -> Result<String, CliError> {
    if config.preferred_player.is_none() {
        config.preferred_player = RuntimeState::load().await.last_player;
    }

    let client = MprisClient::session(config).await?;

    if let Command::List = command {
        return list(&client).await;
    }
    if let Command::Watch = command {
        return watch(&client).await;
    }

    if let Some(query) = requested.as_deref() {
        let player = find_player(&client, query).await?;
        debug!(player = %player.bus_name, "Requested player is running");
    }

    if !client.auto_connect().await? {
        return Err(CliError::NoPlayers);
    }

    let bound = client.bound_player();
    if let Some(query) = requested.as_deref()
        && !bound.as_ref().is_some_and(|player| player.matches(query))
    {
        return Err(CliError::PlayerNotFound {
            query: query.to_string(),
        });
    }
    if let Some(player) = bound {
        RuntimeState::remember_player(&player.bus_name).await;
    }

    let output = execute(&client, command).await?;
    client.flush().await?;

    Ok(output)
}

/// Find the running player `query` designates
///
/// # Errors
/// Returns error if discovery fails or no running player matches
pub async fn find_player(client: &MprisClient, query: &str) -> Result<PlayerRef, CliError> {
    let players = client.list_available_players().await?;
    if players.is_empty() {
        return Err(CliError::NoPlayers);
    }

    players
        .into_iter()
        .find(|player| player.matches(query))
        .ok_or_else(|| CliError::PlayerNotFound {
            query: query.to_string(),
        })
}

async fn execute(client: &MprisClient, command: Command) -> Result<String, CliError> {
    match command {
        Command::Status => {
            let position = client
                .accurate_position()
                .await
                .unwrap_or_else(|_| client.position());
            return Ok(format_status(&client.snapshot(), position));
        }
        Command::Play => client.play()?,
        Command::Pause => client.pause()?,
        Command::PlayPause => client.play_pause()?,
        Command::Stop => client.stop()?,
        Command::Next => client.next()?,
        Command::Previous => client.previous()?,
        Command::Seek { offset } => {
            client.seek(position::seconds_to_micros("offset", offset)?)?;
        }
        Command::Position { position } => {
            let current = client.accurate_position().await.unwrap_or_else(|e| {
                debug!(error = %e, "Falling back to estimated position");
                client.position()
            });
            let length = client.metadata().length();
            client.seek_to(position::parse_position(&position, current, length)?)?;
        }
        Command::Volume { level } => {
            if !level.is_finite() || level < 0.0 {
                return Err(CliError::invalid("level", "must be a non-negative number"));
            }
            client.set_volume(level)?;
        }
        Command::Loop { mode } => client.set_loop_status(mode.into())?,
        Command::Shuffle { state } => client.set_shuffle(state.resolve(client.shuffle()))?,
        Command::Open { uri } => client.open_uri(&uri)?,
        Command::Raise => client.raise()?,
        Command::Quit => client.quit()?,
        Command::Fullscreen { state } => {
            client.set_fullscreen(state.resolve(client.fullscreen()))?;
        }
        Command::List | Command::Watch => {}
    }

    Ok(String::new())
}

async fn list(client: &MprisClient) -> Result<String, CliError> {
    let players = client.list_available_players().await?;
    if players.is_empty() {
        return Err(CliError::NoPlayers);
    }

    let last = RuntimeState::load().await.last_player;
    let lines: Vec<String> = players
        .iter()
        .enumerate()
        .map(|(index, player)| {
            let last_used = last.as_deref() == Some(player.bus_name.as_str());
            format_player(index + 1, player, last_used)
        })
        .collect();

    Ok(lines.join("\n"))
}

async fn watch(client: &MprisClient) -> Result<String, CliError> {
    let mut events = Box::pin(client.events());

    if !client.auto_connect().await? {
        println!("{}", formatting::format_label("Waiting for a player..."));
    }

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    break;
                };
                println!("{}", format_event(&event));
            }
            result = &mut interrupted => {
                result?;
                break;
            }
        }
    }

    Ok(String::new())
}
