//! MPRIS2 client: discovery, binding, state tracking and control.
//!
//! [`MprisClient`] is the entry point. It owns a dispatcher task that binds
//! one player at a time, keeps a [`Session`] in sync with the player's
//! signals and forwards commands.

mod capabilities;
mod client;
mod commands;
mod discovery;
mod dispatcher;
mod error;
mod events;
mod metadata;
mod position;
mod session;
mod types;

pub use capabilities::{Capabilities, Operation};
pub use client::MprisClient;
pub use error::MprisError;
pub use events::ClientEvent;
pub use metadata::Metadata;
pub use position::PositionEstimator;
pub use session::Session;
pub use types::{BindState, LoopStatus, PlaybackStatus, PlayerRef};
