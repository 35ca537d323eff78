//! mpris2-client - observe and control MPRIS2 media players.
//!
//! The crate discovers players on the bus, binds one, keeps a typed model
//! of its state in sync with the player's signals and forwards commands to
//! it. The main features include:
//!
//! - Player discovery with preference matching and automatic reconnection
//! - Capability registry with an optional strict mode for gated commands
//! - Smooth position estimation between sparse position reports
//! - Typed notifications delivered as a stream
//!
//! The transport is abstracted behind [`bus::Bus`]; [`bus::dbus::DBusBus`]
//! implements it on top of `zbus`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use mpris2_client::{config::ClientConfig, mpris::MprisClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MprisClient::session(ClientConfig::default()).await?;
//!
//! if client.auto_connect().await? {
//!     println!("Now playing: {:?}", client.metadata().title());
//!     client.play_pause()?;
//! }
//!
//! let mut events = Box::pin(client.events());
//! while let Some(event) = events.next().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

/// Abstract bus and its D-Bus implementation.
pub mod bus;

/// Command-line front end.
pub mod cli;

/// Shared building blocks.
pub mod common;

/// Client configuration.
pub mod config;

/// MPRIS2 client.
pub mod mpris;

/// State remembered between command-line invocations.
pub mod runtime_state;

/// Logging setup.
pub mod tracing_config;
