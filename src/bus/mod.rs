//! Abstract bus capability consumed by the MPRIS client.
//!
//! The client never talks to D-Bus directly. It drives an implementation of
//! [`Bus`], which is responsible for name enumeration, batched property
//! reads, method calls and signal delivery. [`dbus::DBusBus`] is the
//! `zbus`-backed implementation used in production.

mod calls;
/// `zbus` implementation of the bus
pub mod dbus;
mod error;
mod events;
mod value;

use async_trait::async_trait;

pub use calls::{MethodCall, PropertyWrite};
pub use error::BusError;
pub use events::{BusEvent, EventSink, Subscription, TaggedEvent};
pub use value::{PropMap, PropValue};

/// Well-known name prefix shared by every MPRIS2 player
pub const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

/// Object path every MPRIS2 player exports
pub const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";

/// Root interface name
pub const ROOT_INTERFACE: &str = "org.mpris.MediaPlayer2";

/// Player interface name
pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// IPC operations the client needs from the underlying transport.
///
/// Implementations must be cheap to share behind an `Arc`; every method may be
/// called concurrently from spawned tasks.
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    /// List every bus name starting with `prefix`
    ///
    /// # Errors
    /// Returns error if the bus daemon cannot be queried
    async fn list_names(&self, prefix: &str) -> Result<Vec<String>, BusError>;

    /// Read every property of `interface` in a single call
    ///
    /// # Errors
    /// Returns error if the player does not answer or rejects the call
    async fn get_all(&self, bus_name: &str, interface: &str) -> Result<PropMap, BusError>;

    /// Read a single property
    ///
    /// # Errors
    /// Returns error if the player does not answer or the property is missing
    async fn get(
        &self,
        bus_name: &str,
        interface: &str,
        property: &str,
    ) -> Result<PropValue, BusError>;

    /// Invoke a method and wait for the transport acknowledgement
    ///
    /// # Errors
    /// Returns error if the player rejects the call
    async fn call(&self, bus_name: &str, call: MethodCall) -> Result<(), BusError>;

    /// Write a property
    ///
    /// # Errors
    /// Returns error if the player rejects the write
    async fn set(&self, bus_name: &str, write: PropertyWrite) -> Result<(), BusError>;

    /// Forward `PropertiesChanged` and `Seeked` from `bus_name` into `sink`
    /// until the returned subscription is dropped
    ///
    /// # Errors
    /// Returns error if the match rules cannot be installed
    async fn subscribe_player(
        &self,
        bus_name: &str,
        sink: EventSink,
    ) -> Result<Subscription, BusError>;

    /// Forward `NameOwnerChanged` for MPRIS names into `sink` until the
    /// returned subscription is dropped
    ///
    /// # Errors
    /// Returns error if the match rule cannot be installed
    async fn subscribe_name_owner_changed(&self, sink: EventSink)
    -> Result<Subscription, BusError>;
}
