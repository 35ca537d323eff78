use crate::bus::BusError;

/// Errors surfaced by the MPRIS client
#[derive(thiserror::Error, Debug)]
pub enum MprisError {
    /// Bus unreachable or call rejected by the player
    #[error("Transport error: {0}")]
    Transport(#[from] BusError),

    /// Capability flag says the player does not support the operation
    #[error("Player doesn't support {operation}")]
    UnsupportedOperation {
        /// Name of the unsupported operation
        operation: String,
    },

    /// Signal or property value doesn't have the expected shape
    #[error("Malformed value for {property}: {reason}")]
    MalformedPayload {
        /// Property that failed to decode
        property: String,
        /// What was wrong with it
        reason: String,
    },

    /// No player is bound
    #[error("Not connected to a media player")]
    NotConnected,

    /// Operation did not complete in time
    #[error("{operation} timed out")]
    Timeout {
        /// Operation that timed out
        operation: String,
    },

    /// Name is not a usable MPRIS bus name
    #[error("Invalid player name '{name}'")]
    InvalidBusName {
        /// The rejected name
        name: String,
    },

    /// Failed to initialize the client
    #[error("Failed to initialize MPRIS client: {0}")]
    InitializationFailed(String),

    /// The client dispatcher has shut down
    #[error("MPRIS client is closed")]
    ClientClosed,
}
