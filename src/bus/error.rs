/// Errors raised by a [`Bus`](super::Bus) implementation
#[derive(thiserror::Error, Debug)]
pub enum BusError {
    /// D-Bus communication error
    #[error("D-Bus operation failed: {0}")]
    DBus(#[from] zbus::Error),

    /// Error reported by a standard D-Bus interface
    #[error("D-Bus fdo error: {0}")]
    Fdo(#[from] zbus::fdo::Error),

    /// Bus name is not a valid well-known or unique name
    #[error("Invalid bus name '{name}': {reason}")]
    InvalidName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Requested property was not present on the remote object
    #[error("Property '{property}' is not available")]
    MissingProperty {
        /// Property name
        property: String,
    },

    /// Remote side rejected the request
    #[error("Request rejected: {0}")]
    Rejected(String),
}
