use thiserror::Error;

use crate::{config::ConfigError, mpris::MprisError};

/// Errors that end a command-line invocation
#[derive(Error, Debug)]
pub enum CliError {
    /// Nothing to control.
    #[error("No media players found")]
    NoPlayers,

    /// No running player matches the requested name.
    #[error("No player found matching '{query}'")]
    PlayerNotFound {
        /// Name given on the command line
        query: String,
    },

    /// An argument could not be interpreted.
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// Name of the argument
        arg: String,
        /// What is wrong with it
        reason: String,
    },

    /// The client rejected or failed the request.
    #[error(transparent)]
    Mpris(#[from] MprisError),

    /// The configuration file is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CliError {
    pub(crate) fn invalid(arg: &str, reason: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            arg: arg.to_string(),
            reason: reason.into(),
        }
    }
}
