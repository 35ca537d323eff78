use tokio::sync::oneshot;

use super::MprisError;
use crate::bus::{MethodCall, PropertyWrite};

/// Reply channel for commands that answer the caller
pub(crate) type Reply<T> = oneshot::Sender<Result<T, MprisError>>;

/// Requests from [`MprisClient`](super::MprisClient) handles to the dispatcher
#[derive(Debug)]
pub(crate) enum Command {
    /// Fire-and-forget method call on the bound player
    Call(MethodCall),

    /// Fire-and-forget property write on the bound player
    Write(PropertyWrite),

    /// Record or clear the preferred player
    SetPlayer(Option<String>),

    /// Discover players and bind one
    AutoConnect(Reply<bool>),

    /// Drop the current binding and leave auto-connect mode
    Disconnect,

    /// Read `Position` from the player and rebase the estimate on it
    AccuratePosition(Reply<i64>),

    /// Resolve once every call queued before it has completed
    Flush(oneshot::Sender<()>),
}
