use tokio::{sync::mpsc, task::JoinHandle};

use super::PropMap;

/// Signal delivered by the bus to the client dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// `org.freedesktop.DBus.Properties.PropertiesChanged` from a player
    PropertiesChanged {
        /// Bus name of the emitting player
        sender: String,
        /// Interface whose properties changed
        interface: String,
        /// Changed properties with their new values
        changed: PropMap,
        /// Properties invalidated without a value
        invalidated: Vec<String>,
    },

    /// `org.mpris.MediaPlayer2.Player.Seeked`
    Seeked {
        /// Bus name of the emitting player
        sender: String,
        /// New absolute position in microseconds
        position: i64,
    },

    /// `org.freedesktop.DBus.NameOwnerChanged`
    NameOwnerChanged {
        /// Well-known name whose owner changed
        name: String,
        /// Previous unique owner, if any
        old_owner: Option<String>,
        /// New unique owner, if any
        new_owner: Option<String>,
    },
}

/// Bus event tagged with the binding generation that subscribed to it
#[derive(Debug, Clone)]
pub struct TaggedEvent {
    /// Generation of the subscription that produced the event
    pub generation: u64,
    /// The event itself
    pub event: BusEvent,
}

/// Delivery handle a bus uses to push signals into the dispatcher queue.
///
/// Every event is tagged with the generation the sink was created for, so
/// signals still in flight from a previous binding can be told apart.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    /// Create a sink for the given generation
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    /// Generation this sink tags events with
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue an event. Returns `false` once the receiving side is gone.
    pub fn send(&self, event: BusEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Whether the receiving side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Active signal subscription.
///
/// Dropping it aborts the forwarding tasks.
#[derive(Debug, Default)]
pub struct Subscription {
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    /// Subscription backed by the given forwarding tasks
    pub fn new(tasks: Vec<JoinHandle<()>>) -> Self {
        Self { tasks }
    }

    /// Subscription with nothing to tear down
    pub fn detached() -> Self {
        Self::default()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
