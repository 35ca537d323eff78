use std::sync::Arc;

use futures::Stream;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::Instant,
};
use tracing::{debug, info, instrument, warn};

use super::{
    BindState, Capabilities, ClientEvent, LoopStatus, Metadata, MprisError, Operation,
    PlaybackStatus, PlayerRef, Session,
    commands::Command,
    discovery::Discovery,
    dispatcher::{Dispatcher, Inbox, Shared},
};
use crate::{
    bus::{Bus, EventSink, MethodCall, PropertyWrite, dbus::DBusBus},
    common::Property,
    config::{ClientConfig, UnsupportedPolicy},
};

const EVENT_CAPACITY: usize = 256;

/// Handle to an MPRIS client.
///
/// Cheap to clone; every clone talks to the same dispatcher task. The
/// dispatcher stops once the last handle is dropped.
///
/// Commands return as soon as they are queued. Their effect becomes visible
/// when the player echoes the change back through [`events`](Self::events)
/// and the accessors.
#[derive(Clone)]
pub struct MprisClient {
    commands: mpsc::UnboundedSender<Command>,
    session: Property<Session>,
    preferred: Property<Option<String>>,
    strict: Property<bool>,
    events: broadcast::Sender<ClientEvent>,
    discovery: Discovery,
    policy: UnsupportedPolicy,
}

impl MprisClient {
    /// Start a client on top of `bus`.
    ///
    /// Nothing is bound yet; call [`auto_connect`](Self::auto_connect) or
    /// [`set_player`](Self::set_player).
    ///
    /// # Errors
    /// Returns error if `config` fails validation or the name-owner watch
    /// cannot be installed
    #[instrument(skip(bus, config))]
    pub async fn new(bus: Arc<dyn Bus>, config: ClientConfig) -> Result<Self, MprisError> {
        config.validate().map_err(|e| {
            MprisError::InitializationFailed(format!("Unusable configuration: {e}"))
        })?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let watcher = bus
            .subscribe_name_owner_changed(EventSink::new(0, signal_tx.clone()))
            .await
            .map_err(|e| {
                MprisError::InitializationFailed(format!("Name owner watch failed: {e}"))
            })?;

        let session = Property::new(Session::new(Instant::now()));
        let preferred = Property::new(config.preferred_player.clone());
        let strict = Property::new(config.strict_mode);

        let shared = Shared {
            session: session.clone(),
            preferred: preferred.clone(),
            strict: strict.clone(),
            events: events.clone(),
        };
        let discovery = Discovery::new(
            Arc::clone(&bus),
            config.ignored_players.clone(),
            config.discovery_timeout(),
        );
        let policy = config.unsupported_policy;

        let dispatcher = Dispatcher::new(bus, config, shared, signal_tx);
        let inbox = Inbox {
            commands: command_rx,
            signals: signal_rx,
        };
        tokio::spawn(dispatcher.run(inbox, watcher));

        info!("MPRIS client started");
        Ok(Self {
            commands: command_tx,
            session,
            preferred,
            strict,
            events,
            discovery,
            policy,
        })
    }

    /// Start a client on the D-Bus session bus
    ///
    /// # Errors
    /// Returns error if the session bus is unreachable
    pub async fn session(config: ClientConfig) -> Result<Self, MprisError> {
        let bus = DBusBus::session().await.map_err(|e| {
            MprisError::InitializationFailed(format!("D-Bus session connection failed: {e}"))
        })?;
        Self::new(Arc::new(bus), config).await
    }

    /// Every player currently on the bus, minus ignored ones
    ///
    /// # Errors
    /// Returns error if the bus cannot be queried in time
    pub async fn list_available_players(&self) -> Result<Vec<PlayerRef>, MprisError> {
        self.discovery.list_players().await
    }

    /// Bind the preferred player if running, else the first one found.
    ///
    /// Returns `false` when no player is available. Also enters auto-connect
    /// mode: when the bound player disappears, or a player appears while
    /// nothing is bound, the selection runs again.
    ///
    /// # Errors
    /// Returns error if discovery fails or the chosen player cannot be bound
    pub async fn auto_connect(&self) -> Result<bool, MprisError> {
        let (reply, answer) = oneshot::channel();
        self.enqueue(Command::AutoConnect(reply))?;
        answer.await.map_err(|_| MprisError::ClientClosed)?
    }

    /// Record the preferred player, or clear it and disconnect with `None`.
    ///
    /// `player` may be a full bus name, a short name such as `vlc` or the
    /// player identity. When another player is bound and the preferred one
    /// is running, the client switches to it.
    ///
    /// # Errors
    /// Returns error if the name is blank or the client is closed
    pub fn set_player(&self, player: Option<&str>) -> Result<(), MprisError> {
        let player = match player.map(str::trim) {
            Some("") => {
                return Err(MprisError::InvalidBusName {
                    name: String::new(),
                });
            }
            other => other.map(ToString::to_string),
        };

        self.preferred.set(player.clone());
        self.enqueue(Command::SetPlayer(player))
    }

    /// Preferred player, as recorded by [`set_player`](Self::set_player)
    pub fn player(&self) -> Option<String> {
        self.preferred.get()
    }

    /// Drop the binding and leave auto-connect mode
    ///
    /// # Errors
    /// Returns error if the client is closed
    pub fn disconnect(&self) -> Result<(), MprisError> {
        self.enqueue(Command::Disconnect)
    }

    /// Wait until every command queued so far has reached the player
    ///
    /// # Errors
    /// Returns error if the client is closed
    pub async fn flush(&self) -> Result<(), MprisError> {
        let (reply, done) = oneshot::channel();
        self.enqueue(Command::Flush(reply))?;
        done.await.map_err(|_| MprisError::ClientClosed)
    }

    /// Notifications as a stream.
    ///
    /// Only events raised after the call are delivered. A consumer that
    /// falls behind skips the oldest events.
    pub fn events(&self) -> impl Stream<Item = ClientEvent> + Send + 'static {
        let mut rx = self.events.subscribe();

        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event consumer lagging, notifications dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Raw notification receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Session snapshot, updated after every change
    pub fn snapshot(&self) -> Session {
        self.session.get()
    }

    /// Stream of session snapshots
    pub fn watch(&self) -> impl Stream<Item = Session> + Send {
        self.session.watch()
    }

    /// Whether a player is bound
    pub fn is_connected(&self) -> bool {
        self.session.with(Session::is_connected)
    }

    /// Binding state
    pub fn state(&self) -> BindState {
        self.session.with(Session::state)
    }

    /// Bound player
    pub fn bound_player(&self) -> Option<PlayerRef> {
        self.session.with(|session| session.player().cloned())
    }

    /// Identity of the bound player
    pub fn identity(&self) -> Option<String> {
        self.session
            .with(|session| session.player().map(|player| player.identity.clone()))
    }

    /// Desktop entry of the bound player
    pub fn desktop_entry(&self) -> Option<String> {
        self.session.with(|session| {
            session
                .player()
                .and_then(|player| player.desktop_entry.clone())
        })
    }

    /// Whether gated commands check capability flags first
    pub fn strict_mode(&self) -> bool {
        self.strict.get()
    }

    /// Turn strict mode on or off
    pub fn set_strict_mode(&self, strict: bool) {
        self.strict.set(strict);
    }

    /// Capability registry of the bound player
    pub fn capabilities(&self) -> Capabilities {
        self.session.with(|session| session.capabilities().clone())
    }

    /// Whether the player accepts `Quit`
    pub fn can_quit(&self) -> bool {
        self.capability(Capabilities::can_quit)
    }

    /// Whether the player accepts `Raise`
    pub fn can_raise(&self) -> bool {
        self.capability(Capabilities::can_raise)
    }

    /// Whether fullscreen can be changed
    pub fn can_set_fullscreen(&self) -> bool {
        self.capability(Capabilities::can_set_fullscreen)
    }

    /// Whether the player has a track list
    pub fn has_track_list(&self) -> bool {
        self.capability(Capabilities::has_track_list)
    }

    /// Whether `next` does anything
    pub fn can_go_next(&self) -> bool {
        self.capability(Capabilities::can_go_next)
    }

    /// Whether `previous` does anything
    pub fn can_go_previous(&self) -> bool {
        self.capability(Capabilities::can_go_previous)
    }

    /// Whether `play` does anything
    pub fn can_play(&self) -> bool {
        self.capability(Capabilities::can_play)
    }

    /// Whether `pause` does anything
    pub fn can_pause(&self) -> bool {
        self.capability(Capabilities::can_pause)
    }

    /// Whether seeking does anything
    pub fn can_seek(&self) -> bool {
        self.capability(Capabilities::can_seek)
    }

    /// Whether the player can be controlled at all
    pub fn can_control(&self) -> bool {
        self.capability(Capabilities::can_control)
    }

    /// Whether the player reports a loop mode
    pub fn has_loop_status(&self) -> bool {
        self.capability(Capabilities::has_loop_status)
    }

    /// Whether the player reports shuffle
    pub fn has_shuffle(&self) -> bool {
        self.capability(Capabilities::has_shuffle)
    }

    /// Lowest accepted rate
    pub fn minimum_rate(&self) -> f64 {
        self.session
            .with(|session| session.capabilities().minimum_rate())
    }

    /// Highest accepted rate
    pub fn maximum_rate(&self) -> f64 {
        self.session
            .with(|session| session.capabilities().maximum_rate())
    }

    /// URI schemes `open_uri` accepts
    pub fn supported_uri_schemes(&self) -> Vec<String> {
        self.session
            .with(|session| session.capabilities().supported_uri_schemes().to_vec())
    }

    /// MIME types the player can play
    pub fn supported_mime_types(&self) -> Vec<String> {
        self.session
            .with(|session| session.capabilities().supported_mime_types().to_vec())
    }

    /// Playback status
    pub fn playback_status(&self) -> PlaybackStatus {
        self.session.with(Session::playback_status)
    }

    /// Playback rate
    pub fn rate(&self) -> f64 {
        self.session.with(Session::rate)
    }

    /// Current track
    pub fn metadata(&self) -> Arc<Metadata> {
        self.session.with(Session::metadata)
    }

    /// Volume
    pub fn volume(&self) -> f64 {
        self.session.with(Session::volume)
    }

    /// Loop mode
    pub fn loop_status(&self) -> LoopStatus {
        self.session.with(Session::loop_status)
    }

    /// Shuffle
    pub fn shuffle(&self) -> bool {
        self.session.with(Session::shuffle)
    }

    /// Fullscreen
    pub fn fullscreen(&self) -> bool {
        self.session.with(Session::fullscreen)
    }

    /// Estimated position in microseconds, without asking the player
    pub fn position(&self) -> i64 {
        let now = Instant::now();
        self.session.with(|session| session.position(now))
    }

    /// Position read from the player. The estimate is rebased on it.
    ///
    /// # Errors
    /// Returns error if nothing is bound or the player does not answer
    pub async fn accurate_position(&self) -> Result<i64, MprisError> {
        let (reply, answer) = oneshot::channel();
        self.enqueue(Command::AccuratePosition(reply))?;
        answer.await.map_err(|_| MprisError::ClientClosed)?
    }

    /// Skip to the previous track
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn previous(&self) -> Result<(), MprisError> {
        self.call(MethodCall::Previous)
    }

    /// Skip to the next track
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn next(&self) -> Result<(), MprisError> {
        self.call(MethodCall::Next)
    }

    /// Pause playback
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn pause(&self) -> Result<(), MprisError> {
        self.call(MethodCall::Pause)
    }

    /// Toggle between playing and paused
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn play_pause(&self) -> Result<(), MprisError> {
        self.call(MethodCall::PlayPause)
    }

    /// Stop playback
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn stop(&self) -> Result<(), MprisError> {
        self.call(MethodCall::Stop)
    }

    /// Start playback
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn play(&self) -> Result<(), MprisError> {
        self.call(MethodCall::Play)
    }

    /// Seek by `offset` microseconds, negative values go backwards
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn seek(&self, offset: i64) -> Result<(), MprisError> {
        self.call(MethodCall::Seek { offset })
    }

    /// Jump to `position` microseconds in `track_id`
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn set_position(&self, track_id: &str, position: i64) -> Result<(), MprisError> {
        self.call(MethodCall::SetPosition {
            track_id: track_id.to_string(),
            position,
        })
    }

    /// Jump to `position` microseconds in the current track
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn seek_to(&self, position: i64) -> Result<(), MprisError> {
        let track_id = self
            .metadata()
            .track_id()
            .unwrap_or("/")
            .to_string();
        self.call(MethodCall::SetPosition {
            track_id,
            position: position.max(0),
        })
    }

    /// Ask the player to open `uri`
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn open_uri(&self, uri: &str) -> Result<(), MprisError> {
        self.call(MethodCall::OpenUri {
            uri: uri.to_string(),
        })
    }

    /// Bring the player's window to front
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn raise(&self) -> Result<(), MprisError> {
        self.call(MethodCall::Raise)
    }

    /// Ask the player to exit
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the call
    pub fn quit(&self) -> Result<(), MprisError> {
        self.call(MethodCall::Quit)
    }

    /// Change fullscreen
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the write
    pub fn set_fullscreen(&self, fullscreen: bool) -> Result<(), MprisError> {
        self.write(PropertyWrite::Fullscreen(fullscreen))
    }

    /// Change volume; negative values are sent as zero
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the write
    pub fn set_volume(&self, volume: f64) -> Result<(), MprisError> {
        self.write(PropertyWrite::Volume(volume.max(0.0)))
    }

    /// Change loop mode
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the write
    pub fn set_loop_status(&self, loop_status: LoopStatus) -> Result<(), MprisError> {
        self.write(PropertyWrite::LoopStatus(loop_status))
    }

    /// Change shuffle
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the write
    pub fn set_shuffle(&self, shuffle: bool) -> Result<(), MprisError> {
        self.write(PropertyWrite::Shuffle(shuffle))
    }

    /// Change playback rate
    ///
    /// # Errors
    /// Returns error if nothing is bound or strict mode rejects the write
    pub fn set_rate(&self, rate: f64) -> Result<(), MprisError> {
        self.write(PropertyWrite::Rate(rate))
    }

    fn capability(&self, flag: fn(&Capabilities) -> bool) -> bool {
        self.session.with(|session| flag(session.capabilities()))
    }

    fn call(&self, call: MethodCall) -> Result<(), MprisError> {
        let permitted = self.session.with(|session| session.capabilities().permits_call(&call));
        if self.admit(Operation::from(&call), permitted)? {
            self.enqueue(Command::Call(call))?;
        }
        Ok(())
    }

    fn write(&self, write: PropertyWrite) -> Result<(), MprisError> {
        let permitted = self
            .session
            .with(|session| session.capabilities().permits_write(&write));
        if self.admit(Operation::from(&write), permitted)? {
            self.enqueue(Command::Write(write))?;
        }
        Ok(())
    }

    /// Whether a gated command should be queued
    fn admit(&self, operation: Operation, permitted: bool) -> Result<bool, MprisError> {
        if !self.is_connected() {
            return Err(MprisError::NotConnected);
        }

        if permitted || !self.strict.get() {
            return Ok(true);
        }

        match self.policy {
            UnsupportedPolicy::Ignore => {
                debug!(%operation, "Ignoring operation the player doesn't support");
                Ok(false)
            }
            UnsupportedPolicy::Reject => Err(MprisError::UnsupportedOperation {
                operation: operation.to_string(),
            }),
        }
    }

    fn enqueue(&self, command: Command) -> Result<(), MprisError> {
        self.commands
            .send(command)
            .map_err(|_| MprisError::ClientClosed)
    }
}
