use std::sync::Arc;

use tokio::{
    sync::{broadcast, mpsc, watch},
    time::{Instant, MissedTickBehavior, interval, timeout},
};
use tracing::{debug, info, instrument, warn};

use super::{
    ClientEvent, MprisError, PlayerRef, Session,
    commands::{Command, Reply},
    discovery::{Discovery, select_player},
};
use crate::{
    bus::{
        Bus, BusError, BusEvent, EventSink, MethodCall, PLAYER_INTERFACE, PropMap, PropertyWrite,
        ROOT_INTERFACE, Subscription, TaggedEvent,
    },
    common::Property,
    config::ClientConfig,
};

/// Results of work the dispatcher spawned off its own task
#[derive(Debug)]
pub(crate) enum Internal {
    /// Position read from the player for the given binding, started at the
    /// given position epoch
    Resync {
        generation: u64,
        epoch: u64,
        position: i64,
    },
}

/// Channel ends the dispatcher consumes
pub(crate) struct Inbox {
    pub commands: mpsc::UnboundedReceiver<Command>,
    pub signals: mpsc::UnboundedReceiver<TaggedEvent>,
}

/// State the dispatcher shares with client handles
pub(crate) struct Shared {
    pub session: Property<Session>,
    pub preferred: Property<Option<String>>,
    pub strict: Property<bool>,
    pub events: broadcast::Sender<ClientEvent>,
}

/// Single task owning the [`Session`].
///
/// Commands, bus signals, ticks and resync results are all handled here in
/// arrival order, so session state never needs a lock.
pub(crate) struct Dispatcher {
    bus: Arc<dyn Bus>,
    config: ClientConfig,
    discovery: Discovery,
    session: Session,
    subscription: Option<Subscription>,
    shared: Shared,
    auto_mode: bool,
    players: Vec<String>,
    signal_tx: mpsc::UnboundedSender<TaggedEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    in_flight: Arc<watch::Sender<usize>>,
}

impl Dispatcher {
    pub(crate) fn new(
        bus: Arc<dyn Bus>,
        config: ClientConfig,
        shared: Shared,
        signal_tx: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Self {
        let discovery = Discovery::new(
            Arc::clone(&bus),
            config.ignored_players.clone(),
            config.discovery_timeout(),
        );
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (in_flight, _) = watch::channel(0);

        Self {
            bus,
            config,
            discovery,
            session: Session::new(Instant::now()),
            subscription: None,
            shared,
            auto_mode: false,
            players: Vec::new(),
            signal_tx,
            internal_tx,
            internal_rx,
            in_flight: Arc::new(in_flight),
        }
    }

    /// Process events until every client handle is gone.
    ///
    /// `watcher` keeps the name-owner subscription alive for the lifetime of
    /// the loop.
    pub(crate) async fn run(mut self, mut inbox: Inbox, watcher: Subscription) {
        let mut tick = interval(self.config.tick_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut resync = interval(self.config.resync_interval());
        resync.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = inbox.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.handle_command(command).await;
                }
                Some(tagged) = inbox.signals.recv() => {
                    self.handle_signal(tagged).await;
                }
                Some(internal) = self.internal_rx.recv() => {
                    self.handle_internal(internal);
                }
                _ = tick.tick() => {
                    if let Some(event) = self.session.tick(Instant::now()) {
                        self.emit(event);
                    }
                }
                _ = resync.tick() => {
                    self.resync();
                }
            }
        }

        drop(watcher);
        self.unbind();
        info!("MPRIS client dispatcher stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Call(call) => self.dispatch_call(call),
            Command::Write(write) => self.dispatch_write(write),
            Command::SetPlayer(preferred) => self.set_player(preferred).await,
            Command::AutoConnect(reply) => {
                let result = self.auto_connect().await;
                let _ = reply.send(result);
            }
            Command::Disconnect => {
                self.auto_mode = false;
                self.unbind();
            }
            Command::AccuratePosition(reply) => self.accurate_position(reply),
            Command::Flush(reply) => {
                let mut in_flight = self.in_flight.subscribe();
                tokio::spawn(async move {
                    let _ = in_flight.wait_for(|count| *count == 0).await;
                    let _ = reply.send(());
                });
            }
        }
    }

    async fn handle_signal(&mut self, tagged: TaggedEvent) {
        match tagged.event {
            BusEvent::NameOwnerChanged {
                name,
                old_owner,
                new_owner,
            } => {
                self.owner_changed(name, old_owner, new_owner).await;
            }
            BusEvent::PropertiesChanged {
                interface, changed, ..
            } => {
                if !self.is_current(tagged.generation) {
                    debug!(generation = tagged.generation, "Dropping stale PropertiesChanged");
                    return;
                }

                let events =
                    self.session
                        .apply_properties_changed(&interface, &changed, Instant::now());
                if !events.is_empty() {
                    self.publish();
                    self.emit_all(events);
                }
            }
            BusEvent::Seeked { position, .. } => {
                if !self.is_current(tagged.generation) {
                    debug!(generation = tagged.generation, "Dropping stale Seeked");
                    return;
                }

                let event = self.session.apply_seeked(position, Instant::now());
                self.publish();
                self.emit(event);
            }
        }
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::Resync {
                generation,
                epoch,
                position,
            } => {
                if !self.is_current(generation) {
                    return;
                }
                if self.session.apply_position(position, epoch, Instant::now()) {
                    self.publish();
                } else {
                    debug!(position, "Dropping position read overtaken by a jump");
                }
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session.is_connected() && generation == self.session.generation()
    }

    fn bound_name(&self) -> Option<String> {
        self.session
            .is_connected()
            .then(|| self.session.player().map(|player| player.bus_name.clone()))
            .flatten()
    }

    fn dispatch_call(&self, call: MethodCall) {
        let Some(bus_name) = self.bound_name() else {
            debug!(%call, "Dropping call, no player bound");
            return;
        };

        if self.shared.strict.get() && !self.session.capabilities().permits_call(&call) {
            debug!(%call, "Dropping call the player doesn't support");
            return;
        }

        let bus = Arc::clone(&self.bus);
        self.spawn_outbound(async move {
            if let Err(e) = bus.call(&bus_name, call.clone()).await {
                warn!(player = %bus_name, %call, error = %e, "Player call failed");
            }
        });
    }

    fn dispatch_write(&self, write: PropertyWrite) {
        let Some(bus_name) = self.bound_name() else {
            debug!(%write, "Dropping property write, no player bound");
            return;
        };

        if self.shared.strict.get() && !self.session.capabilities().permits_write(&write) {
            debug!(%write, "Dropping property write the player doesn't support");
            return;
        }

        let bus = Arc::clone(&self.bus);
        self.spawn_outbound(async move {
            if let Err(e) = bus.set(&bus_name, write.clone()).await {
                warn!(player = %bus_name, %write, error = %e, "Property write failed");
            }
        });
    }

    fn spawn_outbound(&self, task: impl Future<Output = ()> + Send + 'static) {
        self.in_flight.send_modify(|count| *count += 1);
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            task.await;
            in_flight.send_modify(|count| *count = count.saturating_sub(1));
        });
    }

    fn resync(&self) {
        if !self.session.is_playing() {
            return;
        }
        let Some(bus_name) = self.bound_name() else {
            return;
        };

        let bus = Arc::clone(&self.bus);
        let internal_tx = self.internal_tx.clone();
        let generation = self.session.generation();
        let epoch = self.session.position_epoch();
        let limit = self.config.bind_timeout();

        tokio::spawn(async move {
            match read_position(bus.as_ref(), &bus_name, limit).await {
                Ok(position) => {
                    let _ = internal_tx.send(Internal::Resync {
                        generation,
                        epoch,
                        position,
                    });
                }
                Err(e) => debug!(player = %bus_name, error = %e, "Position resync failed"),
            }
        });
    }

    fn accurate_position(&self, reply: Reply<i64>) {
        let Some(bus_name) = self.bound_name() else {
            let _ = reply.send(Err(MprisError::NotConnected));
            return;
        };

        let bus = Arc::clone(&self.bus);
        let internal_tx = self.internal_tx.clone();
        let generation = self.session.generation();
        let epoch = self.session.position_epoch();
        let limit = self.config.bind_timeout();

        tokio::spawn(async move {
            let result = read_position(bus.as_ref(), &bus_name, limit).await;
            if let Ok(position) = result {
                let _ = internal_tx.send(Internal::Resync {
                    generation,
                    epoch,
                    position,
                });
            }
            let _ = reply.send(result);
        });
    }

    #[instrument(skip(self))]
    async fn set_player(&mut self, preferred: Option<String>) {
        self.shared.preferred.set(preferred.clone());

        let Some(query) = preferred else {
            info!("Preferred player cleared, disconnecting");
            self.auto_mode = false;
            self.unbind();
            return;
        };

        let bound_matches = self
            .session
            .player()
            .is_some_and(|player| player.matches(&query));
        if self.session.is_connected() && bound_matches {
            return;
        }

        if !self.session.is_connected() {
            if self.auto_mode {
                self.reconnect().await;
            }
            return;
        }

        let players = match self.discovery.list_players().await {
            Ok(players) => players,
            Err(e) => {
                warn!(error = %e, "Cannot list players for preference change");
                return;
            }
        };

        match players.into_iter().find(|player| player.matches(&query)) {
            Some(player) => {
                if let Err(e) = self.bind(player).await {
                    warn!(error = %e, "Failed to bind preferred player");
                }
            }
            None => info!(player = %query, "Preferred player not running, keeping current"),
        }
    }

    #[instrument(skip(self))]
    async fn auto_connect(&mut self) -> Result<bool, MprisError> {
        self.auto_mode = self.config.auto_reconnect;

        let players = self.discovery.list_players().await?;
        self.players = players.iter().map(|player| player.bus_name.clone()).collect();

        let preferred = self.shared.preferred.get();
        let Some(target) = select_player(&players, preferred.as_deref()).cloned() else {
            info!("No MPRIS players available");
            self.unbind();
            return Ok(false);
        };

        let already_bound = self.session.is_connected()
            && self
                .session
                .player()
                .is_some_and(|player| player.bus_name == target.bus_name);
        if already_bound {
            return Ok(true);
        }

        self.bind(target).await?;
        Ok(true)
    }

    async fn reconnect(&mut self) {
        match self.auto_connect().await {
            Ok(true) => {}
            Ok(false) => debug!("Nothing to reconnect to"),
            Err(e) => warn!(error = %e, "Automatic reconnect failed"),
        }
    }

    #[instrument(skip(self, old_owner, new_owner))]
    async fn owner_changed(
        &mut self,
        name: String,
        old_owner: Option<String>,
        new_owner: Option<String>,
    ) {
        if self.discovery.should_ignore_player(&name) {
            return;
        }

        let is_bound = self
            .bound_name()
            .is_some_and(|bound| bound == name);

        match (old_owner, new_owner) {
            (Some(_), None) => {
                self.players.retain(|known| *known != name);
                self.emit(ClientEvent::PlayersChanged(self.players.clone()));

                if is_bound {
                    info!("Bound player left the bus");
                    self.unbind();
                    if self.auto_mode {
                        self.reconnect().await;
                    }
                }
            }
            (None, Some(_)) => {
                if !self.players.contains(&name) {
                    self.players.push(name.clone());
                }
                self.emit(ClientEvent::PlayersChanged(self.players.clone()));

                if !self.auto_mode {
                    return;
                }

                let preferred = self.shared.preferred.get();
                let is_preferred = preferred
                    .as_deref()
                    .is_some_and(|query| PlayerRef::from_bus_name(&name).matches(query));
                if !self.session.is_connected() || is_preferred {
                    self.reconnect().await;
                }
            }
            (Some(_), Some(_)) if is_bound => {
                info!("Bound player changed owner, rebinding");
                if let Some(player) = self.session.player().cloned()
                    && let Err(e) = self.bind(player).await
                {
                    warn!(error = %e, "Rebinding after owner change failed");
                }
            }
            _ => {}
        }
    }

    /// Replace the current binding with `player`
    #[instrument(skip(self, player), fields(player = %player.bus_name))]
    async fn bind(&mut self, player: PlayerRef) -> Result<(), MprisError> {
        self.unbind();

        let generation = self.session.begin_binding(player.clone(), Instant::now());
        self.publish();

        let sink = EventSink::new(generation, self.signal_tx.clone());
        let bus = Arc::clone(&self.bus);
        let bus_name = player.bus_name.clone();
        let fetch = async move {
            let subscription = bus.subscribe_player(&bus_name, sink).await?;
            let root = match bus.get_all(&bus_name, ROOT_INTERFACE).await {
                Ok(root) => root,
                Err(e) => {
                    warn!(error = %e, "Root interface unreadable, capabilities default to off");
                    PropMap::new()
                }
            };
            let properties = bus.get_all(&bus_name, PLAYER_INTERFACE).await?;
            Ok::<_, BusError>((subscription, root, properties))
        };

        match timeout(self.config.bind_timeout(), fetch).await {
            Ok(Ok((subscription, root, properties))) => {
                self.subscription = Some(subscription);
                let events = self
                    .session
                    .complete_binding(&root, &properties, Instant::now());
                self.publish();
                info!(generation, "Bound to player");
                self.emit_all(events);
                Ok(())
            }
            Ok(Err(e)) => {
                self.session.abort_binding(Instant::now());
                self.publish();
                warn!(error = %e, "Binding failed");
                Err(e.into())
            }
            Err(_) => {
                self.session.abort_binding(Instant::now());
                self.publish();
                warn!("Binding timed out");
                Err(MprisError::Timeout {
                    operation: format!("bind {}", player.bus_name),
                })
            }
        }
    }

    fn unbind(&mut self) {
        self.subscription = None;
        if let Some(event) = self.session.unbind(Instant::now()) {
            info!("Player unbound");
            self.emit(event);
        }
        self.publish();
    }

    fn publish(&self) {
        self.shared.session.set(self.session.clone());
    }

    fn emit(&self, event: ClientEvent) {
        debug!(event = event.kind(), "Emitting client event");
        let _ = self.shared.events.send(event);
    }

    fn emit_all(&self, events: Vec<ClientEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

async fn read_position(
    bus: &dyn Bus,
    bus_name: &str,
    limit: std::time::Duration,
) -> Result<i64, MprisError> {
    let value = timeout(limit, bus.get(bus_name, PLAYER_INTERFACE, "Position"))
        .await
        .map_err(|_| MprisError::Timeout {
            operation: "read position".to_string(),
        })??;

    value.as_i64().ok_or_else(|| MprisError::MalformedPayload {
        property: "Position".to_string(),
        reason: format!("expected an integer, got {value:?}"),
    })
}

