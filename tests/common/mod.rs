//! In-memory bus for driving the client in tests.

#![allow(dead_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use mpris2_client::{
    bus::{
        Bus, BusError, BusEvent, EventSink, MethodCall, PLAYER_INTERFACE, PropMap, PropValue,
        PropertyWrite, ROOT_INTERFACE, Subscription,
    },
    config::ClientConfig,
    mpris::{ClientEvent, MprisClient},
};

#[derive(Debug, Clone, Default)]
struct FakePlayer {
    root: PropMap,
    player: PropMap,
    broken: bool,
}

#[derive(Default)]
struct FakeState {
    order: Vec<String>,
    players: HashMap<String, FakePlayer>,
    player_sinks: Vec<(String, EventSink)>,
    owner_sinks: Vec<EventSink>,
    calls: Vec<(String, MethodCall)>,
    writes: Vec<(String, PropertyWrite)>,
    position_delay: Option<Duration>,
}

/// Bus whose players are plain property maps
#[derive(Default)]
pub struct FakeBus {
    state: Mutex<FakeState>,
}

impl FakeBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Put a player on the bus and announce it
    pub fn add_player(&self, name: &str, root: PropMap, player: PropMap) {
        self.insert(name, root, player, false);
    }

    /// Put a player on the bus that fails every property read
    pub fn add_broken_player(&self, name: &str) {
        self.insert(name, PropMap::new(), PropMap::new(), true);
    }

    fn insert(&self, name: &str, root: PropMap, player: PropMap, broken: bool) {
        let mut state = self.state.lock().unwrap();
        if !state.order.iter().any(|known| known == name) {
            state.order.push(name.to_string());
        }
        state.players.insert(
            name.to_string(),
            FakePlayer {
                root,
                player,
                broken,
            },
        );

        for sink in &state.owner_sinks {
            sink.send(BusEvent::NameOwnerChanged {
                name: name.to_string(),
                old_owner: None,
                new_owner: Some(":1.42".to_string()),
            });
        }
    }

    /// Take a player off the bus and announce it
    pub fn remove_player(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.order.retain(|known| known != name);
        state.players.remove(name);

        for sink in &state.owner_sinks {
            sink.send(BusEvent::NameOwnerChanged {
                name: name.to_string(),
                old_owner: Some(":1.42".to_string()),
                new_owner: None,
            });
        }
    }

    /// Update stored player properties without emitting anything
    pub fn set_player_property(&self, name: &str, property: &str, value: PropValue) {
        let mut state = self.state.lock().unwrap();
        if let Some(player) = state.players.get_mut(name) {
            player.player.insert(property.to_string(), value);
        }
    }

    /// Emit `PropertiesChanged` on every subscription ever made for `name`,
    /// including ones from earlier bindings
    pub fn emit_changed(&self, name: &str, interface: &str, changed: PropMap) {
        let state = self.state.lock().unwrap();
        for (sink_name, sink) in &state.player_sinks {
            if sink_name == name {
                sink.send(BusEvent::PropertiesChanged {
                    sender: name.to_string(),
                    interface: interface.to_string(),
                    changed: changed.clone(),
                    invalidated: Vec::new(),
                });
            }
        }
    }

    /// Emit `Seeked` on every subscription ever made for `name`
    pub fn emit_seeked(&self, name: &str, position: i64) {
        let state = self.state.lock().unwrap();
        for (sink_name, sink) in &state.player_sinks {
            if sink_name == name {
                sink.send(BusEvent::Seeked {
                    sender: name.to_string(),
                    position,
                });
            }
        }
    }

    /// Answer `Position` reads with the value current at call time, but only
    /// after `delay`
    pub fn delay_position_reads(&self, delay: Duration) {
        self.state.lock().unwrap().position_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<(String, MethodCall)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<(String, PropertyWrite)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn subscription_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .player_sinks
            .iter()
            .filter(|(sink_name, _)| sink_name == name)
            .count()
    }

    fn player(&self, bus_name: &str) -> Result<FakePlayer, BusError> {
        let state = self.state.lock().unwrap();
        match state.players.get(bus_name) {
            Some(player) if !player.broken => Ok(player.clone()),
            Some(_) => Err(BusError::Rejected(format!("{bus_name} is not responding"))),
            None => Err(BusError::Rejected(format!("{bus_name} has no owner"))),
        }
    }
}

#[async_trait]
impl Bus for FakeBus {
    async fn list_names(&self, prefix: &str) -> Result<Vec<String>, BusError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .order
            .iter()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_all(&self, bus_name: &str, interface: &str) -> Result<PropMap, BusError> {
        let player = self.player(bus_name)?;
        match interface {
            ROOT_INTERFACE => Ok(player.root),
            PLAYER_INTERFACE => Ok(player.player),
            other => Err(BusError::Rejected(format!("no interface {other}"))),
        }
    }

    async fn get(
        &self,
        bus_name: &str,
        interface: &str,
        property: &str,
    ) -> Result<PropValue, BusError> {
        let value = self
            .get_all(bus_name, interface)
            .await?
            .remove(property)
            .ok_or_else(|| BusError::MissingProperty {
                property: property.to_string(),
            });

        let delay = self.state.lock().unwrap().position_delay;
        if property == "Position"
            && let Some(delay) = delay
        {
            tokio::time::sleep(delay).await;
        }

        value
    }

    async fn call(&self, bus_name: &str, call: MethodCall) -> Result<(), BusError> {
        self.player(bus_name)?;
        self.state
            .lock()
            .unwrap()
            .calls
            .push((bus_name.to_string(), call));
        Ok(())
    }

    async fn set(&self, bus_name: &str, write: PropertyWrite) -> Result<(), BusError> {
        self.player(bus_name)?;
        self.state
            .lock()
            .unwrap()
            .writes
            .push((bus_name.to_string(), write));
        Ok(())
    }

    async fn subscribe_player(
        &self,
        bus_name: &str,
        sink: EventSink,
    ) -> Result<Subscription, BusError> {
        self.state
            .lock()
            .unwrap()
            .player_sinks
            .push((bus_name.to_string(), sink));
        Ok(Subscription::detached())
    }

    async fn subscribe_name_owner_changed(
        &self,
        sink: EventSink,
    ) -> Result<Subscription, BusError> {
        self.state.lock().unwrap().owner_sinks.push(sink);
        Ok(Subscription::detached())
    }
}

pub const VLC: &str = "org.mpris.MediaPlayer2.vlc";
pub const SPOTIFY: &str = "org.mpris.MediaPlayer2.spotify";

pub fn props(entries: &[(&str, PropValue)]) -> PropMap {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

pub fn track(id: &str, title: &str, length: i64) -> PropValue {
    PropValue::Dict(props(&[
        ("mpris:trackid", PropValue::ObjectPath(id.to_string())),
        ("xesam:title", PropValue::from(title)),
        ("xesam:artist", PropValue::from(vec!["Artist"])),
        ("mpris:length", PropValue::Int(length)),
    ]))
}

pub fn root_props(identity: &str) -> PropMap {
    props(&[
        ("Identity", PropValue::from(identity)),
        ("DesktopEntry", PropValue::from(identity.to_lowercase())),
        ("CanQuit", PropValue::Bool(true)),
        ("CanRaise", PropValue::Bool(false)),
    ])
}

/// A playing player at 5 s into a 3 minute track, with full control
pub fn playing_props() -> PropMap {
    props(&[
        ("PlaybackStatus", PropValue::from("Playing")),
        ("Metadata", track("/org/vlc/track/1", "First", 180_000_000)),
        ("Volume", PropValue::Double(0.8)),
        ("Rate", PropValue::Double(1.0)),
        ("Position", PropValue::Int(5_000_000)),
        ("LoopStatus", PropValue::from("None")),
        ("Shuffle", PropValue::Bool(false)),
        ("CanGoNext", PropValue::Bool(true)),
        ("CanGoPrevious", PropValue::Bool(true)),
        ("CanPlay", PropValue::Bool(true)),
        ("CanPause", PropValue::Bool(true)),
        ("CanSeek", PropValue::Bool(true)),
        ("CanControl", PropValue::Bool(true)),
        ("MinimumRate", PropValue::Double(0.5)),
        ("MaximumRate", PropValue::Double(2.0)),
    ])
}

pub async fn client(bus: &Arc<FakeBus>, config: ClientConfig) -> MprisClient {
    let bus: Arc<dyn Bus> = Arc::clone(bus) as Arc<dyn Bus>;
    MprisClient::new(bus, config).await.unwrap()
}

/// Wait for the first event matching `predicate`, skipping others
pub async fn next_matching<S>(
    events: &mut S,
    mut predicate: impl FnMut(&ClientEvent) -> bool,
) -> ClientEvent
where
    S: Stream<Item = ClientEvent> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let event = events.next().await.unwrap();
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

/// Let every task run until the runtime is idle
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
