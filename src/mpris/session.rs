use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;

use super::{
    BindState, Capabilities, ClientEvent, LoopStatus, Metadata, PlaybackStatus, PlayerRef,
    PositionEstimator,
};
use crate::bus::{PLAYER_INTERFACE, PropMap, PropValue, ROOT_INTERFACE};

/// State of the bound player.
///
/// Owned by the dispatcher, which feeds it signals and publishes a clone
/// after every change. The mutating methods return the notifications the
/// change produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    state: BindState,
    generation: u64,
    player: Option<PlayerRef>,
    metadata: Arc<Metadata>,
    capabilities: Capabilities,
    status: PlaybackStatus,
    volume: f64,
    loop_status: LoopStatus,
    shuffle: bool,
    fullscreen: bool,
    estimator: PositionEstimator,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

/// Values decoded from one property batch, keyed by meaning rather than
/// arrival order.
#[derive(Debug, Default)]
struct Update<'a> {
    status: Option<PlaybackStatus>,
    metadata: Option<Metadata>,
    volume: Option<f64>,
    loop_status: Option<LoopStatus>,
    shuffle: Option<bool>,
    rate: Option<f64>,
    fullscreen: Option<bool>,
    position: Option<i64>,
    capabilities: Vec<(&'a str, &'a PropValue)>,
}

impl<'a> Update<'a> {
    fn decode(changed: &'a PropMap) -> Self {
        let mut update = Self::default();

        for (name, value) in changed {
            let decoded = match name.as_str() {
                "PlaybackStatus" => value
                    .as_str()
                    .and_then(|status| PlaybackStatus::try_from(status).ok())
                    .map(|status| update.status = Some(status)),
                "Metadata" => value
                    .as_dict()
                    .map(|dict| update.metadata = Some(Metadata::from_properties(dict))),
                "Volume" => value
                    .as_f64()
                    .filter(|volume| volume.is_finite())
                    .map(|volume| update.volume = Some(volume.max(0.0))),
                "LoopStatus" => value
                    .as_str()
                    .and_then(|status| LoopStatus::try_from(status).ok())
                    .map(|status| update.loop_status = Some(status)),
                "Shuffle" => value.as_bool().map(|shuffle| update.shuffle = Some(shuffle)),
                "Rate" => value.as_f64().map(|rate| update.rate = Some(rate)),
                "Fullscreen" => value
                    .as_bool()
                    .map(|fullscreen| update.fullscreen = Some(fullscreen)),
                "Position" => value.as_i64().map(|position| update.position = Some(position)),
                _ => Some(()),
            };

            if decoded.is_none() {
                debug!(property = %name, ?value, "Skipping malformed property");
            }

            update.capabilities.push((name.as_str(), value));
        }

        update
    }
}

impl Session {
    /// Unbound session with default state
    pub fn new(now: Instant) -> Self {
        Self {
            state: BindState::Unbound,
            generation: 0,
            player: None,
            metadata: Arc::new(Metadata::default()),
            capabilities: Capabilities::default(),
            status: PlaybackStatus::Stopped,
            volume: 0.0,
            loop_status: LoopStatus::None,
            shuffle: false,
            fullscreen: false,
            estimator: PositionEstimator::new(now),
        }
    }

    /// Binding state
    pub fn state(&self) -> BindState {
        self.state
    }

    /// Whether a player is bound
    pub fn is_connected(&self) -> bool {
        self.state == BindState::Bound
    }

    /// Whether a player is bound and playing
    pub fn is_playing(&self) -> bool {
        self.is_connected() && self.status == PlaybackStatus::Playing
    }

    /// Generation of the current binding
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bound (or binding) player
    pub fn player(&self) -> Option<&PlayerRef> {
        self.player.as_ref()
    }

    /// Current track
    pub fn metadata(&self) -> Arc<Metadata> {
        Arc::clone(&self.metadata)
    }

    /// Capability registry
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Playback status
    pub fn playback_status(&self) -> PlaybackStatus {
        self.status
    }

    /// Playback rate
    pub fn rate(&self) -> f64 {
        self.estimator.rate()
    }

    /// Volume, 1.0 being the player's nominal level
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Loop mode, `None` when the player doesn't report one
    pub fn loop_status(&self) -> LoopStatus {
        if self.capabilities.has_loop_status() {
            self.loop_status
        } else {
            LoopStatus::None
        }
    }

    /// Shuffle, `false` when the player doesn't report it
    pub fn shuffle(&self) -> bool {
        self.capabilities.has_shuffle() && self.shuffle
    }

    /// Fullscreen state
    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Estimated position in microseconds at `now`
    pub fn position(&self, now: Instant) -> i64 {
        self.estimator.estimate(now)
    }

    /// Drop all player state and start binding to `player`.
    ///
    /// Returns the generation signals for the new binding must carry.
    pub(crate) fn begin_binding(&mut self, player: PlayerRef, now: Instant) -> u64 {
        self.reset(now);
        self.state = BindState::Binding;
        self.player = Some(player);
        self.generation
    }

    /// Apply the initial snapshot and mark the session bound
    pub(crate) fn complete_binding(
        &mut self,
        root: &PropMap,
        player: &PropMap,
        now: Instant,
    ) -> Vec<ClientEvent> {
        self.capabilities = Capabilities::from_snapshot(root, player);
        self.absorb(Update::decode(root), now);
        self.absorb(Update::decode(player), now);
        self.state = BindState::Bound;

        let mut events = vec![
            ClientEvent::Connection(true),
            ClientEvent::PlaybackStatus(self.status),
            ClientEvent::Metadata(self.metadata()),
            ClientEvent::Volume(self.volume),
        ];
        if self.capabilities.has_loop_status() {
            events.push(ClientEvent::LoopStatus(self.loop_status));
        }
        if self.capabilities.has_shuffle() {
            events.push(ClientEvent::Shuffle(self.shuffle));
        }
        events
    }

    /// Give up on a binding that failed before completing
    pub(crate) fn abort_binding(&mut self, now: Instant) {
        self.reset(now);
    }

    /// Drop the binding. Emits `Connection(false)` only if one was active.
    pub(crate) fn unbind(&mut self, now: Instant) -> Option<ClientEvent> {
        let was_bound = self.is_connected();
        self.reset(now);
        was_bound.then_some(ClientEvent::Connection(false))
    }

    /// Apply a `PropertiesChanged` batch.
    ///
    /// The result does not depend on the order of keys inside the batch.
    pub(crate) fn apply_properties_changed(
        &mut self,
        interface: &str,
        changed: &PropMap,
        now: Instant,
    ) -> Vec<ClientEvent> {
        if interface != PLAYER_INTERFACE && interface != ROOT_INTERFACE {
            debug!(interface, "Ignoring changes on unhandled interface");
            return Vec::new();
        }

        self.absorb(Update::decode(changed), now)
    }

    /// Apply a `Seeked` signal
    pub(crate) fn apply_seeked(&mut self, position: i64, now: Instant) -> ClientEvent {
        self.estimator.jump(position, now);
        ClientEvent::Position(self.estimator.estimate(now))
    }

    /// Replace the baseline with a position read from the player.
    ///
    /// `epoch` is the [`position_epoch`](Self::position_epoch) observed when
    /// the read started; reads that straddle a seek or track change are
    /// discarded. Returns whether the position was applied.
    pub(crate) fn apply_position(&mut self, position: i64, epoch: u64, now: Instant) -> bool {
        if epoch != self.estimator.epoch() {
            return false;
        }
        self.estimator.rebase(position, now);
        true
    }

    /// Counter bumped whenever the position jumps (seek, track change or a
    /// reported position)
    pub(crate) fn position_epoch(&self) -> u64 {
        self.estimator.epoch()
    }

    /// Periodic estimate while bound and playing
    pub(crate) fn tick(&self, now: Instant) -> Option<ClientEvent> {
        self.is_playing()
            .then(|| ClientEvent::PlaybackTick(self.estimator.estimate(now)))
    }

    fn reset(&mut self, now: Instant) {
        let generation = self.generation.wrapping_add(1);
        *self = Self::new(now);
        self.generation = generation;
    }

    fn absorb(&mut self, update: Update<'_>, now: Instant) -> Vec<ClientEvent> {
        let mut events = Vec::new();

        let mut capabilities_changed = false;
        for (name, value) in &update.capabilities {
            capabilities_changed |= self.capabilities.apply(name, value);
        }

        let status_changed = update.status.filter(|status| *status != self.status);
        if let Some(status) = status_changed {
            self.estimator.set_status(status, now);
            self.status = status;
        }

        let rate_changed = update
            .rate
            .filter(|rate| *rate > 0.0 && *rate != self.estimator.rate());
        if let Some(rate) = rate_changed {
            self.estimator.set_rate(rate, now);
        }

        let metadata_changed = update.metadata.filter(|metadata| *metadata != *self.metadata);
        let mut rebased = false;
        if let Some(metadata) = &metadata_changed {
            self.estimator.set_length(metadata.length());
            if self.metadata.is_different_track(metadata) {
                self.estimator.jump(update.position.unwrap_or(0), now);
                rebased = true;
            }
        }
        if !rebased && let Some(position) = update.position {
            self.estimator.jump(position, now);
        }

        if let Some(status) = status_changed {
            events.push(ClientEvent::PlaybackStatus(status));
        }

        if let Some(metadata) = metadata_changed {
            self.metadata = Arc::new(metadata);
            events.push(ClientEvent::Metadata(self.metadata()));
        }

        if let Some(volume) = update.volume.filter(|volume| *volume != self.volume) {
            self.volume = volume;
            events.push(ClientEvent::Volume(volume));
        }

        if let Some(loop_status) = update
            .loop_status
            .filter(|loop_status| *loop_status != self.loop_status)
        {
            self.loop_status = loop_status;
            if self.capabilities.has_loop_status() {
                events.push(ClientEvent::LoopStatus(loop_status));
            }
        }

        if let Some(shuffle) = update.shuffle.filter(|shuffle| *shuffle != self.shuffle) {
            self.shuffle = shuffle;
            if self.capabilities.has_shuffle() {
                events.push(ClientEvent::Shuffle(shuffle));
            }
        }

        if let Some(rate) = rate_changed {
            events.push(ClientEvent::Rate(rate));
        }

        if let Some(fullscreen) = update
            .fullscreen
            .filter(|fullscreen| *fullscreen != self.fullscreen)
        {
            self.fullscreen = fullscreen;
            events.push(ClientEvent::Fullscreen(fullscreen));
        }

        if capabilities_changed {
            events.push(ClientEvent::CapabilitiesChanged);
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use super::*;

    fn vlc() -> PlayerRef {
        PlayerRef::from_bus_name("org.mpris.MediaPlayer2.vlc")
    }

    fn track(id: &str) -> PropValue {
        PropValue::Dict(HashMap::from([
            ("mpris:trackid".to_string(), PropValue::ObjectPath(id.to_string())),
            ("xesam:title".to_string(), PropValue::from(id)),
            ("mpris:length".to_string(), PropValue::Int(300_000_000)),
        ]))
    }

    fn player_props() -> PropMap {
        HashMap::from([
            ("PlaybackStatus".to_string(), PropValue::from("Playing")),
            ("Metadata".to_string(), track("/t/1")),
            ("Volume".to_string(), PropValue::Double(0.7)),
            ("LoopStatus".to_string(), PropValue::from("Playlist")),
            ("Rate".to_string(), PropValue::Double(1.0)),
            ("Position".to_string(), PropValue::Int(5_000_000)),
            ("CanPlay".to_string(), PropValue::Bool(true)),
            ("CanControl".to_string(), PropValue::Bool(true)),
        ])
    }

    fn bound(now: Instant) -> Session {
        let mut session = Session::new(now);
        session.begin_binding(vlc(), now);
        session.complete_binding(&PropMap::new(), &player_props(), now);
        session
    }

    #[test]
    fn binding_emits_connection_then_initial_state() {
        let now = Instant::now();
        let mut session = Session::new(now);

        let generation = session.begin_binding(vlc(), now);
        assert_eq!(session.state(), BindState::Binding);

        let events = session.complete_binding(&PropMap::new(), &player_props(), now);

        assert!(session.is_connected());
        assert_eq!(session.generation(), generation);
        assert_eq!(events[0], ClientEvent::Connection(true));
        assert_eq!(events[1], ClientEvent::PlaybackStatus(PlaybackStatus::Playing));
        assert!(matches!(events[2], ClientEvent::Metadata(_)));
        assert_eq!(events[3], ClientEvent::Volume(0.7));
        assert_eq!(events[4], ClientEvent::LoopStatus(LoopStatus::Playlist));
        assert_eq!(events.len(), 5);
        assert_eq!(session.position(now), 5_000_000);
    }

    #[test]
    fn unchanged_values_emit_nothing() {
        let now = Instant::now();
        let mut session = bound(now);

        let events =
            session.apply_properties_changed(PLAYER_INTERFACE, &player_props(), now);

        assert!(events.is_empty());
    }

    #[test]
    fn batch_notifications_follow_fixed_order() {
        let now = Instant::now();
        let mut session = bound(now);

        let changed = HashMap::from([
            ("Shuffle".to_string(), PropValue::Bool(true)),
            ("Volume".to_string(), PropValue::Double(0.2)),
            ("Metadata".to_string(), track("/t/2")),
            ("PlaybackStatus".to_string(), PropValue::from("Paused")),
        ]);
        let events = session.apply_properties_changed(PLAYER_INTERFACE, &changed, now);

        let kinds: Vec<_> = events.iter().map(ClientEvent::kind).collect();
        assert_eq!(
            kinds,
            [
                "playback_status",
                "metadata",
                "volume",
                "shuffle",
                "capabilities"
            ]
        );
        assert!(session.capabilities().has_shuffle());
    }

    #[test]
    fn track_change_resets_baseline() {
        let start = Instant::now();
        let mut session = bound(start);
        let later = start + Duration::from_secs(10);
        assert_eq!(session.position(later), 15_000_000);

        let changed = HashMap::from([("Metadata".to_string(), track("/t/2"))]);
        session.apply_properties_changed(PLAYER_INTERFACE, &changed, later);
        assert_eq!(session.position(later), 0);

        let changed = HashMap::from([
            ("Metadata".to_string(), track("/t/3")),
            ("Position".to_string(), PropValue::Int(2_000_000)),
        ]);
        session.apply_properties_changed(PLAYER_INTERFACE, &changed, later);
        assert_eq!(session.position(later), 2_000_000);
    }

    #[test]
    fn same_track_metadata_update_keeps_position() {
        let start = Instant::now();
        let mut session = bound(start);

        let mut tags = HashMap::from([
            ("mpris:trackid".to_string(), PropValue::ObjectPath("/t/1".to_string())),
            ("xesam:title".to_string(), PropValue::from("Renamed")),
        ]);
        tags.insert("mpris:length".into(), PropValue::Int(300_000_000));
        let changed = HashMap::from([("Metadata".to_string(), PropValue::Dict(tags))]);

        let events = session.apply_properties_changed(PLAYER_INTERFACE, &changed, start);

        assert_eq!(events.len(), 1);
        assert_eq!(session.position(start), 5_000_000);
    }

    #[test]
    fn pause_freezes_estimate() {
        let start = Instant::now();
        let mut session = bound(start);

        let paused_at = start + Duration::from_secs(1);
        let changed = HashMap::from([("PlaybackStatus".to_string(), PropValue::from("Paused"))]);
        session.apply_properties_changed(PLAYER_INTERFACE, &changed, paused_at);

        assert_eq!(session.position(paused_at + Duration::from_secs(30)), 6_000_000);
        assert_eq!(session.tick(paused_at), None);
    }

    #[test]
    fn seeked_rebases_and_notifies() {
        let start = Instant::now();
        let mut session = bound(start);

        let event = session.apply_seeked(0, start + Duration::from_secs(3));

        assert_eq!(event, ClientEvent::Position(0));
        assert_eq!(
            session.tick(start + Duration::from_millis(3_500)),
            Some(ClientEvent::PlaybackTick(500_000))
        );
    }

    #[test]
    fn position_read_started_before_a_jump_is_discarded() {
        let start = Instant::now();
        let mut session = bound(start);
        let epoch = session.position_epoch();

        session.apply_seeked(0, start);

        assert!(!session.apply_position(170_000_000, epoch, start));
        assert_eq!(session.position(start), 0);

        let epoch = session.position_epoch();
        assert!(session.apply_position(1_000_000, epoch, start));
        assert_eq!(session.position(start), 1_000_000);
    }

    #[test]
    fn malformed_field_is_skipped_alone() {
        let now = Instant::now();
        let mut session = bound(now);

        let changed = HashMap::from([
            ("PlaybackStatus".to_string(), PropValue::from("Buffering")),
            ("Volume".to_string(), PropValue::from("loud")),
            ("Fullscreen".to_string(), PropValue::Bool(true)),
        ]);
        let events = session.apply_properties_changed(ROOT_INTERFACE, &changed, now);

        assert_eq!(events, [ClientEvent::Fullscreen(true)]);
        assert_eq!(session.playback_status(), PlaybackStatus::Playing);
        assert!((session.volume() - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn gated_values_hidden_without_capability() {
        let now = Instant::now();
        let mut session = Session::new(now);
        session.begin_binding(vlc(), now);
        session.complete_binding(&PropMap::new(), &PropMap::new(), now);

        assert!(!session.capabilities().has_loop_status());
        assert_eq!(session.loop_status(), LoopStatus::None);
        assert!(!session.shuffle());
    }

    #[test]
    fn unbind_notifies_once_and_resets() {
        let now = Instant::now();
        let mut session = bound(now);
        let generation = session.generation();

        assert_eq!(session.unbind(now), Some(ClientEvent::Connection(false)));
        assert_eq!(session.unbind(now), None);
        assert!(session.generation() > generation);
        assert_eq!(session.player(), None);
        assert_eq!(session.playback_status(), PlaybackStatus::Stopped);
        assert!(session.metadata().is_empty());
        assert!(!session.capabilities().can_play());
    }

    #[test]
    fn unknown_interface_is_ignored() {
        let now = Instant::now();
        let mut session = bound(now);

        let changed = HashMap::from([("Volume".to_string(), PropValue::Double(0.1))]);
        let events =
            session.apply_properties_changed("org.mpris.MediaPlayer2.TrackList", &changed, now);

        assert!(events.is_empty());
    }
}
