#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::panic)]

mod common;

use std::{sync::Arc, time::Duration};

use common::{
    FakeBus, SPOTIFY, VLC, client, next_matching, playing_props, props, root_props, settle, track,
};
use mpris2_client::{
    bus::{Bus, MethodCall, PLAYER_INTERFACE, PropValue, PropertyWrite},
    config::{ClientConfig, UnsupportedPolicy},
    mpris::{BindState, ClientEvent, LoopStatus, MprisClient, MprisError, PlaybackStatus},
};
use tokio::sync::broadcast;

fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn count(events: &[ClientEvent], predicate: impl Fn(&ClientEvent) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}

#[tokio::test(start_paused = true)]
async fn binds_first_player_and_reports_state() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;

    assert!(client.auto_connect().await.unwrap());

    assert!(client.is_connected());
    assert_eq!(client.state(), BindState::Bound);
    assert_eq!(client.identity().as_deref(), Some("VLC"));
    assert_eq!(client.playback_status(), PlaybackStatus::Playing);
    assert_eq!(client.metadata().title(), Some("First"));
    assert!((client.volume() - 0.8).abs() < f64::EPSILON);
    assert_eq!(client.loop_status(), LoopStatus::None);
    assert!(client.can_go_next());
    assert!(client.can_quit());
    assert!(!client.can_raise());
}

#[tokio::test(start_paused = true)]
async fn bind_announces_connection_then_state() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;
    let mut rx = client.subscribe();

    client.auto_connect().await.unwrap();
    let events = drain(&mut rx);

    assert!(matches!(events.first(), Some(ClientEvent::Connection(true))));
    assert_eq!(
        count(&events, |event| matches!(event, ClientEvent::PlaybackStatus(_))),
        1
    );
    assert_eq!(
        count(&events, |event| matches!(event, ClientEvent::Metadata(_))),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn position_advances_while_playing() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;
    client.auto_connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    let position = client.position();
    assert!(
        (position - 5_500_000).abs() < 1_000,
        "position was {position}"
    );
}

#[tokio::test(start_paused = true)]
async fn ticks_restart_from_seek_target() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;
    let mut events = Box::pin(client.events());
    client.auto_connect().await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    bus.emit_seeked(VLC, 0);

    let seeked = next_matching(&mut events, |event| matches!(event, ClientEvent::Position(_))).await;
    assert!(matches!(seeked, ClientEvent::Position(0)));

    let tick = next_matching(&mut events, |event| {
        matches!(event, ClientEvent::PlaybackTick(_))
    })
    .await;
    let ClientEvent::PlaybackTick(position) = tick else {
        panic!("expected a tick, got {tick:?}");
    };
    assert!((0..=600_000).contains(&position), "tick at {position}");
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_the_estimate() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;
    client.auto_connect().await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    bus.emit_changed(
        VLC,
        PLAYER_INTERFACE,
        props(&[("PlaybackStatus", PropValue::from("Paused"))]),
    );
    settle().await;

    let frozen = client.position();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(client.playback_status(), PlaybackStatus::Paused);
    assert_eq!(client.position(), frozen);
}

#[tokio::test(start_paused = true)]
async fn track_change_resets_position() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;
    let mut events = Box::pin(client.events());
    client.auto_connect().await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    bus.emit_changed(
        VLC,
        PLAYER_INTERFACE,
        props(&[("Metadata", track("/org/vlc/track/2", "Second", 200_000_000))]),
    );

    next_matching(&mut events, |event| matches!(event, ClientEvent::Metadata(_))).await;
    assert_eq!(client.metadata().title(), Some("Second"));
    assert!(client.position() < 100_000);
}

#[tokio::test(start_paused = true)]
async fn losing_the_player_disconnects_once() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;
    client.auto_connect().await.unwrap();
    let mut rx = client.subscribe();

    bus.remove_player(VLC);
    settle().await;
    bus.emit_changed(
        VLC,
        PLAYER_INTERFACE,
        props(&[("Volume", PropValue::Double(0.1))]),
    );
    settle().await;

    let events = drain(&mut rx);
    assert_eq!(
        count(&events, |event| matches!(event, ClientEvent::Connection(false))),
        1
    );
    assert_eq!(
        count(&events, |event| matches!(event, ClientEvent::Volume(_))),
        0
    );

    assert!(!client.is_connected());
    assert_eq!(client.state(), BindState::Unbound);
    assert_eq!(client.playback_status(), PlaybackStatus::Stopped);
    assert!(client.metadata().is_empty());
    assert!(!client.can_go_next());
    assert_eq!(client.position(), 0);
}

#[tokio::test(start_paused = true)]
async fn commands_need_a_binding() {
    let bus = FakeBus::new();
    let client = client(&bus, ClientConfig::default()).await;

    assert!(!client.auto_connect().await.unwrap());
    assert!(matches!(client.play(), Err(MprisError::NotConnected)));
    assert!(matches!(
        client.set_volume(0.5),
        Err(MprisError::NotConnected)
    ));
    assert!(matches!(
        client.accurate_position().await,
        Err(MprisError::NotConnected)
    ));
}

#[tokio::test(start_paused = true)]
async fn commands_reach_the_player() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;
    client.auto_connect().await.unwrap();

    client.next().unwrap();
    client.seek(-10_000_000).unwrap();
    client.seek_to(42_000_000).unwrap();
    client.set_volume(-1.0).unwrap();
    client.set_loop_status(LoopStatus::Playlist).unwrap();
    client.flush().await.unwrap();

    let calls: Vec<MethodCall> = bus.calls().into_iter().map(|(_, call)| call).collect();
    assert!(calls.contains(&MethodCall::Next));
    assert!(calls.contains(&MethodCall::Seek {
        offset: -10_000_000
    }));
    assert!(calls.contains(&MethodCall::SetPosition {
        track_id: "/org/vlc/track/1".to_string(),
        position: 42_000_000,
    }));

    let writes: Vec<PropertyWrite> = bus.writes().into_iter().map(|(_, write)| write).collect();
    assert!(writes.contains(&PropertyWrite::Volume(0.0)));
    assert!(writes.contains(&PropertyWrite::LoopStatus(LoopStatus::Playlist)));
}

#[tokio::test(start_paused = true)]
async fn strict_mode_skips_unsupported_commands() {
    let bus = FakeBus::new();
    let mut player = playing_props();
    player.insert("CanGoNext".to_string(), PropValue::Bool(false));
    bus.add_player(VLC, root_props("VLC"), player);

    let config = ClientConfig {
        strict_mode: true,
        ..ClientConfig::default()
    };
    let client = client(&bus, config).await;
    client.auto_connect().await.unwrap();

    assert!(client.next().is_ok());
    assert!(client.raise().is_ok());
    client.previous().unwrap();
    client.flush().await.unwrap();

    let calls: Vec<MethodCall> = bus.calls().into_iter().map(|(_, call)| call).collect();
    assert_eq!(calls, vec![MethodCall::Previous]);

    client.set_strict_mode(false);
    client.next().unwrap();
    client.flush().await.unwrap();
    assert!(bus.calls().iter().any(|(_, call)| *call == MethodCall::Next));
}

#[tokio::test(start_paused = true)]
async fn strict_mode_can_reject_instead() {
    let bus = FakeBus::new();
    let mut player = playing_props();
    player.insert("CanGoNext".to_string(), PropValue::Bool(false));
    bus.add_player(VLC, root_props("VLC"), player);

    let config = ClientConfig {
        strict_mode: true,
        unsupported_policy: UnsupportedPolicy::Reject,
        ..ClientConfig::default()
    };
    let client = client(&bus, config).await;
    client.auto_connect().await.unwrap();

    let result = client.next();
    assert!(matches!(
        result,
        Err(MprisError::UnsupportedOperation { ref operation }) if operation.contains("next")
    ));
    assert!(matches!(
        client.set_rate(4.0),
        Err(MprisError::UnsupportedOperation { .. })
    ));
    assert!(client.set_rate(1.5).is_ok());
}

#[tokio::test(start_paused = true)]
async fn rebinding_is_idempotent() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;

    client.auto_connect().await.unwrap();
    let capabilities = client.capabilities();
    let metadata = client.metadata();

    client.disconnect().unwrap();
    settle().await;
    assert!(!client.is_connected());

    client.auto_connect().await.unwrap();
    assert_eq!(client.capabilities(), capabilities);
    assert_eq!(client.metadata(), metadata);
}

#[tokio::test(start_paused = true)]
async fn signals_from_old_bindings_are_dropped() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;

    client.auto_connect().await.unwrap();
    client.disconnect().unwrap();
    settle().await;
    client.auto_connect().await.unwrap();
    assert_eq!(bus.subscription_count(VLC), 2);

    let mut rx = client.subscribe();
    bus.emit_changed(
        VLC,
        PLAYER_INTERFACE,
        props(&[("Volume", PropValue::Double(0.3))]),
    );
    settle().await;

    let events = drain(&mut rx);
    assert_eq!(
        count(&events, |event| matches!(event, ClientEvent::Volume(_))),
        1
    );
    assert!((client.volume() - 0.3).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn reconnects_when_a_player_appears() {
    let bus = FakeBus::new();
    let client = client(&bus, ClientConfig::default()).await;
    let mut events = Box::pin(client.events());

    assert!(!client.auto_connect().await.unwrap());

    bus.add_player(VLC, root_props("VLC"), playing_props());

    let players = next_matching(&mut events, |event| {
        matches!(event, ClientEvent::PlayersChanged(_))
    })
    .await;
    assert!(matches!(players, ClientEvent::PlayersChanged(ref names) if names == &[VLC]));

    next_matching(&mut events, |event| {
        matches!(event, ClientEvent::Connection(true))
    })
    .await;
    assert_eq!(
        client.bound_player().map(|player| player.bus_name),
        Some(VLC.to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn no_reconnect_without_auto_mode() {
    let bus = FakeBus::new();
    let config = ClientConfig {
        auto_reconnect: false,
        ..ClientConfig::default()
    };
    let client = client(&bus, config).await;

    assert!(!client.auto_connect().await.unwrap());
    bus.add_player(VLC, root_props("VLC"), playing_props());
    settle().await;

    assert!(!client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn preferred_player_wins_and_can_be_switched() {
    let bus = FakeBus::new();
    bus.add_player(SPOTIFY, root_props("Spotify"), playing_props());
    bus.add_player(VLC, root_props("VLC"), playing_props());

    let config = ClientConfig {
        preferred_player: Some("vlc".to_string()),
        ..ClientConfig::default()
    };
    let client = client(&bus, config).await;
    client.auto_connect().await.unwrap();
    assert_eq!(client.identity().as_deref(), Some("VLC"));

    client.set_player(Some("spotify")).unwrap();
    assert_eq!(client.player().as_deref(), Some("spotify"));
    settle().await;

    assert_eq!(client.identity().as_deref(), Some("Spotify"));
    assert!(matches!(
        client.set_player(Some("  ")),
        Err(MprisError::InvalidBusName { .. })
    ));

    client.set_player(None).unwrap();
    settle().await;
    assert!(!client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn failed_bind_leaves_client_unbound() {
    let bus = FakeBus::new();
    bus.add_broken_player(VLC);
    let client = client(&bus, ClientConfig::default()).await;

    let result = client.auto_connect().await;

    assert!(matches!(result, Err(MprisError::Transport(_))));
    assert!(!client.is_connected());
    assert_eq!(client.state(), BindState::Unbound);
}

#[tokio::test(start_paused = true)]
async fn ignored_players_are_invisible() {
    let bus = FakeBus::new();
    bus.add_player(SPOTIFY, root_props("Spotify"), playing_props());
    bus.add_player(VLC, root_props("VLC"), playing_props());

    let config = ClientConfig {
        ignored_players: vec!["spotify".to_string()],
        ..ClientConfig::default()
    };
    let client = client(&bus, config).await;

    let players = client.list_available_players().await.unwrap();
    let names: Vec<&str> = players.iter().map(|player| player.bus_name.as_str()).collect();
    assert_eq!(names, vec![VLC]);
    assert_eq!(players[0].identity, "VLC");
}

#[tokio::test(start_paused = true)]
async fn accurate_position_rebases_estimate() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    let client = client(&bus, ClientConfig::default()).await;
    client.auto_connect().await.unwrap();

    bus.set_player_property(VLC, "Position", PropValue::Int(42_000_000));

    assert_eq!(client.accurate_position().await.unwrap(), 42_000_000);
    settle().await;
    assert!((client.position() - 42_000_000).abs() < 10_000);
}

#[tokio::test(start_paused = true)]
async fn unsupported_optional_properties_read_as_defaults() {
    let bus = FakeBus::new();
    let mut player = playing_props();
    player.remove("LoopStatus");
    player.remove("Shuffle");
    bus.add_player(VLC, root_props("VLC"), player);
    let client = client(&bus, ClientConfig::default()).await;
    client.auto_connect().await.unwrap();

    assert!(!client.has_loop_status());
    assert!(!client.has_shuffle());
    assert_eq!(client.loop_status(), LoopStatus::None);
    assert!(!client.shuffle());

    bus.emit_changed(
        VLC,
        PLAYER_INTERFACE,
        props(&[("Shuffle", PropValue::Bool(true))]),
    );
    settle().await;

    assert!(client.has_shuffle());
    assert!(client.shuffle());
}

#[tokio::test(start_paused = true)]
async fn position_read_overtaken_by_track_change_is_dropped() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    bus.set_player_property(VLC, "Position", PropValue::Int(170_000_000));
    bus.delay_position_reads(Duration::from_millis(300));

    let config = ClientConfig {
        resync_interval_ms: 1_000,
        ..ClientConfig::default()
    };
    let client = client(&bus, config).await;
    client.auto_connect().await.unwrap();

    // The resync at 1 s reads 170 s and answers at 1.3 s.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    bus.emit_changed(
        VLC,
        PLAYER_INTERFACE,
        props(&[("Metadata", track("/org/vlc/track/2", "Second", 200_000_000))]),
    );
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(client.metadata().title(), Some("Second"));
    let position = client.position();
    assert!(position < 1_000_000, "new track at {position}");
}

#[tokio::test(start_paused = true)]
async fn position_read_overtaken_by_seek_is_dropped() {
    let bus = FakeBus::new();
    bus.add_player(VLC, root_props("VLC"), playing_props());
    bus.set_player_property(VLC, "Position", PropValue::Int(170_000_000));
    bus.delay_position_reads(Duration::from_millis(300));
    let client = client(&bus, ClientConfig::default()).await;
    client.auto_connect().await.unwrap();

    let read = tokio::spawn({
        let client = client.clone();
        async move { client.accurate_position().await }
    });
    settle().await;
    bus.emit_seeked(VLC, 10_000_000);

    assert_eq!(read.await.unwrap().unwrap(), 170_000_000);
    settle().await;

    let position = client.position();
    assert!(
        (10_000_000..11_000_000).contains(&position),
        "position after seek {position}"
    );
}

#[tokio::test(start_paused = true)]
async fn unusable_config_is_refused_up_front() {
    let bus = FakeBus::new();
    let bus: Arc<dyn Bus> = bus;

    for config in [
        ClientConfig {
            tick_interval_ms: 0,
            ..ClientConfig::default()
        },
        ClientConfig {
            resync_interval_ms: 0,
            ..ClientConfig::default()
        },
    ] {
        let result = MprisClient::new(Arc::clone(&bus), config).await;
        assert!(matches!(result, Err(MprisError::InitializationFailed(_))));
    }
}

#[tokio::test(start_paused = true)]
async fn strict_mode_skips_writes_for_missing_optional_properties() {
    let bus = FakeBus::new();
    let mut player = playing_props();
    player.remove("LoopStatus");
    player.remove("Shuffle");
    bus.add_player(VLC, root_props("VLC"), player);

    let config = ClientConfig {
        strict_mode: true,
        ..ClientConfig::default()
    };
    let client = client(&bus, config).await;
    client.auto_connect().await.unwrap();

    client.set_loop_status(LoopStatus::Track).unwrap();
    client.set_shuffle(true).unwrap();
    client.flush().await.unwrap();

    assert!(bus.writes().is_empty());

    client.set_volume(0.5).unwrap();
    client.flush().await.unwrap();
    assert_eq!(bus.writes().len(), 1);
}
