//! Session lifecycle driven by telemetry snapshots

mod helpers;

use helpers::{hello_world, MemoryCache, Script, ScriptedProvider};
use lyrisync_common::events::{EventBus, OverlayEvent};
use lyrisync_overlay::playback::PollSettings;
use lyrisync_overlay::resolver::{LyricsProvider, ResolutionPipeline};
use lyrisync_overlay::session::{SessionMachine, SessionState, SessionTracker};
use lyrisync_overlay::telemetry::{Modifiers, PracticeModeModifiers, TelemetrySnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const SETTINGS: PollSettings = PollSettings {
    interval: Duration::from_millis(50),
    lines_shown: 3,
};

fn machine(
    guard_first_sample: bool,
    cache: MemoryCache,
    provider: ScriptedProvider,
    bus: &EventBus,
    cancel: &CancellationToken,
) -> SessionMachine {
    let providers: Vec<Arc<dyn LyricsProvider>> = vec![Arc::new(provider)];
    let pipeline = ResolutionPipeline::new(Arc::new(cache), providers, Duration::from_secs(5));
    SessionMachine::new(
        SessionTracker::new(guard_first_sample),
        Arc::new(pipeline),
        bus.clone(),
        SETTINGS,
        cancel.clone(),
    )
}

fn playing(title: &str, artist: &str) -> TelemetrySnapshot {
    TelemetrySnapshot {
        song_name: Some(title.to_string()),
        song_author: Some(artist.to_string()),
        in_level: Some(true),
        level_paused: Some(false),
        level_failed: Some(false),
        level_finished: Some(false),
        level_quit: Some(false),
        ..Default::default()
    }
}

fn drain(rx: &mut Receiver<OverlayEvent>) -> Vec<OverlayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn count(events: &[OverlayEvent], event_type: &str) -> usize {
    events.iter().filter(|e| e.event_type() == event_type).count()
}

#[tokio::test(start_paused = true)]
async fn test_stale_first_sample_ignored_then_song_opens() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let cancel = CancellationToken::new();
    let cache = MemoryCache::with_entry("Greeting", "The Testers", hello_world("lrclib"));
    let mut machine = machine(true, cache, ScriptedProvider::new("lrclib", Script::Miss), &bus, &cancel);

    machine.handle(&playing("Greeting", "The Testers")).await;
    assert_eq!(machine.state(), SessionState::Idle);
    assert!(drain(&mut rx).is_empty());

    machine.handle(&playing("Greeting", "The Testers")).await;
    let SessionState::Active { session_id } = machine.state() else {
        panic!("session did not open");
    };
    match rx.try_recv().unwrap() {
        OverlayEvent::SessionOpened {
            session_id: opened,
            title,
            duration_ms,
            ..
        } => {
            assert_eq!(opened, session_id);
            assert_eq!(title, "Greeting");
            assert_eq!(duration_ms, 4000);
        }
        other => panic!("unexpected event {:?}", other),
    }

    machine.close_session().await;
}

#[tokio::test(start_paused = true)]
async fn test_unguarded_profile_opens_on_first_sample() {
    let bus = EventBus::new(64);
    let cancel = CancellationToken::new();
    let cache = MemoryCache::with_entry("Greeting", "The Testers", hello_world("lrclib"));
    let mut machine = machine(false, cache, ScriptedProvider::new("lrclib", Script::Miss), &bus, &cancel);

    machine.handle(&playing("Greeting", "The Testers")).await;
    assert!(matches!(machine.state(), SessionState::Active { .. }));
    machine.close_session().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_level_closes_exactly_once() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let cancel = CancellationToken::new();
    let provider = ScriptedProvider::new("lrclib", Script::Lines(vec![(1000, "Hello"), (2500, "World")]));
    let mut machine = machine(false, MemoryCache::default(), provider, &bus, &cancel);

    machine.handle(&playing("Greeting", "The Testers")).await;
    assert!(matches!(machine.state(), SessionState::Active { .. }));

    let failed = TelemetrySnapshot {
        level_failed: Some(true),
        ..Default::default()
    };
    machine.handle(&failed).await;
    machine.handle(&failed).await;

    assert_eq!(machine.state(), SessionState::Idle);
    let events = drain(&mut rx);
    assert_eq!(count(&events, "SessionOpened"), 1);
    assert_eq!(count(&events, "SessionClosed"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_song_replaces_active_session() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let cancel = CancellationToken::new();
    let provider = ScriptedProvider::new("lrclib", Script::Lines(vec![(0, "la")]));
    let mut machine = machine(false, MemoryCache::default(), provider, &bus, &cancel);

    machine.handle(&playing("First", "Band")).await;
    let SessionState::Active { session_id: first } = machine.state() else {
        panic!("first session did not open");
    };
    machine.handle(&playing("Second", "Band")).await;
    let SessionState::Active { session_id: second } = machine.state() else {
        panic!("second session did not open");
    };
    assert_ne!(first, second);

    let events = drain(&mut rx);
    let closed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            OverlayEvent::SessionClosed { session_id, .. } => Some(*session_id),
            _ => None,
        })
        .collect();
    assert_eq!(closed, vec![first]);

    machine.close_session().await;
}

#[tokio::test(start_paused = true)]
async fn test_modifier_and_practice_changes_keep_session() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let cancel = CancellationToken::new();
    let provider = ScriptedProvider::new("lrclib", Script::Lines(vec![(1000, "Hello"), (2500, "World")]));
    let mut machine = machine(false, MemoryCache::default(), provider, &bus, &cancel);

    machine.handle(&playing("Greeting", "The Testers")).await;
    let SessionState::Active { session_id } = machine.state() else {
        panic!("session did not open");
    };
    assert_eq!(count(&drain(&mut rx), "SessionOpened"), 1);

    machine
        .handle(&TelemetrySnapshot {
            modifiers: Some(Modifiers {
                faster_song: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        })
        .await;
    assert_eq!(machine.state(), SessionState::Active { session_id });
    let speeds: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            OverlayEvent::SpeedChanged { session_id: id, speed, .. } => Some((id, speed)),
            _ => None,
        })
        .collect();
    assert_eq!(speeds, vec![(session_id, 1.2)]);

    machine
        .handle(&TelemetrySnapshot {
            practice_mode: Some(true),
            practice_mode_modifiers: Some(PracticeModeModifiers {
                song_speed_mul: Some(0.8),
                song_start_time: Some(10.0),
            }),
            ..Default::default()
        })
        .await;
    assert_eq!(machine.state(), SessionState::Active { session_id });
    let events = drain(&mut rx);
    assert_eq!(count(&events, "SessionOpened"), 0);
    assert_eq!(count(&events, "SessionClosed"), 0);
    assert!(events.iter().any(|e| matches!(
        e,
        OverlayEvent::SpeedChanged { session_id: id, speed, .. } if *id == session_id && *speed == 0.8
    )));

    machine.close_session().await;
}

#[tokio::test(start_paused = true)]
async fn test_unresolved_song_stays_idle() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let cancel = CancellationToken::new();
    let mut machine = machine(
        false,
        MemoryCache::default(),
        ScriptedProvider::new("lrclib", Script::Miss),
        &bus,
        &cancel,
    );

    machine.handle(&playing("Unknown", "Nobody")).await;

    assert_eq!(machine.state(), SessionState::Idle);
    match rx.try_recv().unwrap() {
        OverlayEvent::LyricsUnavailable { title, artist, .. } => {
            assert_eq!(title, "Unknown");
            assert_eq!(artist, "Nobody");
        }
        other => panic!("unexpected event {:?}", other),
    }

    // Close while idle is a no-op
    machine
        .handle(&TelemetrySnapshot {
            level_quit: Some(true),
            ..Default::default()
        })
        .await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lines_follow_song_time() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let cancel = CancellationToken::new();
    let provider = ScriptedProvider::new("lrclib", Script::Lines(vec![(1000, "Hello"), (2500, "World")]));
    let mut machine = machine(false, MemoryCache::default(), provider, &bus, &cancel);

    machine.handle(&playing("Greeting", "The Testers")).await;
    let current_line = |events: &[OverlayEvent]| {
        events.iter().rev().find_map(|e| match e {
            OverlayEvent::LineChanged { current, .. } => Some(current.clone()),
            _ => None,
        })
    };

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(current_line(&drain(&mut rx)).as_deref(), Some("Hello"));

    tokio::time::sleep(Duration::from_millis(1400)).await;
    assert_eq!(current_line(&drain(&mut rx)).as_deref(), Some("World"));

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(count(&drain(&mut rx), "LyricsEnded"), 1);

    machine.close_session().await;
}

#[tokio::test(start_paused = true)]
async fn test_run_closes_session_on_shutdown() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let cancel = CancellationToken::new();
    let provider = ScriptedProvider::new("lrclib", Script::Lines(vec![(0, "la")]));
    let machine = machine(false, MemoryCache::default(), provider, &bus, &cancel);

    let (tx, samples) = mpsc::unbounded_channel();
    let handle = tokio::spawn(machine.run(samples));
    tx.send(playing("Greeting", "The Testers")).unwrap();

    match rx.recv().await.unwrap() {
        OverlayEvent::SessionOpened { .. } => {}
        other => panic!("unexpected event {:?}", other),
    }

    cancel.cancel();
    handle.await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(count(&events, "SessionClosed"), 1);
}
