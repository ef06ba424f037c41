//! End-to-end sync cycles against simulated players.
//!
//! Every test runs on a paused runtime clock, so settle delays and staggered
//! waits resolve instantly and command timestamps are exact.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, CurrentItem, EndpointHandle, Millis, PlaybackEndpoint, PlaybackProperties,
    PlayerId,
};
use core_async::sync::broadcast::Receiver;
use core_async::sync::CancellationToken;
use core_async::task::join;
use core_async::time::{sleep, Duration, Instant};
use core_runtime::clock::MonotonicClock;
use core_runtime::config::SyncTuning;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_sync::{CycleOutcome, ExpectedState, Protocol, SyncCoordinator, SyncError};
use std::sync::{Arc, Mutex};

const DURATION_MS: Millis = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Pause,
    Play,
    Seek(f64),
}

struct PlayerState {
    player: Option<PlayerId>,
    item: CurrentItem,
    speed: i32,
    position: Millis,
    since: Instant,
    seek_offset: Millis,
    offline: bool,
    queries: usize,
    commands: Vec<(Instant, Command)>,
}

impl PlayerState {
    fn position_now(&self) -> Millis {
        if self.speed == 1 {
            self.position + self.since.elapsed().as_millis() as Millis
        } else {
            self.position
        }
    }

    fn settle(&mut self) {
        self.position = self.position_now();
        self.since = Instant::now();
    }
}

/// A player whose position advances with the runtime clock while playing.
struct FakeKodi {
    state: Mutex<PlayerState>,
}

impl FakeKodi {
    fn new(title: &str, speed: i32, position: Millis) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PlayerState {
                player: Some(PlayerId(1)),
                item: CurrentItem {
                    title: Some(title.to_string()),
                    label: Some(format!("{}.mkv", title)),
                    ..CurrentItem::default()
                },
                speed,
                position,
                since: Instant::now(),
                seek_offset: 0,
                offline: false,
                queries: 0,
                commands: Vec::new(),
            }),
        })
    }

    fn paused(title: &str, position: Millis) -> Arc<Self> {
        Self::new(title, 0, position)
    }

    fn playing(title: &str, position: Millis) -> Arc<Self> {
        Self::new(title, 1, position)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap()
    }

    fn position(&self) -> Millis {
        self.lock().position_now()
    }

    /// Someone at the player changed its speed.
    fn user_set_speed(&self, speed: i32) {
        let mut state = self.lock();
        state.settle();
        state.speed = speed;
    }

    /// Someone at the player jumped to `position`.
    fn user_jump(&self, position: Millis) {
        let mut state = self.lock();
        state.settle();
        state.position = position;
    }

    fn stop_player(&self) {
        self.lock().player = None;
    }

    fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Seeks land this far past their target.
    fn set_seek_offset(&self, offset: Millis) {
        self.lock().seek_offset = offset;
    }

    fn commands(&self) -> Vec<Command> {
        self.lock().commands.iter().map(|(_, c)| *c).collect()
    }

    fn play_times(&self) -> Vec<Instant> {
        self.lock()
            .commands
            .iter()
            .filter(|(_, c)| *c == Command::Play)
            .map(|(at, _)| *at)
            .collect()
    }

    fn queries(&self) -> usize {
        self.lock().queries
    }

    fn reset_log(&self) {
        let mut state = self.lock();
        state.commands.clear();
        state.queries = 0;
    }
}

#[async_trait]
impl PlaybackEndpoint for FakeKodi {
    async fn active_player(&self) -> BridgeResult<Option<PlayerId>> {
        let mut state = self.lock();
        state.queries += 1;
        if state.offline {
            return Err(BridgeError::NotAvailable("connection refused".to_string()));
        }
        Ok(state.player)
    }

    async fn current_item(&self, _player: PlayerId) -> BridgeResult<CurrentItem> {
        Ok(self.lock().item.clone())
    }

    async fn playback_properties(&self, _player: PlayerId) -> BridgeResult<PlaybackProperties> {
        let state = self.lock();
        Ok(PlaybackProperties {
            speed: state.speed,
            position_ms: state.position_now(),
            duration_ms: DURATION_MS,
        })
    }

    async fn set_pause(&self, _player: PlayerId, paused: bool) -> BridgeResult<i32> {
        let mut state = self.lock();
        state.settle();
        state.speed = if paused { 0 } else { 1 };
        let command = if paused { Command::Pause } else { Command::Play };
        state.commands.push((Instant::now(), command));
        Ok(state.speed)
    }

    async fn seek(&self, _player: PlayerId, percentage: f64) -> BridgeResult<()> {
        let mut state = self.lock();
        state.settle();
        let target = (percentage * DURATION_MS as f64 / 100.0).round() as Millis;
        state.position = target + state.seek_offset;
        state.commands.push((Instant::now(), Command::Seek(percentage)));
        Ok(())
    }
}

fn coordinator(kodis: &[Arc<FakeKodi>]) -> (SyncCoordinator, Receiver<CoreEvent>) {
    let endpoints = kodis
        .iter()
        .enumerate()
        .map(|(index, kodi)| {
            let proxy: Arc<dyn PlaybackEndpoint> = kodi.clone();
            EndpointHandle::new(format!("kodi-{}:8080", index), proxy)
        })
        .collect();

    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();
    let coordinator = SyncCoordinator::new(
        endpoints,
        Arc::new(MonotonicClock::new()),
        SyncTuning::default(),
        bus,
    )
    .unwrap();
    (coordinator, events)
}

fn drain(events: &mut Receiver<CoreEvent>) -> Vec<SyncEvent> {
    let mut out = Vec::new();
    while let Ok(CoreEvent::Sync(event)) = events.try_recv() {
        out.push(event);
    }
    out
}

fn reset_all(kodis: &[Arc<FakeKodi>]) {
    for kodi in kodis {
        kodi.reset_log();
    }
}

/// Establish baselines, then start the first peer and let the others follow.
async fn all_playing_from(
    coordinator: &mut SyncCoordinator,
    kodis: &[Arc<FakeKodi>],
    token: &CancellationToken,
) {
    let first = coordinator.run_cycle(token).await.unwrap();
    assert_eq!(first, CycleOutcome::Reconciled(Protocol::FullResync));

    kodis[0].user_set_speed(1);
    let second = coordinator.run_cycle(token).await.unwrap();
    assert_eq!(
        second,
        CycleOutcome::Reconciled(Protocol::PrimaryPlaying { primary: 0 })
    );
    reset_all(kodis);
}

#[core_async::test(start_paused)]
async fn test_first_cycle_resyncs_everyone_to_earliest_position() {
    let kodis = [
        FakeKodi::playing("Serenity", 60_000),
        FakeKodi::paused("Serenity", 45_000),
        FakeKodi::playing("Serenity", 50_000),
    ];
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();

    let outcome = coordinator.run_cycle(&token).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Reconciled(Protocol::FullResync));
    for kodi in &kodis {
        assert_eq!(kodi.position(), 45_000);
    }
    for peer in coordinator.peers() {
        assert_eq!(peer.expected(), ExpectedState::Paused { position: 45_000 });
    }

    // The already-paused peer is not paused again, only seeked.
    assert_eq!(kodis[0].commands()[0], Command::Pause);
    assert!(!kodis[1].commands().contains(&Command::Pause));
    assert_eq!(kodis[1].commands().len(), 1);

    let events = drain(&mut events);
    assert!(events.contains(&SyncEvent::FullResyncTriggered { target_ms: 45_000 }));
    assert_eq!(events.last(), Some(&SyncEvent::Ready));
}

#[core_async::test(start_paused)]
async fn test_paused_peers_within_threshold_need_no_action() {
    let kodis = [
        FakeKodi::paused("Serenity", 10_000),
        FakeKodi::paused("Serenity", 10_000),
    ];
    let (mut coordinator, _events) = coordinator(&kodis);
    let token = CancellationToken::new();
    coordinator.run_cycle(&token).await.unwrap();
    reset_all(&kodis);

    kodis[1].user_jump(10_500);
    let outcome = coordinator.run_cycle(&token).await.unwrap();

    assert_eq!(outcome, CycleOutcome::InSync);
    assert!(kodis[0].commands().is_empty());
    assert!(kodis[1].commands().is_empty());
}

#[core_async::test(start_paused)]
async fn test_lone_seek_while_playing_syncs_others_to_it() {
    let kodis = [
        FakeKodi::paused("Serenity", 40_000),
        FakeKodi::paused("Serenity", 40_000),
    ];
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();
    all_playing_from(&mut coordinator, &kodis, &token).await;
    drain(&mut events);

    sleep(Duration::from_millis(2000)).await;
    assert_eq!(kodis[0].position(), 42_000);
    kodis[1].user_jump(45_500);

    let outcome = coordinator.run_cycle(&token).await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Reconciled(Protocol::PrimaryPlaying { primary: 1 })
    );

    let events = drain(&mut events);
    assert_eq!(
        events[0],
        SyncEvent::SeekedWhilePlaying {
            peer: "kodi-1:8080".to_string(),
            expected_ms: 42_000,
            actual_ms: 45_500,
        }
    );
    assert!(events.contains(&SyncEvent::PrimarySyncTriggered {
        primary: "kodi-1:8080".to_string(),
        playing: true,
        target_ms: 45_500,
    }));

    assert_eq!(
        kodis[0].commands(),
        vec![
            Command::Pause,
            Command::Seek(100.0 * 45_500.0 / DURATION_MS as f64),
            Command::Play
        ]
    );
    assert_eq!(kodis[1].commands(), vec![Command::Pause, Command::Play]);
    assert_eq!(kodis[0].position(), kodis[1].position());

    // The next cycle confirms everyone is on the new baseline.
    sleep(Duration::from_millis(500)).await;
    assert_eq!(coordinator.run_cycle(&token).await.unwrap(), CycleOutcome::InSync);
}

#[core_async::test(start_paused)]
async fn test_staggered_play_converges_peers() {
    let kodis = [
        FakeKodi::paused("Serenity", 10_000),
        FakeKodi::paused("Serenity", 10_000),
        FakeKodi::paused("Serenity", 10_000),
    ];
    kodis[2].set_seek_offset(400);
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();

    coordinator.run_cycle(&token).await.unwrap();
    assert_eq!(kodis[2].position(), 10_400);
    drain(&mut events);

    kodis[0].user_set_speed(1);
    let outcome = coordinator.run_cycle(&token).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Reconciled(Protocol::PrimaryPlaying { primary: 0 })
    );

    let waits: Vec<(String, Millis)> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SyncEvent::StaggeredPlay { peer, wait_ms } => Some((peer, wait_ms)),
            _ => None,
        })
        .collect();
    assert_eq!(
        waits,
        vec![
            ("kodi-0:8080".to_string(), 0),
            ("kodi-1:8080".to_string(), 0),
            ("kodi-2:8080".to_string(), 400),
        ]
    );

    let first_play = kodis[0].play_times()[0];
    assert_eq!(kodis[1].play_times()[0], first_play);
    assert_eq!(
        kodis[2].play_times()[0].duration_since(first_play),
        Duration::from_millis(400)
    );

    sleep(Duration::from_millis(1000)).await;
    let position = kodis[0].position();
    assert_eq!(kodis[1].position(), position);
    assert_eq!(kodis[2].position(), position);
    assert_eq!(coordinator.run_cycle(&token).await.unwrap(), CycleOutcome::InSync);
}

#[core_async::test(start_paused)]
async fn test_two_unsynced_peers_trigger_full_resync() {
    let kodis = [
        FakeKodi::paused("Serenity", 100_000),
        FakeKodi::paused("Serenity", 100_000),
        FakeKodi::paused("Serenity", 100_000),
    ];
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();
    all_playing_from(&mut coordinator, &kodis, &token).await;
    drain(&mut events);

    sleep(Duration::from_millis(1000)).await;
    kodis[1].user_jump(150_000);
    kodis[2].user_jump(120_000);

    let outcome = coordinator.run_cycle(&token).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Reconciled(Protocol::FullResync));
    let events = drain(&mut events);
    assert!(events.contains(&SyncEvent::FullResyncTriggered { target_ms: 101_000 }));

    for (kodi, peer) in kodis.iter().zip(coordinator.peers()) {
        assert_eq!(kodi.position(), 101_000);
        assert_eq!(kodi.commands()[0], Command::Pause);
        assert_eq!(peer.expected(), ExpectedState::Paused { position: 101_000 });
    }
}

#[core_async::test(start_paused)]
async fn test_lone_pause_pauses_and_seeks_others() {
    let kodis = [
        FakeKodi::paused("Serenity", 5_000),
        FakeKodi::paused("Serenity", 5_000),
    ];
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();
    all_playing_from(&mut coordinator, &kodis, &token).await;
    drain(&mut events);

    sleep(Duration::from_millis(3000)).await;
    kodis[1].user_set_speed(0);
    sleep(Duration::from_millis(100)).await;

    let outcome = coordinator.run_cycle(&token).await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Reconciled(Protocol::PrimaryPaused { primary: 1 })
    );
    assert!(kodis[1].commands().is_empty());
    assert_eq!(kodis[0].commands()[0], Command::Pause);
    assert_eq!(kodis[0].position(), 8_000);
    assert_eq!(kodis[1].position(), 8_000);

    for peer in coordinator.peers() {
        assert_eq!(peer.expected(), ExpectedState::Paused { position: 8_000 });
    }

    let events = drain(&mut events);
    assert_eq!(
        events[0],
        SyncEvent::NewlyPaused {
            peer: "kodi-1:8080".to_string(),
            position_ms: 8_000,
        }
    );
}

#[core_async::test(start_paused)]
async fn test_peer_without_player_is_a_content_mismatch() {
    let kodis = [
        FakeKodi::paused("Serenity", 5_000),
        FakeKodi::paused("Serenity", 5_000),
    ];
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();
    coordinator.run_cycle(&token).await.unwrap();
    reset_all(&kodis);
    drain(&mut events);

    kodis[1].stop_player();
    let outcome = coordinator.run_cycle(&token).await.unwrap();

    assert_eq!(outcome, CycleOutcome::ContentMismatch);
    assert!(kodis[0].commands().is_empty());
    assert_eq!(coordinator.peers()[1].expected(), ExpectedState::Unknown);
    assert_eq!(
        coordinator.peers()[0].expected(),
        ExpectedState::Paused { position: 5_000 }
    );

    let events = drain(&mut events);
    assert_eq!(
        events,
        vec![SyncEvent::ContentMismatch {
            now_playing: vec![
                "kodi-0:8080: Serenity".to_string(),
                "kodi-1:8080: not playing a video".to_string(),
            ],
        }]
    );

    let status = coordinator.status();
    assert_eq!(status[1].now_playing, "not playing a video");
}

#[core_async::test(start_paused)]
async fn test_different_titles_are_a_content_mismatch() {
    let kodis = [
        FakeKodi::paused("Alien", 5_000),
        FakeKodi::paused("Aliens", 9_000),
    ];
    let (mut coordinator, _events) = coordinator(&kodis);

    let outcome = coordinator
        .run_cycle(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, CycleOutcome::ContentMismatch);
    assert!(kodis[0].commands().is_empty());
    assert!(kodis[1].commands().is_empty());
}

#[core_async::test(start_paused)]
async fn test_unreachable_peer_sits_out_while_others_sync() {
    let kodis = [
        FakeKodi::paused("Serenity", 10_000),
        FakeKodi::paused("Serenity", 10_000),
        FakeKodi::paused("Serenity", 10_000),
    ];
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();
    coordinator.run_cycle(&token).await.unwrap();
    reset_all(&kodis);
    drain(&mut events);

    kodis[2].set_offline(true);
    kodis[0].user_set_speed(1);
    let outcome = coordinator.run_cycle(&token).await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Reconciled(Protocol::PrimaryPlaying { primary: 0 })
    );
    assert_eq!(
        kodis[1].commands(),
        vec![
            Command::Pause,
            Command::Seek(100.0 * 10_000.0 / DURATION_MS as f64),
            Command::Play
        ]
    );
    assert!(kodis[2].commands().is_empty());
    assert_eq!(coordinator.peers()[2].expected(), ExpectedState::Unknown);
    assert_eq!(coordinator.status()[2].now_playing, "unavailable");

    let events = drain(&mut events);
    let unavailable: Vec<&SyncEvent> = events
        .iter()
        .filter(|event| matches!(event, SyncEvent::PeerUnavailable { .. }))
        .collect();
    assert_eq!(unavailable.len(), 1);
    assert!(matches!(
        unavailable[0],
        SyncEvent::PeerUnavailable { peer, .. } if peer == "kodi-2:8080"
    ));

    // Back without a baseline, the paused peer leads the others to its position.
    kodis[2].set_offline(false);
    sleep(Duration::from_millis(500)).await;
    let outcome = coordinator.run_cycle(&token).await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Reconciled(Protocol::PrimaryPaused { primary: 2 })
    );
    for kodi in &kodis {
        assert_eq!(kodi.position(), 10_000);
    }
    for peer in coordinator.peers() {
        assert_eq!(peer.expected(), ExpectedState::Paused { position: 10_000 });
    }
}

#[core_async::test(start_paused)]
async fn test_transitional_peer_without_baseline_waits_to_settle() {
    let kodis = [
        FakeKodi::paused("Serenity", 5_000),
        FakeKodi::paused("Serenity", 5_000),
    ];
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();
    coordinator.run_cycle(&token).await.unwrap();

    // Losing the peer for a cycle drops its baseline.
    kodis[0].set_offline(true);
    assert_eq!(coordinator.run_cycle(&token).await.unwrap(), CycleOutcome::InSync);
    assert_eq!(coordinator.peers()[0].expected(), ExpectedState::Unknown);

    kodis[0].set_offline(false);
    kodis[0].user_set_speed(4);
    reset_all(&kodis);
    drain(&mut events);

    assert_eq!(coordinator.run_cycle(&token).await.unwrap(), CycleOutcome::InSync);

    let canceller = token.clone();
    let (result, _) = join(coordinator.run(token.clone()), async move {
        sleep(Duration::from_millis(1200)).await;
        canceller.cancel();
    })
    .await;

    assert!(result.is_ok());
    assert!(kodis[0].commands().is_empty());
    assert!(kodis[1].commands().is_empty());
    let seen = drain(&mut events);
    assert!(!seen.iter().any(|event| matches!(event, SyncEvent::Fatal { .. })));
    assert_eq!(seen.last(), Some(&SyncEvent::Stopped));

    // Once it settles it is judged like any peer without a baseline.
    kodis[0].user_set_speed(0);
    kodis[0].user_jump(9_000);
    let outcome = coordinator
        .run_cycle(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Reconciled(Protocol::PrimaryPaused { primary: 0 })
    );
    assert_eq!(kodis[1].position(), 9_000);
}

#[core_async::test(start_paused)]
async fn test_cancel_during_stagger_drops_waiting_baselines() {
    let kodis = [
        FakeKodi::paused("Serenity", 10_000),
        FakeKodi::paused("Serenity", 10_000),
    ];
    kodis[1].set_seek_offset(600);
    let (mut coordinator, _events) = coordinator(&kodis);
    let token = CancellationToken::new();
    coordinator.run_cycle(&token).await.unwrap();
    reset_all(&kodis);

    kodis[0].user_set_speed(1);
    let canceller = token.clone();
    let (result, _) = join(coordinator.run_cycle(&token), async move {
        // Past the seek settle delay, inside the second peer's wait.
        sleep(Duration::from_millis(2300)).await;
        canceller.cancel();
    })
    .await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(kodis[0].play_times().len(), 1);
    assert!(kodis[1].play_times().is_empty());
    assert!(matches!(
        coordinator.peers()[0].expected(),
        ExpectedState::Playing { .. }
    ));
    assert_eq!(coordinator.peers()[1].expected(), ExpectedState::Unknown);
}

#[core_async::test(start_paused)]
async fn test_run_backs_off_while_content_differs() {
    let kodis = [
        FakeKodi::paused("Alien", 5_000),
        FakeKodi::paused("Aliens", 5_000),
    ];
    let (mut coordinator, mut events) = coordinator(&kodis);
    let token = CancellationToken::new();

    let canceller = token.clone();
    let (result, _) = join(coordinator.run(token.clone()), async move {
        sleep(Duration::from_millis(2500)).await;
        canceller.cancel();
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(kodis[0].queries(), 3);

    let events = drain(&mut events);
    let mismatches = events
        .iter()
        .filter(|event| matches!(event, SyncEvent::ContentMismatch { .. }))
        .count();
    assert_eq!(mismatches, 3);
    assert_eq!(events.last(), Some(&SyncEvent::Stopped));
}

#[core_async::test(start_paused)]
async fn test_run_confirms_reconciliation_without_sleeping() {
    let kodis = [
        FakeKodi::paused("Serenity", 5_000),
        FakeKodi::paused("Serenity", 7_000),
    ];
    let (mut coordinator, _events) = coordinator(&kodis);
    let token = CancellationToken::new();

    let canceller = token.clone();
    let started = Instant::now();
    let (result, _) = join(coordinator.run(token.clone()), async move {
        // Resync takes one settle delay; the confirming cycle follows at once
        // and the loop then idles for the poll interval.
        sleep(Duration::from_millis(2100)).await;
        canceller.cancel();
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(kodis[0].queries(), 2);
    assert!(started.elapsed() < Duration::from_millis(2500));
}

#[core_async::test(start_paused)]
async fn test_run_idles_at_poll_interval() {
    let kodis = [
        FakeKodi::paused("Serenity", 5_000),
        FakeKodi::paused("Serenity", 5_000),
    ];
    let (mut coordinator, _events) = coordinator(&kodis);
    let token = CancellationToken::new();
    coordinator.run_cycle(&token).await.unwrap();
    reset_all(&kodis);

    let canceller = token.clone();
    let (result, _) = join(coordinator.run(token.clone()), async move {
        sleep(Duration::from_millis(1200)).await;
        canceller.cancel();
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(kodis[0].queries(), 3);
    assert!(kodis[0].commands().is_empty());
}

#[core_async::test(start_paused)]
async fn test_status_watch_sees_each_cycle() {
    let kodis = [
        FakeKodi::paused("Serenity", 5_000),
        FakeKodi::paused("Serenity", 6_000),
    ];
    let (mut coordinator, _events) = coordinator(&kodis);
    let mut status = coordinator.watch_status();
    assert_eq!(status.borrow_and_update()[0].expected, ExpectedState::Unknown);

    coordinator
        .run_cycle(&CancellationToken::new())
        .await
        .unwrap();

    assert!(status.has_changed().unwrap());
    let snapshot = status.borrow_and_update().clone();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].position_ms, 5_000);
    assert_eq!(snapshot[1].expected, ExpectedState::Paused { position: 5_000 });
    assert!(snapshot.iter().all(|peer| peer.available));
}
