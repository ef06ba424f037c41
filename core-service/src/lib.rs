//! Core service façade and bootstrap helpers.
//!
//! This crate turns a validated [`CoreConfig`] into a running sync loop.
//! Hosts build the config (with the `desktop-shims` feature, straight from
//! endpoint addresses), bootstrap a [`SyncService`], subscribe to events or
//! status, and call [`SyncService::run`] until [`SyncService::stop`] fires.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_async::sync::{watch, CancellationToken, Mutex};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_sync::{PeerStatus, SyncCoordinator};
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct SyncService {
    coordinator: Arc<Mutex<SyncCoordinator>>,
    event_bus: Arc<EventBus>,
    status: watch::Receiver<Vec<PeerStatus>>,
    shutdown: CancellationToken,
}

impl SyncService {
    /// Validate `config` and prepare a coordinator for it.
    ///
    /// ```no_run
    /// # async fn example() -> core_service::Result<()> {
    /// use core_runtime::config::CoreConfig;
    /// use core_service::SyncService;
    ///
    /// let config = CoreConfig::builder()
    ///     .endpoint_address("living-room")
    ///     .endpoint_address("bedroom:9090")
    ///     .build()?;
    /// let service = SyncService::bootstrap(config)?;
    /// service.run().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.tuning.event_capacity));
        let coordinator = SyncCoordinator::from_config(&config, Arc::clone(&event_bus))?;
        let status = coordinator.watch_status();

        info!(
            peers = config.endpoints.len(),
            threshold_ms = config.tuning.threshold_ms,
            "Sync service ready"
        );

        Ok(Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            event_bus,
            status,
            shutdown: CancellationToken::new(),
        })
    }

    /// Run the sync loop until [`stop`](Self::stop) is called.
    ///
    /// Concurrent callers queue behind the one already running.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Sync`] when the loop hit an unrecoverable
    /// condition.
    pub async fn run(&self) -> Result<()> {
        let mut coordinator = self.coordinator.lock().await;
        coordinator.run(self.shutdown.child_token()).await?;
        Ok(())
    }

    /// Ask the loop to stop at its next cancellation point.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token that stops the service when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Per-peer status as of the last completed cycle.
    pub fn status(&self) -> Vec<PeerStatus> {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<Vec<PeerStatus>> {
        self.status.clone()
    }

    /// `address: label` for every peer, in configuration order.
    pub fn now_playing(&self) -> Vec<String> {
        self.status
            .borrow()
            .iter()
            .map(|peer| format!("{}: {}", peer.address, peer.now_playing))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        CurrentItem, EndpointHandle, PlaybackEndpoint, PlaybackProperties, PlayerId,
    };
    use core_async::task::join;
    use core_async::time::{sleep, Duration};
    use core_runtime::clock::MonotonicClock;
    use core_runtime::config::SyncTuning;
    use core_runtime::events::{CoreEvent, SyncEvent};
    use mockall::mock;

    mock! {
        Endpoint {}

        #[async_trait]
        impl PlaybackEndpoint for Endpoint {
            async fn active_player(&self) -> BridgeResult<Option<PlayerId>>;
            async fn current_item(&self, player: PlayerId) -> BridgeResult<CurrentItem>;
            async fn playback_properties(&self, player: PlayerId) -> BridgeResult<PlaybackProperties>;
            async fn set_pause(&self, player: PlayerId, paused: bool) -> BridgeResult<i32>;
            async fn seek(&self, player: PlayerId, percentage: f64) -> BridgeResult<()>;
        }
    }

    fn idle_config(peers: usize) -> CoreConfig {
        let endpoints = (0..peers)
            .map(|index| {
                let mut mock = MockEndpoint::new();
                mock.expect_active_player().returning(|| Ok(None));
                EndpointHandle::new(format!("kodi-{}", index), Arc::new(mock))
            })
            .collect();

        CoreConfig {
            endpoints,
            clock: Arc::new(MonotonicClock::new()),
            tuning: SyncTuning::default(),
        }
    }

    #[test]
    fn test_bootstrap_rejects_invalid_config() {
        let mut config = idle_config(0);
        assert!(matches!(
            SyncService::bootstrap(config),
            Err(CoreError::Runtime(_))
        ));

        config = idle_config(1);
        config.tuning.threshold_ms = 0;
        assert!(SyncService::bootstrap(config).is_err());
    }

    #[test]
    fn test_status_before_first_cycle() {
        let service = SyncService::bootstrap(idle_config(2)).unwrap();
        assert_eq!(service.status().len(), 2);
        assert_eq!(
            service.now_playing(),
            vec!["kodi-0: unavailable", "kodi-1: unavailable"]
        );
    }

    #[core_async::test(start_paused)]
    async fn test_run_until_stopped() {
        let service = SyncService::bootstrap(idle_config(2)).unwrap();
        let mut events = service.subscribe();

        let stopper = service.clone();
        let (result, _) = join(service.run(), async move {
            sleep(Duration::from_millis(1500)).await;
            stopper.stop();
        })
        .await;

        assert!(result.is_ok());
        assert!(service.is_stopped());
        assert_eq!(
            service.now_playing(),
            vec!["kodi-0: not playing a video", "kodi-1: not playing a video"]
        );

        let mut seen = Vec::new();
        while let Some(Ok(CoreEvent::Sync(event))) = events.try_recv() {
            seen.push(event);
        }
        assert!(matches!(seen[0], SyncEvent::ContentMismatch { .. }));
        assert_eq!(seen.last(), Some(&SyncEvent::Stopped));
    }
}
