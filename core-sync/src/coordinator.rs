//! # Sync Coordinator
//!
//! The poll loop that keeps every peer on a shared timeline.
//!
//! ## Workflow
//!
//! Each cycle:
//! 1. Refresh every peer concurrently (active player, then item and properties)
//! 2. If the peers are not all showing the same content, report it and back off
//! 3. Classify drift against each peer's expected state
//! 4. Select and run a reconciliation protocol
//! 5. Sleep for the poll interval if nothing needed fixing; otherwise go
//!    straight to the next cycle to confirm the result
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::SyncCoordinator;
//! use core_async::sync::CancellationToken;
//!
//! let mut coordinator = SyncCoordinator::from_config(&config, event_bus)?;
//! let token = CancellationToken::new();
//! coordinator.run(token.child_token()).await?;
//! ```

use crate::content::same_content;
use crate::drift::assess;
use crate::error::{Result, SyncError};
use crate::peer::{ExpectedState, Peer};
use crate::reconcile::{select_protocol, Protocol, Reconciler};
use bridge_traits::{Clock, EndpointHandle, Millis};
use core_async::select;
use core_async::sync::{watch, CancellationToken};
use core_async::task::join_all;
use core_async::time::sleep;
use core_runtime::config::{CoreConfig, SyncTuning};
use core_runtime::events::{EventBus, SyncEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Point-in-time view of one peer, published after every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStatus {
    pub address: String,
    pub now_playing: String,
    pub available: bool,
    pub speed: i32,
    pub position_ms: Millis,
    pub duration_ms: Millis,
    pub expected: ExpectedState,
}

impl PeerStatus {
    fn of(peer: &Peer) -> Self {
        Self {
            address: peer.address().to_string(),
            now_playing: label(peer),
            available: peer.is_available(),
            speed: peer.speed(),
            position_ms: peer.position(),
            duration_ms: peer.duration(),
            expected: peer.expected(),
        }
    }
}

/// What a single cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    ContentMismatch,
    InSync,
    Reconciled(Protocol),
}

/// Sync coordinator for keeping peers in step
pub struct SyncCoordinator {
    peers: Vec<Peer>,
    clock: Arc<dyn Clock>,
    tuning: SyncTuning,
    event_bus: Arc<EventBus>,
    status: watch::Sender<Vec<PeerStatus>>,
}

impl SyncCoordinator {
    /// Create a coordinator owning one peer per endpoint, in order.
    ///
    /// # Errors
    ///
    /// [`SyncError::Config`] when `endpoints` is empty.
    pub fn new(
        endpoints: Vec<EndpointHandle>,
        clock: Arc<dyn Clock>,
        tuning: SyncTuning,
        event_bus: Arc<EventBus>,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(SyncError::Config(
                "At least one endpoint is required".to_string(),
            ));
        }

        let peers: Vec<Peer> = endpoints.into_iter().map(Peer::new).collect();
        let initial = peers.iter().map(PeerStatus::of).collect();
        let (status, _) = watch::channel(initial);

        Ok(Self {
            peers,
            clock,
            tuning,
            event_bus,
            status,
        })
    }

    pub fn from_config(config: &CoreConfig, event_bus: Arc<EventBus>) -> Result<Self> {
        Self::new(
            config.endpoints.clone(),
            Arc::clone(&config.clock),
            config.tuning.clone(),
            event_bus,
        )
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn tuning(&self) -> &SyncTuning {
        &self.tuning
    }

    /// Status as of the last completed cycle.
    pub fn status(&self) -> Vec<PeerStatus> {
        self.status.borrow().clone()
    }

    /// Receiver that sees a new status after every cycle.
    pub fn watch_status(&self) -> watch::Receiver<Vec<PeerStatus>> {
        self.status.subscribe()
    }

    /// Run cycles until `cancel` fires or an unrecoverable error occurs.
    ///
    /// Endpoint failures never end the loop.
    ///
    /// # Errors
    ///
    /// Returns the fatal error (an invariant violation) after emitting
    /// [`SyncEvent::Fatal`].
    #[instrument(skip(self, cancel), fields(peers = self.peers.len()))]
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!("Starting playback sync");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = match self.run_cycle(&cancel).await {
                Ok(outcome) => outcome,
                Err(SyncError::Cancelled) => break,
                Err(e) => {
                    error!(error = %e, "Playback sync aborted");
                    self.event_bus.emit_sync(SyncEvent::Fatal {
                        message: e.to_string(),
                    });
                    return Err(e);
                }
            };

            let delay = match outcome {
                CycleOutcome::ContentMismatch => self.tuning.mismatch_backoff,
                CycleOutcome::InSync => self.tuning.poll_interval,
                CycleOutcome::Reconciled(_) => continue,
            };

            select! {
                _ = cancel.cancelled() => break,
                _ = sleep(delay) => {}
            }
        }

        info!("Playback sync stopped");
        self.event_bus.emit_sync(SyncEvent::Stopped);
        Ok(())
    }

    /// Run one refresh/classify/reconcile cycle without the trailing sleep.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> Result<CycleOutcome> {
        self.refresh_all().await;

        if !same_content(&self.peers) {
            self.report_mismatch();
            self.publish_status();
            return Ok(CycleOutcome::ContentMismatch);
        }

        let unsynced = assess(&mut self.peers, self.tuning.threshold_ms, &self.event_bus);
        let protocol = select_protocol(&self.peers, &unsynced)?;

        if protocol == Protocol::Idle {
            debug!("All peers in sync");
            self.publish_status();
            return Ok(CycleOutcome::InSync);
        }

        debug!(?protocol, unsynced = unsynced.len(), "Reconciling");
        let reconciler =
            Reconciler::new(self.clock.as_ref(), &self.tuning, &self.event_bus, cancel);
        let result = reconciler.execute(&mut self.peers, protocol).await;
        self.publish_status();
        result?;

        Ok(CycleOutcome::Reconciled(protocol))
    }

    async fn refresh_all(&mut self) {
        let clock = self.clock.as_ref();
        let results = join_all(self.peers.iter_mut().map(|peer| peer.refresh(clock))).await;

        for result in results {
            match result {
                Ok(()) => {}
                Err(SyncError::Endpoint { peer, source }) => {
                    warn!(peer = %peer, error = %source, "Peer unavailable");
                    self.event_bus.emit_sync(SyncEvent::PeerUnavailable {
                        peer,
                        message: source.to_string(),
                    });
                }
                Err(other) => warn!(error = %other, "Refresh failed"),
            }
        }
    }

    fn report_mismatch(&self) {
        let now_playing: Vec<String> = self
            .peers
            .iter()
            .map(|peer| format!("{}: {}", peer.address(), label(peer)))
            .collect();

        let listing = now_playing
            .iter()
            .map(|line| format!("- {}", line))
            .collect::<Vec<_>>()
            .join("\n");
        info!("Not all peers are playing the same thing.\n{}", listing);

        self.event_bus
            .emit_sync(SyncEvent::ContentMismatch { now_playing });
    }

    fn publish_status(&self) {
        let snapshot = self.peers.iter().map(PeerStatus::of).collect();
        self.status.send_replace(snapshot);
    }
}

fn label(peer: &Peer) -> String {
    if peer.is_available() {
        peer.now_playing()
    } else {
        "unavailable".to_string()
    }
}
