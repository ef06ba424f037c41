//! # Reconciliation
//!
//! Chooses and drives the corrective protocol for a cycle's unsynced peers.
//!
//! ## Protocols
//!
//! | Unsynced | Primary speed | Protocol |
//! |----------|---------------|----------|
//! | 0        | -             | [`Protocol::Idle`] |
//! | ≥ 2      | -             | [`Protocol::FullResync`]: pause whoever plays, re-read everyone, seek all to the earliest position |
//! | 1        | playing       | [`Protocol::PrimaryPlaying`]: pause all, seek secondaries to the primary, staggered play |
//! | 1        | paused        | [`Protocol::PrimaryPaused`]: pause and seek secondaries to the primary |
//! | 1        | other         | [`SyncError::InvariantViolation`] |
//!
//! Every fan-out runs one future per peer with `join_all` and only reaches
//! peers that answered this cycle; a peer whose command fails loses its
//! baseline and sits out the rest of the protocol while its siblings carry on.

use crate::error::{Result, SyncError};
use crate::peer::{format_position, ExpectedState, Peer};
use bridge_traits::{Clock, Millis, SpeedState};
use core_async::select;
use core_async::sync::CancellationToken;
use core_async::task::join_all;
use core_async::time::{sleep, Duration};
use core_runtime::config::SyncTuning;
use core_runtime::events::{EventBus, SyncEvent};
use tracing::{info, warn};

/// The corrective action selected for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Idle,
    FullResync,
    PrimaryPlaying { primary: usize },
    PrimaryPaused { primary: usize },
}

/// Pick the protocol for the given unsynced peer indices.
///
/// # Errors
///
/// [`SyncError::InvariantViolation`] when the lone unsynced peer is neither
/// paused nor playing, or when an index does not name a peer.
pub fn select_protocol(peers: &[Peer], unsynced: &[usize]) -> Result<Protocol> {
    match unsynced {
        [] => Ok(Protocol::Idle),
        [primary] => {
            let peer = peers.get(*primary).ok_or_else(|| {
                SyncError::InvariantViolation(format!("Unsynced peer index {} out of range", primary))
            })?;

            match peer.state() {
                SpeedState::Playing => Ok(Protocol::PrimaryPlaying { primary: *primary }),
                SpeedState::Paused => Ok(Protocol::PrimaryPaused { primary: *primary }),
                SpeedState::Transitional(speed) => Err(SyncError::InvariantViolation(format!(
                    "Unexpected speed {} on {}; only a playing or paused peer can be synced to",
                    speed,
                    peer.address()
                ))),
            }
        }
        _ => Ok(Protocol::FullResync),
    }
}

/// Earliest position among peers still taking part in the cycle.
pub fn earliest_position(peers: &[Peer]) -> Option<Millis> {
    peers
        .iter()
        .filter(|peer| peer.is_playing_video())
        .map(Peer::position)
        .min()
}

/// Executes a [`Protocol`] against the peers.
pub struct Reconciler<'a> {
    clock: &'a dyn Clock,
    tuning: &'a SyncTuning,
    events: &'a EventBus,
    cancel: &'a CancellationToken,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        clock: &'a dyn Clock,
        tuning: &'a SyncTuning,
        events: &'a EventBus,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            clock,
            tuning,
            events,
            cancel,
        }
    }

    /// Run `protocol` to completion.
    ///
    /// Endpoint failures are absorbed per peer. Returns
    /// [`SyncError::Cancelled`] if the token fired during staggered play.
    pub async fn execute(&self, peers: &mut [Peer], protocol: Protocol) -> Result<()> {
        match protocol {
            Protocol::Idle => Ok(()),
            Protocol::FullResync => self.full_resync(peers).await,
            Protocol::PrimaryPlaying { primary } => self.primary_playing(peers, primary).await,
            Protocol::PrimaryPaused { primary } => self.primary_paused(peers, primary).await,
        }
    }

    async fn full_resync(&self, peers: &mut [Peer]) -> Result<()> {
        info!("Syncing all peers together");

        let clock = self.clock;
        let results = join_all(
            peers
                .iter_mut()
                .filter(|peer| peer.is_playing_video())
                .map(|peer| pause_if_playing_and_reread(peer, clock)),
        )
        .await;
        self.absorb_all(results);

        let Some(target) = earliest_position(peers) else {
            warn!("No peer answered the re-read; skipping resync");
            return Ok(());
        };

        info!(target_ms = target, "Seeking all peers to {}", format_position(target));
        self.events
            .emit_sync(SyncEvent::FullResyncTriggered { target_ms: target });

        self.seek_all(peers.iter_mut(), target).await;
        self.ready();
        Ok(())
    }

    async fn primary_playing(&self, peers: &mut [Peer], primary: usize) -> Result<()> {
        info!("Pausing all to let everyone sync");

        let results = join_all(
            peers
                .iter_mut()
                .filter(|peer| peer.is_playing_video())
                .map(|peer| peer.pause()),
        )
        .await;
        self.absorb_all(results);

        let lead = primary_mut(peers, primary)?;
        if !lead.is_playing_video() {
            warn!(peer = %lead.address(), "Primary became unavailable; retrying next cycle");
            return Ok(());
        }
        let reread = lead.refresh_properties(self.clock).await;
        if !self.absorb(reread) {
            return Ok(());
        }

        let target = lead.position();
        let lead_address = lead.address().to_string();
        info!(
            peer = %lead_address,
            target_ms = target,
            "Primary {} is at {}",
            lead_address,
            format_position(target)
        );
        self.events.emit_sync(SyncEvent::PrimarySyncTriggered {
            primary: lead_address,
            playing: true,
            target_ms: target,
        });

        info!("Seeking others to {}", format_position(target));
        self.seek_all(secondaries(peers, primary), target).await;

        let Some(zero_point) = earliest_position(peers) else {
            return Ok(());
        };

        info!(zero_point_ms = zero_point, "Staggering play commands to sync");
        self.staggered_play(peers, zero_point).await?;

        self.ready();
        Ok(())
    }

    async fn primary_paused(&self, peers: &mut [Peer], primary: usize) -> Result<()> {
        let lead = primary_mut(peers, primary)?;
        let target = lead.position();
        lead.set_expected(ExpectedState::Paused { position: target });

        let lead_address = lead.address().to_string();
        info!(
            peer = %lead_address,
            target_ms = target,
            "Primary {} paused at {}",
            lead_address,
            format_position(target)
        );
        self.events.emit_sync(SyncEvent::PrimarySyncTriggered {
            primary: lead_address,
            playing: false,
            target_ms: target,
        });

        let clock = self.clock;
        let settle = self.tuning.seek_settle_delay;
        let results = join_all(
            secondaries(peers, primary)
                .filter(|peer| peer.is_playing_video())
                .map(|peer| {
                    info!(
                        peer = %peer.address(),
                        "Pausing and seeking {} to {}",
                        peer.address(),
                        format_position(target)
                    );
                    pause_and_seek(peer, target, settle, clock)
                }),
        )
        .await;
        self.absorb_all(results);

        self.ready();
        Ok(())
    }

    /// Start every peer so that all of them pass `zero_point` together.
    ///
    /// A peer ahead of the zero point by `d` ms waits `d` ms before resuming.
    async fn staggered_play(&self, peers: &mut [Peer], zero_point: Millis) -> Result<()> {
        let clock = self.clock;
        let cancel = self.cancel;
        let events = self.events;

        let results = join_all(
            peers
                .iter_mut()
                .filter(|peer| peer.is_playing_video())
                .map(|peer| {
                    let wait_ms = (peer.position() - zero_point).max(0);
                    events.emit_sync(SyncEvent::StaggeredPlay {
                        peer: peer.address().to_string(),
                        wait_ms,
                    });
                    play_after(peer, wait_ms, clock, cancel)
                }),
        )
        .await;

        let mut cancelled = false;
        for result in results {
            match result {
                Err(SyncError::Cancelled) => cancelled = true,
                other => {
                    self.absorb(other);
                }
            }
        }

        if cancelled {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    async fn seek_all<'p>(&self, peers: impl Iterator<Item = &'p mut Peer>, target: Millis) {
        let clock = self.clock;
        let settle = self.tuning.seek_settle_delay;
        let results = join_all(
            peers
                .filter(|peer| peer.is_playing_video())
                .map(|peer| peer.seek(target, settle, clock)),
        )
        .await;
        self.absorb_all(results);
    }

    fn absorb_all(&self, results: Vec<Result<()>>) {
        for result in results {
            self.absorb(result);
        }
    }

    /// Report a per-peer failure; returns whether the operation succeeded.
    fn absorb(&self, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(SyncError::Endpoint { peer, source }) => {
                warn!(peer = %peer, error = %source, "Peer unavailable during reconciliation");
                self.events.emit_sync(SyncEvent::PeerUnavailable {
                    peer,
                    message: source.to_string(),
                });
                false
            }
            Err(other) => {
                warn!(error = %other, "Reconciliation step failed");
                false
            }
        }
    }

    fn ready(&self) {
        info!("Ready");
        self.events.emit_sync(SyncEvent::Ready);
    }
}

fn primary_mut(peers: &mut [Peer], primary: usize) -> Result<&mut Peer> {
    peers.get_mut(primary).ok_or_else(|| {
        SyncError::InvariantViolation(format!("Primary index {} out of range", primary))
    })
}

fn secondaries(peers: &mut [Peer], primary: usize) -> impl Iterator<Item = &mut Peer> {
    peers
        .iter_mut()
        .enumerate()
        .filter(move |(index, _)| *index != primary)
        .map(|(_, peer)| peer)
}

// An already-paused peer is left alone so its position is not disturbed.
async fn pause_if_playing_and_reread(peer: &mut Peer, clock: &dyn Clock) -> Result<()> {
    if peer.speed() != 0 {
        peer.pause().await?;
    }
    peer.refresh_properties(clock).await
}

async fn pause_and_seek(
    peer: &mut Peer,
    target: Millis,
    settle: Duration,
    clock: &dyn Clock,
) -> Result<()> {
    peer.pause().await?;
    peer.seek(target, settle, clock).await
}

async fn play_after(
    peer: &mut Peer,
    wait_ms: Millis,
    clock: &dyn Clock,
    cancel: &CancellationToken,
) -> Result<()> {
    select! {
        _ = cancel.cancelled() => {
            peer.set_expected(ExpectedState::Unknown);
            return Err(SyncError::Cancelled);
        }
        _ = sleep(Duration::from_millis(wait_ms as u64)) => {}
    }

    info!(
        peer = %peer.address(),
        wait_ms,
        "Playing {} having waited {}ms",
        peer.address(),
        wait_ms
    );
    peer.play(clock).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        CurrentItem, EndpointHandle, PlaybackEndpoint, PlaybackProperties, PlayerId, SystemClock,
    };
    use std::sync::Arc;

    struct FixedEndpoint {
        speed: i32,
    }

    #[async_trait]
    impl PlaybackEndpoint for FixedEndpoint {
        async fn active_player(&self) -> BridgeResult<Option<PlayerId>> {
            Ok(Some(PlayerId(1)))
        }

        async fn current_item(&self, _player: PlayerId) -> BridgeResult<CurrentItem> {
            Ok(CurrentItem::default())
        }

        async fn playback_properties(&self, _player: PlayerId) -> BridgeResult<PlaybackProperties> {
            Ok(PlaybackProperties {
                speed: self.speed,
                position_ms: 10_000,
                duration_ms: 100_000,
            })
        }

        async fn set_pause(&self, _player: PlayerId, paused: bool) -> BridgeResult<i32> {
            Ok(if paused { 0 } else { 1 })
        }

        async fn seek(&self, _player: PlayerId, _percentage: f64) -> BridgeResult<()> {
            Ok(())
        }
    }

    async fn peers_with_speeds(speeds: &[i32]) -> Vec<Peer> {
        let mut peers = Vec::new();
        for (index, speed) in speeds.iter().enumerate() {
            let handle = EndpointHandle::new(
                format!("kodi-{}", index),
                Arc::new(FixedEndpoint { speed: *speed }),
            );
            let mut peer = Peer::new(handle);
            peer.refresh(&SystemClock).await.unwrap();
            peers.push(peer);
        }
        peers
    }

    #[core_async::test]
    async fn test_select_protocol_by_unsynced_count() {
        let peers = peers_with_speeds(&[1, 0, 1]).await;

        assert_eq!(select_protocol(&peers, &[]).unwrap(), Protocol::Idle);
        assert_eq!(select_protocol(&peers, &[0, 2]).unwrap(), Protocol::FullResync);
        assert_eq!(
            select_protocol(&peers, &[0]).unwrap(),
            Protocol::PrimaryPlaying { primary: 0 }
        );
        assert_eq!(
            select_protocol(&peers, &[1]).unwrap(),
            Protocol::PrimaryPaused { primary: 1 }
        );
    }

    #[core_async::test]
    async fn test_lone_transitional_primary_is_an_invariant_violation() {
        let peers = peers_with_speeds(&[1, 2]).await;
        let err = select_protocol(&peers, &[1]).unwrap_err();
        assert!(matches!(err, SyncError::InvariantViolation(_)));
        assert!(err.is_fatal());
    }

    #[core_async::test]
    async fn test_out_of_range_primary_is_an_invariant_violation() {
        let peers = peers_with_speeds(&[1]).await;
        assert!(select_protocol(&peers, &[3]).is_err());
    }

    #[core_async::test]
    async fn test_earliest_position_skips_peers_without_player() {
        let mut peers = peers_with_speeds(&[0, 0]).await;
        assert_eq!(earliest_position(&peers), Some(10_000));

        peers[0].mark_unavailable();
        peers[1].mark_unavailable();
        assert_eq!(earliest_position(&peers), None);
    }
}
