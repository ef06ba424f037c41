//! # Drift Classifier
//!
//! Compares each peer's fresh observation against its expected state.
//!
//! - Paused peers are synced when expected paused within the threshold.
//! - Playing peers are synced when expected playing and within the threshold
//!   of `position + (last_query - observed_at)`.
//! - Any other speed (scrubbing, fast-forward) is left alone for the cycle,
//!   with or without a baseline; it is judged once it settles at 0 or 1.
//! - A paused or playing peer without a baseline is unsynced.
//! - Peers that did not answer this cycle are not judged at all.
//!
//! [`classify`] is pure; [`assess`] applies the verdicts to the peers and
//! reports them.

use crate::peer::{format_position, ExpectedState, Peer};
use bridge_traits::{Millis, SpeedState};
use core_runtime::events::{EventBus, SyncEvent};
use tracing::{debug, info};

/// Why a peer left its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftReason {
    /// There was no baseline to compare against.
    NoBaseline,
    NewlyPaused,
    SeekedWhilePaused { from: Millis, to: Millis },
    NewlyPlaying,
    SeekedWhilePlaying { expected: Millis, actual: Millis },
}

/// Per-peer, per-cycle outcome of the drift check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Synced,
    /// Neither paused nor playing; treated as synced this cycle.
    Transitional,
    Unsynced(DriftReason),
}

impl Verdict {
    pub fn is_synced(&self) -> bool {
        !matches!(self, Verdict::Unsynced(_))
    }
}

pub fn near_enough(value: Millis, target: Millis, threshold: Millis) -> bool {
    (value - target).abs() < threshold
}

/// Classify one observation against a baseline.
///
/// A transitional speed is never unsynced, so a lone unsynced peer is always
/// paused or playing.
pub fn classify(
    expected: ExpectedState,
    speed: SpeedState,
    position: Millis,
    last_query_ms: Millis,
    threshold: Millis,
) -> Verdict {
    if let SpeedState::Transitional(_) = speed {
        return Verdict::Transitional;
    }
    if expected == ExpectedState::Unknown {
        return Verdict::Unsynced(DriftReason::NoBaseline);
    }

    match (speed, expected) {
        (SpeedState::Paused, ExpectedState::Paused { position: target }) => {
            if near_enough(position, target, threshold) {
                Verdict::Synced
            } else {
                Verdict::Unsynced(DriftReason::SeekedWhilePaused {
                    from: target,
                    to: position,
                })
            }
        }
        (SpeedState::Paused, _) => Verdict::Unsynced(DriftReason::NewlyPaused),
        (
            SpeedState::Playing,
            ExpectedState::Playing {
                position: baseline,
                observed_at,
            },
        ) => {
            let target = baseline + (last_query_ms - observed_at);
            if near_enough(position, target, threshold) {
                Verdict::Synced
            } else {
                Verdict::Unsynced(DriftReason::SeekedWhilePlaying {
                    expected: target,
                    actual: position,
                })
            }
        }
        (SpeedState::Playing, _) => Verdict::Unsynced(DriftReason::NewlyPlaying),
        (SpeedState::Transitional(_), _) => Verdict::Transitional,
    }
}

/// Classify a peer from its current fields.
pub fn classify_peer(peer: &Peer, threshold: Millis) -> Verdict {
    classify(
        peer.expected(),
        peer.state(),
        peer.position(),
        peer.last_query_ms(),
        threshold,
    )
}

/// Classify every peer that answered this cycle, drop the baseline of those
/// that drifted, and return the indices of unsynced peers in configuration
/// order.
pub fn assess(peers: &mut [Peer], threshold: Millis, events: &EventBus) -> Vec<usize> {
    let mut unsynced = Vec::new();

    for (index, peer) in peers.iter_mut().enumerate() {
        if !peer.is_playing_video() {
            continue;
        }

        let verdict = classify_peer(peer, threshold);
        if verdict == Verdict::Transitional && !peer.expected().is_known() {
            debug!(
                peer = %peer.address(),
                speed = peer.speed(),
                "Speed in transition; waiting for it to settle"
            );
        }
        let Verdict::Unsynced(reason) = verdict else {
            continue;
        };

        unsynced.push(index);
        if reason == DriftReason::NoBaseline {
            debug!(peer = %peer.address(), "No sync baseline");
            continue;
        }

        report(peer, reason, events);
        peer.declare_unsynced();
    }

    unsynced
}

fn report(peer: &Peer, reason: DriftReason, events: &EventBus) {
    let address = peer.address().to_string();
    let position_ms = peer.position();

    let event = match reason {
        DriftReason::NoBaseline => return,
        DriftReason::NewlyPaused => {
            info!(peer = %address, position_ms, "{} is newly paused", address);
            SyncEvent::NewlyPaused {
                peer: address,
                position_ms,
            }
        }
        DriftReason::NewlyPlaying => {
            info!(peer = %address, position_ms, "{} is newly playing", address);
            SyncEvent::NewlyPlaying {
                peer: address,
                position_ms,
            }
        }
        DriftReason::SeekedWhilePaused { from, to } => {
            info!(
                peer = %address,
                from_ms = from,
                to_ms = to,
                "{} has seeked while paused from {} to {}",
                address,
                format_position(from),
                format_position(to)
            );
            SyncEvent::SeekedWhilePaused {
                peer: address,
                from_ms: from,
                to_ms: to,
            }
        }
        DriftReason::SeekedWhilePlaying { expected, actual } => {
            info!(
                peer = %address,
                expected_ms = expected,
                actual_ms = actual,
                "{} has seeked while playing from ~{} to {}",
                address,
                format_position(expected),
                format_position(actual)
            );
            SyncEvent::SeekedWhilePlaying {
                peer: address,
                expected_ms: expected,
                actual_ms: actual,
            }
        }
    };

    events.emit_sync(event);
}
