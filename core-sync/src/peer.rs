//! # Peer State
//!
//! The core's local model of one endpoint: the facts read during the current
//! cycle plus the expected state the last reconciliation action established.
//!
//! ## Expected state
//!
//! [`ExpectedState`] only changes as a consequence of a command this crate
//! issued against the peer (`pause`, `play`, `seek`), or by being discarded
//! (`declare_unsynced`, `mark_unavailable`, losing the active player). A
//! passive read never sets a baseline.

use crate::error::{Result, SyncError};
use bridge_traits::{
    Clock, CurrentItem, EndpointHandle, Millis, PlaybackEndpoint, PlaybackProperties, PlayerId,
    SpeedState, UNKNOWN_INDEX,
};
use core_async::task::join;
use core_async::time::{sleep, Duration};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The play/pause baseline the core believes it last established for a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExpectedState {
    /// No baseline; the peer counts as unsynced.
    Unknown,
    Paused {
        position: Millis,
    },
    /// Playing from `position` as of `observed_at` (clock milliseconds).
    Playing {
        position: Millis,
        observed_at: Millis,
    },
}

impl ExpectedState {
    pub fn is_known(&self) -> bool {
        !matches!(self, ExpectedState::Unknown)
    }
}

impl Default for ExpectedState {
    fn default() -> Self {
        ExpectedState::Unknown
    }
}

/// One configured endpoint and everything the core knows about it.
pub struct Peer {
    address: String,
    endpoint: Arc<dyn PlaybackEndpoint>,
    player: Option<PlayerId>,
    item: CurrentItem,
    properties: PlaybackProperties,
    last_query_ms: Millis,
    expected: ExpectedState,
    prior_expected: Option<ExpectedState>,
    available: bool,
}

impl Peer {
    pub fn new(handle: EndpointHandle) -> Self {
        Self {
            address: handle.address,
            endpoint: handle.proxy,
            player: None,
            item: CurrentItem::default(),
            properties: PlaybackProperties {
                speed: 0,
                position_ms: 0,
                duration_ms: 0,
            },
            last_query_ms: 0,
            expected: ExpectedState::Unknown,
            prior_expected: None,
            available: false,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn player(&self) -> Option<PlayerId> {
        self.player
    }

    pub fn item(&self) -> &CurrentItem {
        &self.item
    }

    pub fn properties(&self) -> &PlaybackProperties {
        &self.properties
    }

    pub fn speed(&self) -> i32 {
        self.properties.speed
    }

    pub fn state(&self) -> SpeedState {
        self.properties.state()
    }

    pub fn position(&self) -> Millis {
        self.properties.position_ms
    }

    pub fn duration(&self) -> Millis {
        self.properties.duration_ms
    }

    /// Clock time at which the current properties were requested.
    pub fn last_query_ms(&self) -> Millis {
        self.last_query_ms
    }

    pub fn expected(&self) -> ExpectedState {
        self.expected
    }

    /// Baseline held just before the peer was last declared unsynced.
    pub fn prior_expected(&self) -> Option<ExpectedState> {
        self.prior_expected
    }

    /// `true` once this cycle's reads succeeded and no command has failed since.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether the peer has an active video player and answered this cycle.
    pub fn is_playing_video(&self) -> bool {
        self.available && self.player.is_some()
    }

    /// Drop the baseline after a negative drift verdict, remembering it for diagnostics.
    pub fn declare_unsynced(&mut self) {
        self.prior_expected = Some(self.expected);
        self.expected = ExpectedState::Unknown;
    }

    /// Take the peer out of the current cycle after a failed query or command.
    pub fn mark_unavailable(&mut self) {
        self.available = false;
        self.expected = ExpectedState::Unknown;
    }

    pub(crate) fn set_expected(&mut self, expected: ExpectedState) {
        self.expected = expected;
    }

    fn fail(&mut self, source: bridge_traits::BridgeError) -> SyncError {
        self.mark_unavailable();
        SyncError::endpoint(&self.address, source)
    }

    fn require_player(&mut self) -> Result<PlayerId> {
        match self.player {
            Some(player) => Ok(player),
            None => Err(self.fail(bridge_traits::BridgeError::NotAvailable(
                "no active video player".to_string(),
            ))),
        }
    }

    /// Refresh the active player and, if there is one, its item and properties.
    ///
    /// Item and properties are read concurrently. Without an active player
    /// the baseline is discarded.
    pub async fn refresh(&mut self, clock: &dyn Clock) -> Result<()> {
        let player = match self.endpoint.active_player().await {
            Ok(player) => player,
            Err(e) => {
                self.player = None;
                return Err(self.fail(e));
            }
        };

        self.player = player;
        let Some(player) = player else {
            self.available = true;
            self.expected = ExpectedState::Unknown;
            return Ok(());
        };

        let query_ms = clock.unix_timestamp_millis();
        let (item, properties) = join(
            self.endpoint.current_item(player),
            self.endpoint.playback_properties(player),
        )
        .await;

        match (item, properties) {
            (Ok(item), Ok(properties)) => {
                self.item = item;
                self.properties = properties;
                self.last_query_ms = query_ms;
                self.available = true;
                Ok(())
            }
            (Err(e), _) | (_, Err(e)) => Err(self.fail(e)),
        }
    }

    /// Re-read playback properties only.
    pub async fn refresh_properties(&mut self, clock: &dyn Clock) -> Result<()> {
        let player = self.require_player()?;
        let query_ms = clock.unix_timestamp_millis();

        match self.endpoint.playback_properties(player).await {
            Ok(properties) => {
                self.properties = properties;
                self.last_query_ms = query_ms;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Pause; the baseline becomes paused at the last read position.
    pub async fn pause(&mut self) -> Result<()> {
        let player = self.require_player()?;

        match self.endpoint.set_pause(player, true).await {
            Ok(_) => {
                self.properties.speed = 0;
                self.expected = ExpectedState::Paused {
                    position: self.position(),
                };
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Resume; the baseline becomes playing from the last read position as of now.
    pub async fn play(&mut self, clock: &dyn Clock) -> Result<()> {
        let player = self.require_player()?;

        match self.endpoint.set_pause(player, false).await {
            Ok(speed) => {
                self.properties.speed = speed;
                self.expected = ExpectedState::Playing {
                    position: self.position(),
                    observed_at: clock.unix_timestamp_millis(),
                };
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Seek to `target`, let the remote side settle, then re-read.
    ///
    /// The baseline is taken from the post-seek read: playing if the peer
    /// reports normal speed, paused otherwise.
    pub async fn seek(&mut self, target: Millis, settle: Duration, clock: &dyn Clock) -> Result<()> {
        let player = self.require_player()?;
        let Some(percentage) = seek_percentage(target, self.duration()) else {
            return Err(self.fail(bridge_traits::BridgeError::NotAvailable(format!(
                "duration unknown; cannot seek to {}",
                format_position(target)
            ))));
        };

        debug!(
            peer = %self.address,
            target = %format_position(target),
            percentage,
            "Seeking"
        );

        if let Err(e) = self.endpoint.seek(player, percentage).await {
            return Err(self.fail(e));
        }

        // Remote seeks neither complete synchronously nor land exactly.
        sleep(settle).await;
        self.refresh_properties(clock).await?;

        self.expected = match self.state() {
            SpeedState::Playing => ExpectedState::Playing {
                position: self.position(),
                observed_at: self.last_query_ms,
            },
            _ => ExpectedState::Paused {
                position: self.position(),
            },
        };
        Ok(())
    }

    /// Human-readable summary of what the peer is showing.
    pub fn now_playing(&self) -> String {
        if self.player.is_none() {
            return "not playing a video".to_string();
        }

        let item = &self.item;
        if let Some(show) = item.show_title.as_deref().filter(|s| !s.is_empty()) {
            return format!(
                "{} {:02}x{:02}, \"{}\"",
                show,
                item.season.unwrap_or(UNKNOWN_INDEX),
                item.episode.unwrap_or(UNKNOWN_INDEX),
                item.title.as_deref().unwrap_or_default()
            );
        }

        item.title
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(item.label.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("address", &self.address)
            .field("player", &self.player)
            .field("properties", &self.properties)
            .field("expected", &self.expected)
            .field("available", &self.available)
            .finish()
    }
}

/// Percentage of `duration` that `target` falls at, clamped to `0..=100`.
///
/// `None` for a zero or negative duration (live streams, items still loading).
pub fn seek_percentage(target: Millis, duration: Millis) -> Option<f64> {
    if duration <= 0 {
        return None;
    }
    Some((100.0 * target as f64 / duration as f64).clamp(0.0, 100.0))
}

/// Formats a position as `[Hh]MM:SS.mmm`.
pub fn format_position(ms: Millis) -> String {
    let ms = ms.max(0);
    let millis = ms % 1000;
    let seconds = (ms / 1000) % 60;
    let minutes = (ms / 60_000) % 60;
    let hours = ms / 3_600_000;

    let prefix = if hours > 0 {
        format!("{}h", hours)
    } else {
        String::new()
    };
    format!("{}{:02}:{:02}.{:03}", prefix, minutes, seconds, millis)
}
