//! Playback endpoint bridge.
//!
//! A playback endpoint is one remote media player that can be queried and
//! commanded but never pushes notifications. The sync core polls every
//! endpoint each cycle and issues pause/play/seek commands through this trait.
//! Hosts supply the transport (the desktop bridge speaks Kodi JSON-RPC over
//! HTTP); tests supply in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Playback positions and durations, in milliseconds.
pub type Millis = i64;

/// Sentinel the remote side reports for "no season/episode number".
pub const UNKNOWN_INDEX: i32 = -1;

/// Identifier of an active player on a single endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata of the item an endpoint is currently presenting.
///
/// Every field is optional; missing show information falls back to
/// title/label comparison when deciding whether endpoints show the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentItem {
    pub show_title: Option<String>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub title: Option<String>,
    pub label: Option<String>,
}

impl CurrentItem {
    /// Show title, season and episode, when all three are usable.
    ///
    /// Returns `None` if the show title is missing or empty, or if either
    /// number is missing or equal to [`UNKNOWN_INDEX`].
    pub fn episode_info(&self) -> Option<(&str, i32, i32)> {
        let show = self.show_title.as_deref().filter(|s| !s.is_empty())?;
        let season = self.season.filter(|&n| n != UNKNOWN_INDEX)?;
        let episode = self.episode.filter(|&n| n != UNKNOWN_INDEX)?;
        Some((show, season, episode))
    }
}

/// Play/pause state derived from a raw speed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedState {
    Paused,
    Playing,
    /// Scrubbing, fast-forwarding or otherwise in between.
    Transitional(i32),
}

impl From<i32> for SpeedState {
    fn from(speed: i32) -> Self {
        match speed {
            0 => SpeedState::Paused,
            1 => SpeedState::Playing,
            other => SpeedState::Transitional(other),
        }
    }
}

/// Snapshot of an endpoint's playback properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackProperties {
    /// `0` paused, `1` normal playback, anything else transitional.
    pub speed: i32,
    pub position_ms: Millis,
    pub duration_ms: Millis,
}

impl PlaybackProperties {
    pub fn state(&self) -> SpeedState {
        SpeedState::from(self.speed)
    }
}

/// Remote query/command surface of one media player.
///
/// Each call is a single request/response. Implementations must not retry
/// on their own; the sync loop decides what to do with a failure.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::endpoint::PlaybackEndpoint;
///
/// async fn pause_if_playing(endpoint: &dyn PlaybackEndpoint) -> bridge_traits::error::Result<()> {
///     if let Some(player) = endpoint.active_player().await? {
///         let props = endpoint.playback_properties(player).await?;
///         if props.speed != 0 {
///             endpoint.set_pause(player, true).await?;
///         }
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait PlaybackEndpoint: Send + Sync {
    /// The active video player, if any.
    async fn active_player(&self) -> Result<Option<PlayerId>>;

    /// Metadata of the item being played by `player`.
    async fn current_item(&self, player: PlayerId) -> Result<CurrentItem>;

    /// Speed, position and duration of `player`.
    async fn playback_properties(&self, player: PlayerId) -> Result<PlaybackProperties>;

    /// Pause (`true`) or resume (`false`) playback; returns the resulting speed.
    async fn set_pause(&self, player: PlayerId, paused: bool) -> Result<i32>;

    /// Seek to a percentage (`0.0..=100.0`) of the item's duration.
    ///
    /// Completion is not synchronous on the remote side; callers re-read
    /// properties after a settle delay.
    async fn seek(&self, player: PlayerId, percentage: f64) -> Result<()>;
}

/// A playback endpoint bound to the address it was configured with.
#[derive(Clone)]
pub struct EndpointHandle {
    /// Display form of the address (credentials already redacted).
    pub address: String,
    pub proxy: Arc<dyn PlaybackEndpoint>,
}

impl EndpointHandle {
    pub fn new(address: impl Into<String>, proxy: Arc<dyn PlaybackEndpoint>) -> Self {
        Self {
            address: address.into(),
            proxy,
        }
    }
}

impl fmt::Debug for EndpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointHandle")
            .field("address", &self.address)
            .field("proxy", &"PlaybackEndpoint { ... }")
            .finish()
    }
}
