//! # Event Bus System
//!
//! Broadcasts what the sync loop observes and does, using `tokio::sync::broadcast`
//! through `core_async::sync`. Hosts subscribe to render status; tests subscribe
//! to assert on protocol selection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     emit      ┌───────────┐     subscribe    ┌────────────┐
//! │ SyncCoordinator ├──────────────>│ EventBus  ├─────────────────>│ CLI output │
//! └─────────────────┘               │ (broadcast│                  └────────────┘
//!                                   │  channel) │     subscribe    ┌────────────┐
//!                                   │           ├─────────────────>│   Tests    │
//!                                   └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::Ready));
//! assert_eq!(rx.try_recv().unwrap(), CoreEvent::Sync(SyncEvent::Ready));
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind by `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender is gone; the service has shut down.
//!
//! Emitting with no subscribers is normal (a headless run) and is not an error.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, TryRecvError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Events from the playback sync loop
    Sync(SyncEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Fatal { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::PeerUnavailable { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::ContentMismatch { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::FullResyncTriggered { .. })
            | CoreEvent::Sync(SyncEvent::PrimarySyncTriggered { .. })
            | CoreEvent::Sync(SyncEvent::Ready)
            | CoreEvent::Sync(SyncEvent::Stopped) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// What the sync loop noticed or did during a cycle.
///
/// Peers are identified by their display address; positions are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Peers are not all presenting the same content.
    ContentMismatch {
        /// One "now playing" label per peer, in configuration order.
        now_playing: Vec<String>,
    },
    /// A peer was expected to be playing (or had no baseline) and is paused.
    NewlyPaused { peer: String, position_ms: i64 },
    /// A peer was expected to be paused (or had no baseline) and is playing.
    NewlyPlaying { peer: String, position_ms: i64 },
    /// A paused peer moved away from its expected position.
    SeekedWhilePaused {
        peer: String,
        from_ms: i64,
        to_ms: i64,
    },
    /// A playing peer drifted from its projected position.
    SeekedWhilePlaying {
        peer: String,
        expected_ms: i64,
        actual_ms: i64,
    },
    /// A query or command against a peer failed this cycle.
    PeerUnavailable { peer: String, message: String },
    /// Two or more peers were unsynced; everyone was sent to `target_ms`.
    FullResyncTriggered { target_ms: i64 },
    /// A single unsynced peer defined the target for the others.
    PrimarySyncTriggered {
        primary: String,
        playing: bool,
        target_ms: i64,
    },
    /// A peer is about to wait `wait_ms` before resuming.
    StaggeredPlay { peer: String, wait_ms: i64 },
    /// All peers are in sync.
    Ready,
    /// The loop honoured a stop request.
    Stopped,
    /// The loop hit an unrecoverable condition and will not continue.
    Fatal { message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::ContentMismatch { .. } => "Not all peers are playing the same content",
            SyncEvent::NewlyPaused { .. } => "Peer was paused",
            SyncEvent::NewlyPlaying { .. } => "Peer started playing",
            SyncEvent::SeekedWhilePaused { .. } => "Peer seeked while paused",
            SyncEvent::SeekedWhilePlaying { .. } => "Peer seeked while playing",
            SyncEvent::PeerUnavailable { .. } => "Peer unavailable",
            SyncEvent::FullResyncTriggered { .. } => "Full resync triggered",
            SyncEvent::PrimarySyncTriggered { .. } => "Primary sync triggered",
            SyncEvent::StaggeredPlay { .. } => "Staggered play scheduled",
            SyncEvent::Ready => "Ready",
            SyncEvent::Stopped => "Sync stopped",
            SyncEvent::Fatal { .. } => "Sync aborted",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; `CoreConfig::validate` rejects that first.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event and returns how many subscribers received it.
    pub fn emit(&self, event: CoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Convenience for publishing a [`SyncEvent`].
    pub fn emit_sync(&self, event: SyncEvent) -> usize {
        self.emit(CoreEvent::Sync(event))
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::new(16);
/// let important = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Info);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
