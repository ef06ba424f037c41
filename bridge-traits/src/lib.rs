//! # Host Bridge Traits
//!
//! Contracts between the sync core and the host that embeds it.
//!
//! ## Overview
//!
//! The core never talks to the network or the system clock directly. It asks
//! for capabilities through the traits below, and each host ships concrete
//! adapters (`bridge-desktop` for the command-line build, in-memory fakes in
//! tests).
//!
//! ## Traits
//!
//! - [`PlaybackEndpoint`](endpoint::PlaybackEndpoint) - Query and command one remote media player
//! - [`HttpClient`](http::HttpClient) - Single-attempt HTTP request/response
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert transport-specific failures into it and never retry on their own.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so one handle can be driven from
//! concurrently running per-peer futures.

pub mod endpoint;
pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use endpoint::{
    CurrentItem, EndpointHandle, Millis, PlaybackEndpoint, PlaybackProperties, PlayerId,
    SpeedState, UNKNOWN_INDEX,
};
pub use http::{BasicAuth, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
