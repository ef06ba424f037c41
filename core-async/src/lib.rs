//! Async abstraction layer for kodisync.
//!
//! Every other crate in the workspace goes through this crate instead of
//! reaching for Tokio directly. That keeps the runtime choice in one place and
//! lets tests swap in Tokio's paused clock without touching the callers.
//!
//! # Modules
//!
//! - `task`: Task spawning and scatter-gather helpers
//! - `time`: Sleep, timeouts and a monotonic instant that honours paused time
//! - `sync`: Locks, channels and cooperative cancellation
//! - `runtime`: Blocking entry point used by the attribute macros
//! - `signal`: Ctrl-C notification for CLI shutdown
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod signal;
pub mod sync;
pub mod task;
pub mod time;

pub use task::{join_all, spawn};
pub use tokio::select;
pub use time::{sleep, Duration, Instant};
