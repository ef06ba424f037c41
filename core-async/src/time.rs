//! Time-related abstractions.
//!
//! Re-exports Tokio's timer primitives. [`Instant`] is Tokio's instant rather
//! than `std::time::Instant` so that elapsed-time measurements follow the
//! paused clock in tests started with `#[core_async::test(start_paused)]`.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(5));
//! }
//! ```

pub use std::time::Duration;
pub use tokio::time::{error::Elapsed, interval, sleep, sleep_until, timeout, Instant, Interval};
