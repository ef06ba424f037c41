//! Task spawning and scatter-gather helpers.
//!
//! Sync cycles fan work out to every peer and join before moving on. The
//! preferred shape for that is [`join_all`]: all futures run concurrently in
//! the calling task, every result (including failures) is collected, and a
//! failure in one never cancels its siblings. [`spawn`] remains available for
//! work that must outlive the caller, such as the service's background loop.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let results = task::join_all((0..3).map(|i| async move { i * 2 })).await;
//!     assert_eq!(results, vec![0, 2, 4]);
//! }
//! ```

pub use futures::future::{join, join_all};
pub use tokio::task::{yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task using the Tokio runtime.
///
/// The spawned task may run on a different thread.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # async fn example() {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # }
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
