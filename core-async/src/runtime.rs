//! Runtime utilities that abstract over the underlying async executor.
//!
//! The attribute macros in `core-async-macros` expand to calls into this
//! module, so downstream crates never name Tokio in their entry points.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a multi-threaded runtime.
///
/// Used by `#[core_async::main]`.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Runs the provided future on a current-thread runtime.
///
/// Used by `#[core_async::test]`. When `start_paused` is set the runtime clock
/// starts frozen and auto-advances whenever every task is idle, which makes
/// timer-heavy logic deterministic under test.
pub fn block_on_test<F>(start_paused: bool, future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .start_paused(start_paused)
        .build()
        .expect("core_async::runtime::block_on_test: failed to build Tokio runtime")
        .block_on(future)
}
