//! Monotonic clock for sync baselines.

use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_async::time::Instant;

/// A [`Clock`] that reads wall time once and then advances monotonically.
///
/// Expected positions are projected as `position + (now - observed_at)`, so a
/// wall-clock step (NTP, DST on a misconfigured host) would look like drift on
/// every peer at once. This clock measures elapsed time with the runtime's
/// [`Instant`], which also means it follows Tokio's paused clock in tests.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    anchor_wall: DateTime<Utc>,
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Start the clock at a fixed wall time; handy in tests.
    pub fn anchored_at(anchor_wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall,
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.anchor.elapsed();
        let elapsed = chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero());
        self.anchor_wall + elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_async::time::{sleep, Duration};

    #[core_async::test(start_paused)]
    async fn test_follows_paused_runtime_time() {
        let anchor = DateTime::from_timestamp_millis(1_000_000).unwrap();
        let clock = MonotonicClock::anchored_at(anchor);
        assert_eq!(clock.unix_timestamp_millis(), 1_000_000);

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(clock.unix_timestamp_millis(), 1_001_500);
    }

    #[test]
    fn test_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
