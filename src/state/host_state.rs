use std::time::Duration;

use tokio::time::Instant;

/// Tracks the request history of one rate-limit key (a host, or the global key)
///
/// The rate limiter keeps one of these per key behind a lock; the check and
/// the update happen while the lock is held.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests permitted for this key
    pub request_count: u64,

    /// When the last request was permitted
    pub last_request_time: Option<Instant>,
}

impl HostState {
    /// Creates a new HostState with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, min_interval: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_interval {
            Some(min_interval - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was permitted at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }
}
