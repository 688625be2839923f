//! Minimum spacing between outbound requests
//!
//! Each key (a host, or one shared key in global scope) has its own async
//! lock around a [`HostState`]. The wait and the timestamp update happen
//! while that lock is held, so two callers can never pass the gate for the
//! same key within one interval. Keys never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{RateLimitConfig, RateLimitScope};
use crate::state::HostState;
use crate::url::matches_wildcard;

/// Key shared by every host in global scope
const GLOBAL_KEY: &str = "*";

#[derive(Debug)]
pub struct RateLimiter {
    scope: RateLimitScope,
    default_interval: Duration,

    /// (host pattern, interval) overrides, first match wins
    overrides: Vec<(String, Duration)>,

    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<HostState>>>>,
}

impl RateLimiter {
    pub fn new(scope: RateLimitScope, min_interval: Duration) -> Self {
        Self {
            scope,
            default_interval: min_interval,
            overrides: Vec::new(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        let mut limiter = Self::new(config.scope, Duration::from_millis(config.min_interval));
        for host in &config.hosts {
            limiter = limiter.with_override(&host.host, Duration::from_millis(host.min_interval));
        }
        limiter
    }

    /// Sets a different interval for hosts matching `pattern`
    pub fn with_override(mut self, pattern: &str, min_interval: Duration) -> Self {
        self.overrides.push((pattern.to_lowercase(), min_interval));
        self
    }

    /// Interval that applies to `host`
    pub fn interval_for(&self, host: &str) -> Duration {
        let host = host.to_lowercase();
        self.overrides
            .iter()
            .find(|(pattern, _)| matches_wildcard(pattern, &host))
            .map(|(_, interval)| *interval)
            .unwrap_or(self.default_interval)
    }

    fn key_for(&self, host: &str) -> String {
        match self.scope {
            RateLimitScope::PerHost => host.to_lowercase(),
            RateLimitScope::Global => GLOBAL_KEY.to_string(),
        }
    }

    fn slot(&self, key: &str) -> Arc<tokio::sync::Mutex<HostState>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(HostState::new()))),
        )
    }

    /// Suspends until a request to `host` is permitted, then records it
    ///
    /// Dropping the returned future before it completes records nothing.
    pub async fn acquire(&self, host: &str) {
        let interval = self.interval_for(host);
        let key = self.key_for(host);
        let slot = self.slot(&key);
        let mut state = slot.lock().await;

        if let Some(wait) = state.time_until_next_request(interval, Instant::now()) {
            tracing::debug!("Rate limit: waiting {:?} before next request to {}", wait, host);
            tokio::time::sleep(wait).await;
        }
        state.record_request(Instant::now());
    }

    /// Requests permitted so far for `host`'s key
    pub fn request_count(&self, host: &str) -> u64 {
        let key = self.key_for(host);
        let slot = self.slot(&key);
        let count = slot.try_lock().map(|state| state.request_count).unwrap_or(0);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostRateLimit;

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_waits_full_interval() {
        let limiter = RateLimiter::new(RateLimitScope::PerHost, Duration::from_millis(1000));

        limiter.acquire("www.amazon.com").await;
        let first = Instant::now();
        limiter.acquire("www.amazon.com").await;
        let second = Instant::now();

        assert!(second.duration_since(first) >= Duration::from_millis(1000));
        assert_eq!(limiter.request_count("www.amazon.com"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hosts_are_independent_per_host() {
        let limiter = RateLimiter::new(RateLimitScope::PerHost, Duration::from_millis(1000));

        let start = Instant::now();
        limiter.acquire("www.amazon.com").await;
        limiter.acquire("www.daraz.pk").await;
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_scope_shares_one_gate() {
        let limiter = RateLimiter::new(RateLimitScope::Global, Duration::from_millis(1000));

        let start = Instant::now();
        limiter.acquire("www.amazon.com").await;
        limiter.acquire("www.daraz.pk").await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced() {
        let limiter = Arc::new(RateLimiter::new(
            RateLimitScope::PerHost,
            Duration::from_millis(500),
        ));

        let start = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire("www.daraz.pk").await;
                    Instant::now()
                })
            })
            .collect();

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();
        assert!(times[1].duration_since(times[0]) >= Duration::from_millis(500));
        assert!(times[2].duration_since(times[1]) >= Duration::from_millis(500));
        assert!(times[2].duration_since(start) >= Duration::from_millis(1000));
    }

    #[test]
    fn test_host_overrides() {
        let config = RateLimitConfig {
            min_interval: 1500,
            hosts: vec![HostRateLimit {
                host: "*.daraz.pk".to_string(),
                min_interval: 3000,
            }],
            ..Default::default()
        };
        let limiter = RateLimiter::from_config(&config);
        assert_eq!(limiter.interval_for("www.daraz.pk"), Duration::from_millis(3000));
        assert_eq!(limiter.interval_for("WWW.DARAZ.PK"), Duration::from_millis(3000));
        assert_eq!(limiter.interval_for("www.amazon.com"), Duration::from_millis(1500));
    }
}
