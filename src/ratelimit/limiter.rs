//! Core rate limiter implementation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::log::AccessLog;
use crate::error::{Result, RosterError};

/// How often stale identities are swept out of the limiter.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Mutable limiter state, guarded as one unit.
struct LimiterState {
    /// Access history indexed by identity
    logs: HashMap<String, AccessLog>,
    /// When the last cleanup pass ran
    last_cleanup: Instant,
}

/// A sliding-window rate limiter keyed by client identity.
///
/// At most `limit` requests are admitted for an identity within any span of
/// `window`. This struct is thread-safe and is meant to be constructed once
/// at startup and shared behind an `Arc`.
pub struct RateLimiter {
    /// Maximum admitted requests per window
    limit: u32,
    /// Length of the sliding window
    window: Duration,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Per-identity logs and cleanup bookkeeping
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a new rate limiter backed by the system clock.
    ///
    /// Fails with [`RosterError::Config`] if `limit` is zero or `window` is
    /// empty.
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    /// Create a new rate limiter with an explicit time source.
    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if limit == 0 {
            return Err(RosterError::Config(
                "rate limit must be greater than zero".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(RosterError::Config(
                "rate limit window must be greater than zero".to_string(),
            ));
        }

        let now = clock.now();
        Ok(Self {
            limit,
            window,
            clock,
            state: Mutex::new(LimiterState {
                logs: HashMap::new(),
                last_cleanup: now,
            }),
        })
    }

    /// Maximum admitted requests per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Length of the sliding window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether a request from `identity` may proceed.
    ///
    /// Expired entries are evicted as part of every check. On admission the
    /// current instant is appended to the identity's log; the filter, count
    /// and append happen under one lock acquisition.
    pub fn is_allowed(&self, identity: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();

        self.maybe_cleanup(&mut state, now);

        let log = state.logs.entry(identity.to_string()).or_default();
        let in_window = match now.checked_sub(self.window) {
            Some(cutoff) => log.retain_since(cutoff),
            None => log.len(),
        };

        if in_window < self.limit as usize {
            log.record(now);
            trace!(
                identity = %identity,
                count = in_window + 1,
                limit = self.limit,
                "Request admitted"
            );
            true
        } else {
            debug!(
                identity = %identity,
                count = in_window,
                limit = self.limit,
                "Rate limit exceeded"
            );
            false
        }
    }

    /// Charge `identity` for a request that was admitted but failed.
    ///
    /// The entry counts toward the limit exactly like an admission. This
    /// never rejects.
    pub fn record_penalty(&self, identity: &str) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        self.maybe_cleanup(&mut state, now);

        state
            .logs
            .entry(identity.to_string())
            .or_default()
            .record(now);

        debug!(identity = %identity, "Penalty recorded");
    }

    /// Number of entries for `identity` that currently fall inside the window.
    pub fn recorded(&self, identity: &str) -> usize {
        let now = self.clock.now();
        let state = self.state.lock();

        match state.logs.get(identity) {
            Some(log) => match now.checked_sub(self.window) {
                Some(cutoff) => log.count_since(cutoff),
                None => log.len(),
            },
            None => 0,
        }
    }

    /// Number of identities with retained history.
    pub fn tracked_identities(&self) -> usize {
        self.state.lock().logs.len()
    }

    /// Sweep stale identities if the cleanup interval has elapsed.
    ///
    /// Keeps entries within twice the window so that a sweep can never drop
    /// history still needed by a decision.
    fn maybe_cleanup(&self, state: &mut LimiterState, now: Instant) {
        if now.saturating_duration_since(state.last_cleanup) <= CLEANUP_INTERVAL {
            return;
        }

        let before = state.logs.len();
        let retention = self.window.checked_mul(2);
        if let Some(cutoff) = retention.and_then(|span| now.checked_sub(span)) {
            state.logs.retain(|_, log| log.retain_since(cutoff) > 0);
        }
        state.last_cleanup = now;

        debug!(
            removed = before - state.logs.len(),
            remaining = state.logs.len(),
            "Rate limiter cleanup completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::MockClock;
    use std::sync::Barrier;

    fn limiter_with_clock(limit: u32, window_secs: u64) -> (RateLimiter, MockClock) {
        let clock = MockClock::default();
        let limiter =
            RateLimiter::with_clock(limit, Duration::from_secs(window_secs), Arc::new(clock.clone()))
                .unwrap();
        (limiter, clock)
    }

    #[test]
    fn test_rejects_zero_limit() {
        let result = RateLimiter::new(0, Duration::from_secs(60));
        assert!(matches!(result, Err(RosterError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_window() {
        let result = RateLimiter::new(5, Duration::ZERO);
        assert!(matches!(result, Err(RosterError::Config(_))));
    }

    #[test]
    fn test_limit_plus_one_is_rejected() {
        let (limiter, _clock) = limiter_with_clock(3, 10);

        for i in 0..3 {
            assert!(limiter.is_allowed("192.168.1.100"), "request {} should pass", i);
        }
        assert!(!limiter.is_allowed("192.168.1.100"));
        assert!(!limiter.is_allowed("192.168.1.100"));
        assert_eq!(limiter.recorded("192.168.1.100"), 3);
    }

    #[test]
    fn test_allowed_again_after_window() {
        let (limiter, clock) = limiter_with_clock(3, 10);

        assert!(limiter.is_allowed("client"));
        assert!(limiter.is_allowed("client"));
        assert!(limiter.is_allowed("client"));
        assert!(!limiter.is_allowed("client"));

        clock.advance(Duration::from_secs(11));
        assert!(limiter.is_allowed("client"));
    }

    #[test]
    fn test_entry_exactly_at_cutoff_still_counts() {
        let (limiter, clock) = limiter_with_clock(1, 10);

        assert!(limiter.is_allowed("client"));
        clock.advance(Duration::from_secs(10));
        assert!(!limiter.is_allowed("client"));

        clock.advance(Duration::from_millis(1));
        assert!(limiter.is_allowed("client"));
    }

    #[test]
    fn test_window_slides_instead_of_resetting() {
        let (limiter, clock) = limiter_with_clock(3, 10);

        assert!(limiter.is_allowed("client"));
        assert!(limiter.is_allowed("client"));
        clock.advance(Duration::from_secs(5));
        assert!(limiter.is_allowed("client"));
        assert!(!limiter.is_allowed("client"));

        // The first two entries expire; the one at t+5s still counts.
        clock.advance(Duration::from_secs(6));
        assert!(limiter.is_allowed("client"));
        assert!(limiter.is_allowed("client"));
        assert!(!limiter.is_allowed("client"));
    }

    #[test]
    fn test_real_time_window_recovers() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50)).unwrap();

        assert!(limiter.is_allowed("client"));
        assert!(limiter.is_allowed("client"));
        assert!(!limiter.is_allowed("client"));

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.is_allowed("client"));
    }

    #[test]
    fn test_identities_have_separate_budgets() {
        let (limiter, _clock) = limiter_with_clock(2, 60);

        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(!limiter.is_allowed("10.0.0.1"));

        assert!(limiter.is_allowed("10.0.0.2"));
        assert!(limiter.is_allowed("10.0.0.2"));
    }

    #[test]
    fn test_identities_are_case_sensitive() {
        let (limiter, _clock) = limiter_with_clock(1, 60);

        assert!(limiter.is_allowed("client-a"));
        assert!(limiter.is_allowed("CLIENT-A"));
        assert!(!limiter.is_allowed("client-a"));
    }

    #[test]
    fn test_penalty_counts_toward_limit() {
        let (limiter, _clock) = limiter_with_clock(3, 60);

        assert!(limiter.is_allowed("client"));
        assert!(limiter.is_allowed("client"));
        limiter.record_penalty("client");

        assert_eq!(limiter.recorded("client"), 3);
        assert!(!limiter.is_allowed("client"));
    }

    #[test]
    fn test_penalty_never_rejects() {
        let (limiter, _clock) = limiter_with_clock(1, 60);

        assert!(limiter.is_allowed("client"));
        limiter.record_penalty("client");
        limiter.record_penalty("client");
        assert_eq!(limiter.recorded("client"), 3);
    }

    #[test]
    fn test_penalty_on_unknown_identity() {
        let (limiter, _clock) = limiter_with_clock(1, 60);

        limiter.record_penalty("fresh");
        assert!(!limiter.is_allowed("fresh"));
    }

    #[test]
    fn test_cleanup_removes_stale_identities() {
        let (limiter, clock) = limiter_with_clock(5, 60);

        assert!(limiter.is_allowed("stale"));
        assert_eq!(limiter.tracked_identities(), 1);

        clock.advance(CLEANUP_INTERVAL + Duration::from_secs(1));
        assert!(limiter.is_allowed("active"));

        assert_eq!(limiter.tracked_identities(), 1);
        assert_eq!(limiter.recorded("stale"), 0);
    }

    #[test]
    fn test_cleanup_is_gated_by_interval() {
        let (limiter, clock) = limiter_with_clock(5, 60);

        assert!(limiter.is_allowed("idle"));
        clock.advance(Duration::from_secs(200));
        assert!(limiter.is_allowed("other"));

        // The idle identity is long out of its window but no sweep has run.
        assert_eq!(limiter.tracked_identities(), 2);
    }

    #[test]
    fn test_cleanup_keeps_entries_inside_window() {
        let (limiter, clock) = limiter_with_clock(2, 600);

        assert!(limiter.is_allowed("client"));
        clock.advance(CLEANUP_INTERVAL + Duration::from_secs(1));

        // Triggers a sweep while the first entry is mid-window.
        assert!(limiter.is_allowed("someone-else"));
        assert_eq!(limiter.tracked_identities(), 2);
        assert_eq!(limiter.recorded("client"), 1);

        assert!(limiter.is_allowed("client"));
        assert!(!limiter.is_allowed("client"));
    }

    #[test]
    fn test_cleanup_keeps_entries_within_twice_window() {
        let (limiter, clock) = limiter_with_clock(2, 200);

        assert!(limiter.is_allowed("client"));
        clock.advance(CLEANUP_INTERVAL + Duration::from_secs(1));
        assert!(limiter.is_allowed("someone-else"));

        // Outside the window but inside the retention margin.
        assert_eq!(limiter.tracked_identities(), 2);
        assert_eq!(limiter.recorded("client"), 0);
    }

    #[test]
    fn test_cleanup_runs_from_record_penalty() {
        let (limiter, clock) = limiter_with_clock(5, 60);

        assert!(limiter.is_allowed("stale"));
        clock.advance(CLEANUP_INTERVAL + Duration::from_secs(1));

        limiter.record_penalty("failing");

        assert_eq!(limiter.tracked_identities(), 1);
        assert_eq!(limiter.recorded("failing"), 1);
        assert_eq!(limiter.recorded("stale"), 0);
    }

    #[test]
    fn test_cleanup_with_unbounded_window_does_not_panic() {
        let (limiter, clock) = limiter_with_clock(5, u64::MAX);

        assert!(limiter.is_allowed("a"));
        clock.advance(CLEANUP_INTERVAL + Duration::from_secs(1));

        assert!(limiter.is_allowed("a"));
        limiter.record_penalty("a");
        assert_eq!(limiter.tracked_identities(), 1);
        assert_eq!(limiter.recorded("a"), 3);
    }

    #[test]
    fn test_concurrent_callers_admit_exactly_limit() {
        const CALLERS: usize = 64;
        const LIMIT: u32 = 10;

        let limiter = Arc::new(RateLimiter::new(LIMIT, Duration::from_secs(60)).unwrap());
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    limiter.is_allowed("shared")
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(admitted, LIMIT as usize);
        assert_eq!(limiter.recorded("shared"), LIMIT as usize);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_admit_exactly_limit() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(60)).unwrap());

        let tasks = (0..40).map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.is_allowed("shared") })
        });

        let results = futures::future::join_all(tasks).await;
        let admitted = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(admitted, 5);
    }
}
