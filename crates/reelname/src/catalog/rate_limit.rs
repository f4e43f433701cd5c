//! Sliding-window request limiter.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use log::debug;
use tokio::time::{sleep, Instant};

/// Allows at most `quota` acquisitions in any rolling `window`.
///
/// Keeps a log of the instants of recent acquisitions. The check-and-record
/// step runs under a lock; waiting happens with the lock released, so a
/// suspended caller never blocks another caller's check.
pub struct RateLimiter {
    quota: usize,
    window: Duration,
    log: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(quota: usize, window: Duration) -> Self {
        Self {
            quota: quota.max(1),
            window,
            log: Mutex::new(VecDeque::with_capacity(quota)),
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits until a request may be sent, then records it.
    pub async fn acquire(&self) {
        loop {
            let wait = match self.try_acquire(Instant::now()) {
                Ok(()) => return,
                Err(wait) => wait,
            };
            debug!("Catalog rate limit reached, waiting {:?}", wait);
            sleep(wait).await;
        }
    }

    /// Records an acquisition at `now` if the window has room; otherwise returns
    /// how long until the oldest entry leaves the window.
    fn try_acquire(&self, now: Instant) -> Result<(), Duration> {
        // A poisoned log is still a valid log of instants.
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());

        while let Some(&oldest) = log.front() {
            if now.duration_since(oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() < self.quota {
            log.push_back(now);
            return Ok(());
        }

        let oldest = log.front().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.duration_since(oldest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_under_quota_does_not_wait() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_quota_waits_for_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        tokio::time::advance(Duration::from_secs(4)).await;

        limiter.acquire().await;
        let waited = Instant::now().duration_since(start);
        assert!(waited >= Duration::from_secs(10), "waited {:?}", waited);
        assert!(waited < Duration::from_secs(11), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_exceeds_quota_under_contention() {
        let quota = 4;
        let window = Duration::from_secs(10);
        let limiter = Arc::new(RateLimiter::new(quota, window));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..11 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        for pair in times.windows(quota + 1) {
            assert!(pair[quota].duration_since(pair[0]) >= window);
        }
        assert!(times[quota].duration_since(start) >= window);
        // 11 calls at 4 per window need three windows.
        assert!(times[10].duration_since(start) >= window * 2);
    }

    #[test]
    fn test_try_acquire_reports_remaining_wait() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(limiter.try_acquire(t0).is_ok());
        assert!(limiter.try_acquire(t0 + Duration::from_secs(3)).is_ok());

        let wait = limiter
            .try_acquire(t0 + Duration::from_secs(6))
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(4));

        assert!(limiter.try_acquire(t0 + Duration::from_secs(10)).is_ok());
    }
}
