//! Rate limiter for outbound short-link expansion requests.
//!
//! Sliding window over request timestamps. Requests beyond the limit are
//! refused rather than queued; the expander then degrades to the unexpanded
//! link.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Sliding-window limiter shared by all expansion calls.
#[derive(Clone)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    requests: Arc<RwLock<Vec<Instant>>>,
}

impl RateLimiter {
    /// Limiter allowing `requests_per_minute` within any 60 second window.
    pub fn new(requests_per_minute: u32) -> Self {
        Self::with_window(requests_per_minute, Duration::from_secs(60))
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Record a request if the window has room.
    ///
    /// Returns false when the limit is reached; nothing is recorded then.
    pub async fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|&time| now.duration_since(time) < self.window);

        if requests.len() < self.limit as usize {
            requests.push(now);
            true
        } else {
            metrics::counter!("short_link_rate_limited_total").increment(1);
            false
        }
    }

    /// Current usage of the window.
    pub async fn get_stats(&self) -> RateLimitStats {
        let now = Instant::now();
        let requests = self.requests.read().await;
        let in_window: Vec<&Instant> = requests
            .iter()
            .filter(|&&time| now.duration_since(time) < self.window)
            .collect();
        let used = in_window.len() as u32;

        // The window frees its first slot when the oldest request ages out.
        let reset_in = in_window
            .iter()
            .map(|&&time| self.window.saturating_sub(now.duration_since(time)))
            .min()
            .unwrap_or_default();
        let reset = chrono::Utc::now().timestamp() + reset_in.as_secs() as i64;

        RateLimitStats {
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
            used,
            reset,
        }
    }
}

/// Rate limit statistics
#[derive(Debug, Clone)]
pub struct RateLimitStats {
    pub limit: u32,
    pub remaining: u32,
    pub used: u32,
    pub reset: i64, // Unix timestamp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_requests_within_limit() {
        let limiter = RateLimiter::new(5);
        for _ in 0..5 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test]
    async fn test_refused_requests_are_not_recorded() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
        assert_eq!(limiter.get_stats().await.used, 2);
    }

    #[tokio::test]
    async fn test_window_expiry_frees_capacity() {
        let limiter = RateLimiter::with_window(1, Duration::from_millis(20));
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.try_acquire().await);
    }

    #[tokio::test]
    async fn test_stats() {
        let limiter = RateLimiter::new(10);
        for _ in 0..3 {
            limiter.try_acquire().await;
        }
        let stats = limiter.get_stats().await;
        assert_eq!(stats.limit, 10);
        assert_eq!(stats.used, 3);
        assert_eq!(stats.remaining, 7);
        assert!(stats.reset > 0);
    }
}
