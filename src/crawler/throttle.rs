//! Per-domain request throttling
//!
//! Enforces a minimum spacing between consecutive requests to the same
//! domain. The throttle is private to one crawl: each site-audit job owns
//! its own instance and no locking is needed.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Per-domain throttle window tracker
///
/// Tracks the last access time for each domain. Callers wait for their
/// turn before dispatching a request; the wait is an async sleep, one of
/// the crawl loop's few suspension points.
pub struct DomainThrottle {
    default_window: Duration,
    last_access: HashMap<String, Instant>,
}

impl DomainThrottle {
    /// Creates a throttle with the configured default window
    pub fn new(default_window: Duration) -> Self {
        Self {
            default_window,
            last_access: HashMap::new(),
        }
    }

    /// The configured spacing applied when no wider window is requested
    pub fn default_window(&self) -> Duration {
        self.default_window
    }

    /// How long until the given domain may be requested again
    ///
    /// Zero when the domain has never been accessed or the window has
    /// already elapsed.
    pub fn time_until_ready(&self, domain: &str, window: Duration) -> Duration {
        match self.last_access.get(domain) {
            Some(last) => window.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Waits until the domain's window has elapsed, then records the access
    ///
    /// `window` is the effective spacing for this request; a robots.txt
    /// crawl delay may widen it beyond the default.
    pub async fn wait_turn(&mut self, domain: &str, window: Duration) {
        let wait = self.time_until_ready(domain, window);
        if !wait.is_zero() {
            tracing::trace!("Throttling {} for {:?}", domain, wait);
            tokio::time::sleep(wait).await;
        }
        self.record_access(domain);
    }

    /// Records an access to a domain without waiting
    pub fn record_access(&mut self, domain: &str) {
        self.last_access.insert(domain.to_string(), Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_access_does_not_wait() {
        let mut throttle = DomainThrottle::new(Duration::from_millis(500));
        let before = Instant::now();
        throttle.wait_turn("example.com", throttle.default_window()).await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_access_waits_out_the_window() {
        let window = Duration::from_millis(500);
        let mut throttle = DomainThrottle::new(window);

        throttle.wait_turn("example.com", window).await;
        let before = Instant::now();
        throttle.wait_turn("example.com", window).await;

        assert!(before.elapsed() >= window);
    }

    #[tokio::test(start_paused = true)]
    async fn test_domains_throttle_independently() {
        let window = Duration::from_millis(500);
        let mut throttle = DomainThrottle::new(window);

        throttle.wait_turn("a.com", window).await;
        let before = Instant::now();
        throttle.wait_turn("b.com", window).await;

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wider_window_honored() {
        let default = Duration::from_millis(100);
        let widened = Duration::from_secs(2);
        let mut throttle = DomainThrottle::new(default);

        throttle.wait_turn("slow.com", widened).await;
        let before = Instant::now();
        throttle.wait_turn("slow.com", widened).await;

        assert!(before.elapsed() >= widened);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_until_ready_after_window_elapsed() {
        let window = Duration::from_millis(200);
        let mut throttle = DomainThrottle::new(window);

        throttle.record_access("example.com");
        assert!(throttle.time_until_ready("example.com", window) > Duration::ZERO);

        tokio::time::sleep(window).await;
        assert_eq!(
            throttle.time_until_ready("example.com", window),
            Duration::ZERO
        );
    }
}
