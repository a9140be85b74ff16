//! Minimum-delay pacing shared by the catalog providers.

use std::time::{Duration, Instant};
use tracing::debug;

/// Enforces a minimum delay between consecutive requests to one catalog.
pub(crate) struct RateLimiter {
    last_request: Option<Instant>,
    min_delay: Duration,
}

impl RateLimiter {
    pub(crate) fn new(delay_ms: u64) -> Self {
        Self {
            last_request: None,
            min_delay: Duration::from_millis(delay_ms),
        }
    }

    pub(crate) async fn wait_if_needed(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let mut limiter = RateLimiter::new(60_000);
        assert!(limiter.last_request.is_none());

        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(limiter.last_request.is_some());
    }

    #[tokio::test]
    async fn test_second_request_waits() {
        let mut limiter = RateLimiter::new(50);
        limiter.wait_if_needed().await;

        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
