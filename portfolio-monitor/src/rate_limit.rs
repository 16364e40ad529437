use crate::traits::Throttle;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum spacing (plus optional jitter) between successive
/// requests, however many workers share it.
pub struct RateLimiter {
    min_interval: Duration,
    jitter: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            jitter: Duration::ZERO,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_millis(min_interval_ms: u64, jitter_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_interval_ms)).with_jitter(Duration::from_millis(jitter_ms))
    }

    /// No spacing at all. For tests and local fixtures.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn jitter_sample(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[async_trait]
impl Throttle for RateLimiter {
    async fn acquire(&self) {
        // Held across the sleep so waiters queue behind one clock.
        let mut last_request = self.last_request.lock().await;

        if let Some(previous) = *last_request {
            let ready_at = previous + self.min_interval + self.jitter_sample();
            let now = Instant::now();
            if ready_at > now {
                debug!("Rate limiting: waiting {:?}", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}
