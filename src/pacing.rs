//! Jittered sleeps between calls to external services.

use rand::Rng;
use std::time::Duration;
use tracing::trace;

/// Sleeps a random duration in `[min, max]` after each external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPacing {
    pub min: Duration,
    pub max: Duration,
}

impl Default for RateLimitPacing {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(2),
        }
    }
}

impl RateLimitPacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// No sleeping at all.
    pub fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let millis = rand::rng().random_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(millis as u64)
    }

    pub fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        trace!("Sleeping {:?}", delay);
        std::thread::sleep(delay);
    }
}
