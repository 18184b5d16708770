//! Publish rate limiting

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token-bucket limit on samples per second
///
/// Clones share one bucket, so a limiter handed to every worker of an
/// experiment caps the aggregate publish rate.
#[derive(Clone, Default)]
pub struct PublishRateLimiter {
    limiter: Option<Arc<DirectLimiter>>,
    rate_limit: Option<f64>,
}

impl PublishRateLimiter {
    /// Limiter for `rate_limit` samples per second; `None` or a
    /// non-positive rate disables limiting
    ///
    /// ```
    /// use mqtt_bench_core::worker::PublishRateLimiter;
    ///
    /// let limited = PublishRateLimiter::new(Some(50.0));
    /// assert!(limited.is_enabled());
    /// assert!(!PublishRateLimiter::new(None).is_enabled());
    /// ```
    pub fn new(rate_limit: Option<f64>) -> Self {
        // Fractional rates round up; the bucket needs a whole-number quota.
        let limiter = rate_limit
            .filter(|rps| *rps > 0.0)
            .and_then(|rps| NonZeroU32::new((rps.ceil() as u32).max(1)))
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Self {
            limiter,
            rate_limit,
        }
    }

    /// No limiting
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Wait until the next sample may run
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }

    /// Whether limiting is active
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Configured samples per second
    pub fn rate_limit(&self) -> Option<f64> {
        self.rate_limit
    }
}

impl std::fmt::Debug for PublishRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishRateLimiter")
            .field("rate_limit", &self.rate_limit)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
