//! Rate Limiter (Token Bucket)
//!
//! Caps how fast callers can start invocations.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    capacity: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimiter {
    /// `burst` requests at once, refilled at `rate_per_sec`
    pub fn new(burst: u32, rate_per_sec: u32) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: burst as f64,
                refilled_at: Instant::now(),
            }),
            capacity: burst as f64,
            refill_per_sec: rate_per_sec as f64,
        }
    }

    /// Take one token. Returns false when the bucket is empty.
    pub fn check(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_burst_then_throttle() {
        let limiter = RateLimiter::new(3, 1);
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }

    #[test]
    fn test_refill() {
        let limiter = RateLimiter::new(1, 50);
        assert!(limiter.check());
        assert!(!limiter.check());
        std::thread::sleep(Duration::from_millis(100));
        assert!(limiter.check());
    }

    #[test]
    fn test_zero_burst_always_throttles() {
        let limiter = RateLimiter::new(0, 100);
        assert!(!limiter.check());
    }
}
