//! Fixed-Window Rate Limiter
//!
//! Counts events per key inside a fixed window: the first consume for a key
//! opens its window, each consume increments the count, and a consume past
//! the threshold is rejected until the window expires. Used with window ids
//! to bound input message rates and with origins to bound window creation.
//!
//! Backed by a concurrent map so admission checks never contend with the
//! scheduler loop. Expired buckets are dropped by the periodic sweep.

use std::hash::Hash;

use dashmap::DashMap;
use tokio::time::{Duration, Instant};

struct Bucket {
    count: u32,
    window_start: Instant,
}

pub struct RateLimiter<K>
where
    K: Eq + Hash,
{
    threshold: u32,
    ttl: Duration,
    buckets: DashMap<K, Bucket>,
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash,
{
    pub fn new(threshold: u32, ttl: Duration) -> Self {
        Self {
            threshold,
            ttl,
            buckets: DashMap::new(),
        }
    }

    /// Consume one slot for `key`. Returns whether the event is admitted.
    /// A threshold of zero admits nothing.
    pub fn consume(&self, key: K) -> bool {
        if self.threshold == 0 {
            return false;
        }
        let now = Instant::now();
        let mut bucket = self.buckets.entry(key).or_insert_with(|| Bucket {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) >= self.ttl {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count < self.threshold {
            bucket.count += 1;
            true
        } else {
            false
        }
    }

    /// Drop buckets whose window has expired. Called from the periodic
    /// sweep so idle keys do not accumulate.
    pub fn prune(&self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.window_start) < ttl);
    }

    /// Number of keys currently holding a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_the_threshold_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(2));

        assert!(limiter.consume("window-a"));
        assert!(limiter.consume("window-a"));
        assert!(limiter.consume("window-a"));
        assert!(!limiter.consume("window-a"));
        assert!(!limiter.consume("window-a"));
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_the_ttl() {
        let limiter = RateLimiter::new(2, Duration::from_secs(2));

        assert!(limiter.consume(1_u64));
        assert!(limiter.consume(1_u64));
        assert!(!limiter.consume(1_u64));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(limiter.consume(1_u64));
        assert!(limiter.consume(1_u64));
        assert!(!limiter.consume(1_u64));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_counted_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));

        assert!(limiter.consume("10.0.0.1"));
        assert!(limiter.consume("10.0.0.2"));
        assert!(!limiter.consume("10.0.0.1"));
        assert!(!limiter.consume("10.0.0.2"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_threshold_admits_nothing() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        assert!(!limiter.consume(1_u64));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn prune_drops_expired_buckets_only() {
        let limiter = RateLimiter::new(5, Duration::from_secs(2));

        limiter.consume("old");
        tokio::time::advance(Duration::from_secs(1)).await;
        limiter.consume("fresh");

        tokio::time::advance(Duration::from_secs(1)).await;
        // "old" opened 2s ago, "fresh" 1s ago.
        limiter.prune();

        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.consume("fresh"));
    }
}
