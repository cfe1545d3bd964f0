//! Keyed token-bucket rate limiting for CEX APIs and chain RPCs.
//!
//! Keys are `cex:<id>` or `chain:<name>`. Each bucket serializes its own
//! acquirers behind a mutex; buckets are independent so one slow venue
//! never throttles another.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::chains::CHAINS;
use crate::config::exchanges::EXCHANGES;

/// Requests per second and burst capacity for an unregistered key.
const DEFAULT_RATE: f64 = 10.0;
const DEFAULT_BURST: f64 = 5.0;

/// Conservative rate for free public RPCs.
const CHAIN_RATE: f64 = 25.0;
const CHAIN_BURST: f64 = 5.0;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Classic token bucket: tokens accrue at `rate` up to `burst`; an
/// acquire consumes one token or sleeps until one would exist.
pub struct TokenBucket {
    rate: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            rate,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    pub async fn acquire(&self) {
        let wait = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let elapsed = now.duration_since(state.last_refill).as_secs_f64();
            if elapsed > 0.0 {
                state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
                state.last_refill = now;
            }

            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                0.0
            } else {
                // Reserve the token we are about to wait for
                let wait = (1.0 - state.tokens) / self.rate;
                state.tokens = 0.0;
                wait
            }
        };

        if wait > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
        }
    }
}

/// Process-wide registry of buckets, one per venue/chain key.
pub struct RateGovernor {
    buckets: DashMap<String, Arc<TokenBucket>>,
}

impl RateGovernor {
    /// Build with buckets registered for every configured exchange and chain.
    pub fn new() -> Self {
        let governor = Self {
            buckets: DashMap::new(),
        };
        for exchange in EXCHANGES {
            governor.register(
                format!("cex:{}", exchange.id),
                exchange.rate_limit_per_second,
                3.0,
            );
        }
        for chain in CHAINS {
            governor.register(format!("chain:{}", chain.name), CHAIN_RATE, CHAIN_BURST);
        }
        governor
    }

    pub fn register(&self, key: String, rate: f64, burst: f64) {
        self.buckets.insert(key, Arc::new(TokenBucket::new(rate, burst)));
    }

    /// Block until the key's bucket yields a token. Unregistered keys get
    /// a default bucket on first touch.
    pub async fn acquire(&self, key: &str) {
        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(TokenBucket::new(DEFAULT_RATE, DEFAULT_BURST)))
            .clone();
        bucket.acquire().await;
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_then_refill() {
        let bucket = TokenBucket::new(10.0, 3.0);

        // Burst capacity: three immediate acquisitions
        let start = Instant::now();
        for _ in 0..3 {
            bucket.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        // Fourth must wait one refill period (100ms at 10/s)
        bucket.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn window_bound_holds_under_continuous_demand() {
        // Over a window of length T, acquisitions <= burst + rate * T
        let bucket = TokenBucket::new(20.0, 5.0);
        let window = Duration::from_secs(1);
        let start = Instant::now();

        let mut acquired: u32 = 0;
        while start.elapsed() < window {
            bucket.acquire().await;
            acquired += 1;
        }
        assert!(
            acquired <= 5 + 20 + 1,
            "acquired {acquired} in 1s from a 20/s burst-5 bucket"
        );
    }

    #[tokio::test]
    async fn unknown_key_gets_default_bucket() {
        let governor = RateGovernor::new();
        // Must not panic or hang on a key nobody registered
        governor.acquire("cex:some-new-venue").await;
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let governor = RateGovernor::new();
        governor.register("a".into(), 1.0, 1.0);
        governor.register("b".into(), 1.0, 1.0);

        let start = Instant::now();
        governor.acquire("a").await;
        governor.acquire("b").await;
        // Draining a's burst does not delay b
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
