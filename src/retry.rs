//! Retry policy for throttled remote calls.
//!
//! Only [`StoreError::Throttled`] is retried; every other failure kind
//! returns immediately. Delays grow exponentially from `base_delay` and pass
//! through an injectable jitter function, so tests can swap in a
//! deterministic one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::defaults::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::store::StoreError;

type JitterFn = Arc<dyn Fn(Duration) -> Duration + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first call; at least one call is made.
    pub max_attempts: u32,
    pub base_delay: Duration,
    jitter: JitterFn,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        )
    }
}

impl RetryPolicy {
    /// Policy with full jitter: each delay is drawn uniformly from zero up
    /// to the exponential backoff bound.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            jitter: Arc::new(full_jitter),
        }
    }

    /// Replace the jitter function.
    pub fn with_jitter(
        mut self,
        jitter: impl Fn(Duration) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    /// Deterministic policy for tests: no jitter, negligible delays.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::from_millis(1)).with_jitter(|d| d)
    }

    fn backoff_delay(&self, retries_so_far: u32) -> Duration {
        let bound = self
            .base_delay
            .saturating_mul(1u32 << retries_so_far.min(16));
        (self.jitter)(bound)
    }

    /// Run `call` until it succeeds, fails with a non-throttling error, or
    /// throttling outlasts `max_attempts`.
    pub(crate) async fn run<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut retries = 0;
        loop {
            match call().await {
                Err(StoreError::Throttled(reason)) if retries + 1 < self.max_attempts.max(1) => {
                    let delay = self.backoff_delay(retries);
                    retries += 1;
                    tracing::warn!(
                        "{} throttled ({}), retry {}/{} in {:?}",
                        op,
                        reason,
                        retries,
                        self.max_attempts - 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

fn full_jitter(bound: Duration) -> Duration {
    let millis = bound.as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
}
