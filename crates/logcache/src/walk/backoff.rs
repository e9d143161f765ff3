//! Retry policies consulted by the walker on errors and empty batches

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Error;

/// Decides whether a walk keeps going after an error or an empty batch
///
/// `on_err` and `on_empty` may wait before answering; the walker races them
/// against its context, so a cancelled walk never waits for a backoff to
/// finish. `reset` is called after every non-empty batch.
#[async_trait]
pub trait Backoff: Send {
    /// Return true to retry the same read after a failure
    async fn on_err(&mut self, err: &Error) -> bool;

    /// Return true to retry the same read after an empty batch
    async fn on_empty(&mut self) -> bool;

    /// Forget any accumulated state
    fn reset(&mut self);
}

/// Never retries; a walk ends on its first error or empty batch
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDoneBackoff;

#[async_trait]
impl Backoff for AlwaysDoneBackoff {
    async fn on_err(&mut self, _err: &Error) -> bool {
        false
    }

    async fn on_empty(&mut self) -> bool {
        false
    }

    fn reset(&mut self) {}
}

/// Sleeps a fixed interval, then always retries
#[derive(Debug, Clone, Copy)]
pub struct AlwaysRetryBackoff {
    interval: Duration,
}

impl AlwaysRetryBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl Backoff for AlwaysRetryBackoff {
    async fn on_err(&mut self, _err: &Error) -> bool {
        tokio::time::sleep(self.interval).await;
        true
    }

    async fn on_empty(&mut self) -> bool {
        tokio::time::sleep(self.interval).await;
        true
    }

    fn reset(&mut self) {}
}

/// Doubles its delay on every consecutive miss, up to `max_delay`
///
/// Gives up once `max_attempts` consecutive errors or empty batches have
/// been seen. A successful batch starts over from `base`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    delay: Duration,
    attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self {
            base,
            max_delay,
            max_attempts: None,
            delay: base,
            attempts: 0,
        }
    }

    /// Stop after this many consecutive misses
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay the next miss will wait, without jitter
    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    async fn wait(&mut self) -> bool {
        if self.max_attempts.is_some_and(|max| self.attempts >= max) {
            return false;
        }
        self.attempts += 1;

        let jitter = Duration::from_millis(rand_jitter());
        let wait = self.delay.saturating_add(jitter);
        self.delay = self.delay.saturating_mul(2).min(self.max_delay);
        tokio::time::sleep(wait).await;
        true
    }
}

#[async_trait]
impl Backoff for ExponentialBackoff {
    async fn on_err(&mut self, _err: &Error) -> bool {
        self.wait().await
    }

    async fn on_empty(&mut self) -> bool {
        self.wait().await
    }

    fn reset(&mut self) {
        self.delay = self.base;
        self.attempts = 0;
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}
