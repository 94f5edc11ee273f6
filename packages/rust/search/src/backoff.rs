//! Fixed-delay retry for rate-limited search calls.
//!
//! The wait between attempts goes through [`Sleeper`] so tests can run the
//! retry loop without touching the wall clock.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use newsdesk_shared::{SearchError, SearchHit, SourceConfig};

use crate::provider::SearchProvider;

/// Suspends the current task between retry attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Real wall-clock sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(delay);
        }
    }
}

/// Attempt ceiling and constant delay; no exponential growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl From<&SourceConfig> for RetryPolicy {
    fn from(config: &SourceConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts,
            delay: config.retry_delay,
        }
    }
}

/// Run one search, retrying only [`SearchError::RateLimited`].
///
/// Provider errors return immediately. When every attempt is throttled the
/// last `RateLimited` error is returned.
pub async fn search_with_retry(
    provider: &dyn SearchProvider,
    sleeper: &dyn Sleeper,
    policy: RetryPolicy,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchHit>, SearchError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match provider.search(query, max_results).await {
            Ok(hits) => return Ok(hits),
            Err(e) if e.is_rate_limited() && attempt < attempts => {
                warn!(
                    query,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    "rate limited, retrying"
                );
                sleeper.sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
