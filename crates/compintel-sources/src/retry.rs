//! Retry with exponential back-off and jitter around single outbound calls.
//!
//! [`RetryPolicy::execute`] retries [`SourceError::Transient`] failures and
//! returns every other error immediately. Running out of attempts yields
//! [`SourceError::Unavailable`], which collectors resolve to fallback data or
//! explicit absence.

use std::future::Future;
use std::time::Duration;

use compintel_core::{AnalysisConfig, SourceId};

use crate::error::SourceError;

/// Back-off schedule for one source call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_cap_ms),
        }
    }

    /// Sleep before the attempt after `attempt` (1-based).
    ///
    /// `base × 2^(attempt−1)` scaled by a jitter factor in `0.75..1.25`
    /// (`jitter` is a unit sample in `0..1`), then capped at `max_delay`.
    /// Because the doubling outpaces the jitter band, delays strictly increase
    /// from one attempt to the next until the cap is reached.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, jitter: f64) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let computed = base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(20));
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jittered = (computed as f64 * (jitter.clamp(0.0, 1.0) * 0.5 + 0.75)) as u64;
        Duration::from_millis(jittered).min(self.max_delay)
    }

    /// Runs `operation` up to `max_attempts` times while it fails transiently.
    ///
    /// # Errors
    ///
    /// Returns non-transient errors unchanged, or
    /// [`SourceError::Unavailable`] once every attempt has failed.
    pub async fn execute<T, F, Fut>(&self, source: SourceId, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    tracing::warn!(
                        source = %source,
                        attempts = attempt,
                        error = %err,
                        "source unavailable after exhausting retries"
                    );
                    return Err(SourceError::Unavailable {
                        source_id: source,
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt, rand::random::<f64>());
                    tracing::warn!(
                        source = %source,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient source error, retrying after back-off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
