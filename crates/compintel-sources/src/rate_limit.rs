//! Per-source request ceilings shared by every collector in a run.
//!
//! Each source gets a token bucket (capacity = ceiling, refilled continuously
//! at `ceiling / 60` tokens per second) paired with a log of the grants made
//! in the last 60 seconds. A permit is granted only when both allow it, so the
//! number of grants in any rolling 60-second window never exceeds the ceiling.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use compintel_core::{SourceId, SourceTable};
use tokio::time::Instant;

use crate::error::SourceError;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Bucket {
    ceiling: usize,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
    grants: VecDeque<Instant>,
}

impl Bucket {
    fn new(requests_per_minute: u32, now: Instant) -> Self {
        let ceiling = f64::from(requests_per_minute);
        Self {
            ceiling: usize::try_from(requests_per_minute).unwrap_or(usize::MAX),
            tokens: ceiling,
            refill_per_sec: ceiling / 60.0,
            last_refill: now,
            grants: VecDeque::new(),
        }
    }

    /// Take a token now, or report how long until one could be taken.
    fn try_take(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let capacity = self.ceiling as f64;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(capacity);
        self.last_refill = now;

        while self
            .grants
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= WINDOW)
        {
            self.grants.pop_front();
        }

        let token_wait = if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_per_sec)
        };
        let window_wait = if self.grants.len() < self.ceiling {
            Duration::ZERO
        } else {
            self.grants
                .front()
                .map_or(Duration::ZERO, |oldest| {
                    (*oldest + WINDOW).saturating_duration_since(now)
                })
        };

        let wait = token_wait.max(window_wait);
        if wait.is_zero() {
            self.tokens -= 1.0;
            self.grants.push_back(now);
            Ok(())
        } else {
            Err(wait)
        }
    }
}

/// Token-bucket limiter keyed by source, safe under concurrent callers.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: HashMap<SourceId, Mutex<Bucket>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(sources: &SourceTable) -> Self {
        let now = Instant::now();
        let buckets = SourceId::ALL
            .into_iter()
            .map(|id| {
                let rpm = sources.get(id).requests_per_minute.max(1);
                (id, Mutex::new(Bucket::new(rpm, now)))
            })
            .collect();
        Self { buckets }
    }

    /// Take a permit without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::RateLimitExceeded`] if no permit is available now.
    pub fn try_acquire(&self, source: SourceId) -> Result<(), SourceError> {
        match self.poll(source, Instant::now()) {
            Ok(()) => Ok(()),
            Err(_) => Err(SourceError::RateLimitExceeded {
                source_id: source,
                waited_ms: 0,
            }),
        }
    }

    /// Wait up to `max_wait` for a permit.
    ///
    /// Fails early, without sleeping, when the next permit is already known to
    /// arrive after the deadline.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::RateLimitExceeded`] if no permit becomes
    /// available within `max_wait`.
    pub async fn acquire(&self, source: SourceId, max_wait: Duration) -> Result<(), SourceError> {
        let start = Instant::now();
        // An unrepresentable deadline means the budget never runs out.
        let deadline = start.checked_add(max_wait);
        loop {
            let now = Instant::now();
            match self.poll(source, now) {
                Ok(()) => return Ok(()),
                Err(wait) => {
                    if deadline.is_some_and(|d| now + wait > d) {
                        let waited = now.saturating_duration_since(start);
                        tracing::warn!(
                            source = %source,
                            waited_ms = duration_ms(waited),
                            "rate limit permit not available within wait budget"
                        );
                        return Err(SourceError::RateLimitExceeded {
                            source_id: source,
                            waited_ms: duration_ms(waited),
                        });
                    }
                    tracing::debug!(
                        source = %source,
                        wait_ms = duration_ms(wait),
                        "waiting for rate limit permit"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn poll(&self, source: SourceId, now: Instant) -> Result<(), Duration> {
        let Some(bucket) = self.buckets.get(&source) else {
            return Ok(());
        };
        bucket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_take(now)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
