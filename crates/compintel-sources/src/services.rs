use std::future::Future;
use std::time::Duration;

use compintel_core::{
    AnalysisConfig, Candidate, Entity, FinancialHistory, SeoProfile, SocialProfile, SourceId,
    SourceSettings, SourceTable,
};

use crate::cache::{CacheKey, CacheLayer};
use crate::error::SourceError;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;

/// A parsed source response, as stored in the shared cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Registry(Entity),
    Financial(FinancialHistory),
    Seo(SeoProfile),
    Social(SocialProfile),
    Candidates(Vec<Candidate>),
}

/// Rate limiter, cache and retry policy shared by every collector in a run.
///
/// Internally synchronised; wrap in an `Arc` and hand a clone to each
/// collector. Reusing one instance across runs keeps the cache warm.
pub struct SourceServices {
    limiter: RateLimiter,
    cache: CacheLayer<Payload>,
    retry: RetryPolicy,
    acquire_wait: Duration,
    sources: SourceTable,
}

impl SourceServices {
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            limiter: RateLimiter::new(&config.sources),
            cache: CacheLayer::new(config.cache_capacity, config.cache_ttl()),
            retry: RetryPolicy::from_config(config),
            acquire_wait: config.rate_limit_wait(),
            sources: config.sources.clone(),
        }
    }

    #[must_use]
    pub fn settings(&self, source: SourceId) -> &SourceSettings {
        self.sources.get(source)
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    #[must_use]
    pub fn cache(&self) -> &CacheLayer<Payload> {
        &self.cache
    }

    /// Serve `(source, query)` from cache, or fetch it through the limiter
    /// and retry policy and cache the result.
    ///
    /// A cache hit consumes no rate-limit permit and makes no outbound call.
    /// On a miss every attempt, retries included, takes its own permit.
    ///
    /// # Errors
    ///
    /// - [`SourceError::RateLimitExceeded`] if a permit did not arrive in time.
    /// - [`SourceError::Unavailable`] once every attempt failed transiently.
    /// - Terminal errors from `call`, unchanged.
    pub async fn fetch<F, Fut>(
        &self,
        source: SourceId,
        query: &str,
        call: F,
    ) -> Result<Payload, SourceError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<Payload, SourceError>> + Send,
    {
        let limiter = &self.limiter;
        let retry = self.retry;
        let wait = self.acquire_wait;
        let call = &call;
        self.cache
            .get_or_fetch(CacheKey::new(source, query), async move {
                retry
                    .execute(source, move || async move {
                        limiter.acquire(source, wait).await?;
                        call().await
                    })
                    .await
            })
            .await
    }
}
