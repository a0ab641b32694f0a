use std::time::Duration;

use crate::profile::SourceId;
use crate::ConfigError;

/// Per-source knobs: request ceiling, fallback switch, endpoint and key.
#[derive(Clone, PartialEq)]
pub struct SourceSettings {
    /// Request ceiling per rolling 60-second window.
    pub requests_per_minute: u32,
    pub enabled: bool,
    pub fallback_enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl SourceSettings {
    #[must_use]
    pub fn with_rpm(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            enabled: true,
            fallback_enabled: true,
            base_url: None,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSettings")
            .field("requests_per_minute", &self.requests_per_minute)
            .field("enabled", &self.enabled)
            .field("fallback_enabled", &self.fallback_enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub registry: SourceSettings,
    pub financial: SourceSettings,
    pub seo: SourceSettings,
    pub social: SourceSettings,
    pub search: SourceSettings,
}

impl SourceTable {
    #[must_use]
    pub fn get(&self, source: SourceId) -> &SourceSettings {
        match source {
            SourceId::Registry => &self.registry,
            SourceId::Financial => &self.financial,
            SourceId::Seo => &self.seo,
            SourceId::Social => &self.social,
            SourceId::Search => &self.search,
        }
    }

    pub fn get_mut(&mut self, source: SourceId) -> &mut SourceSettings {
        match source {
            SourceId::Registry => &mut self.registry,
            SourceId::Financial => &mut self.financial,
            SourceId::Seo => &mut self.seo,
            SourceId::Social => &mut self.social,
            SourceId::Search => &mut self.search,
        }
    }
}

impl Default for SourceTable {
    fn default() -> Self {
        Self {
            registry: SourceSettings::with_rpm(30),
            financial: SourceSettings::with_rpm(30),
            seo: SourceSettings::with_rpm(10),
            social: SourceSettings::with_rpm(20),
            search: SourceSettings::with_rpm(20),
        }
    }
}

/// Weights of the three competitor-similarity components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub sector: f64,
    pub keywords: f64,
    pub audience: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            sector: 0.5,
            keywords: 0.3,
            audience: 0.2,
        }
    }
}

impl SimilarityWeights {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sector + self.keywords + self.audience
    }
}

/// Everything one analysis run needs to know up front.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub sources: SourceTable,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    /// Total attempts per source call, including the first.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub request_timeout_secs: u64,
    pub entity_timeout_secs: u64,
    pub run_timeout_secs: u64,
    pub worker_pool_size: usize,
    /// Longest a caller waits for a rate-limit permit.
    pub rate_limit_wait_secs: u64,
    pub similarity_weights: SimilarityWeights,
    pub strength_percentile: f64,
    pub weakness_percentile: f64,
    pub log_level: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let request_timeout_secs = 30;
        let max_retries = 3;
        Self {
            sources: SourceTable::default(),
            cache_ttl_secs: 3600,
            cache_capacity: 1000,
            max_retries,
            backoff_base_ms: 1000,
            backoff_cap_ms: 60_000,
            request_timeout_secs,
            entity_timeout_secs: default_entity_timeout_secs(request_timeout_secs, max_retries),
            run_timeout_secs: 300,
            worker_pool_size: 8,
            rate_limit_wait_secs: 60,
            similarity_weights: SimilarityWeights::default(),
            strength_percentile: 70.0,
            weakness_percentile: 30.0,
            log_level: "info".to_string(),
        }
    }
}

/// Upper bound for every timeout and wait budget: one day.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Upper bound for cached responses: thirty days.
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 86_400;

/// One request timeout per attempt plus one more for back-off sleeps.
#[must_use]
pub fn default_entity_timeout_secs(request_timeout_secs: u64, max_retries: u32) -> u64 {
    request_timeout_secs.saturating_mul(u64::from(max_retries) + 1)
}

impl AnalysisConfig {
    /// Rejects combinations that would make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for source in SourceId::ALL {
            if self.sources.get(source).requests_per_minute == 0 {
                return Err(invalid(format!(
                    "{source} requests_per_minute must be greater than zero"
                )));
            }
        }
        if self.cache_capacity == 0 {
            return Err(invalid("cache_capacity must be greater than zero"));
        }
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs must be greater than zero"));
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries must be at least 1"));
        }
        if self.backoff_cap_ms < self.backoff_base_ms {
            return Err(invalid(format!(
                "backoff_cap_ms ({}) must not be below backoff_base_ms ({})",
                self.backoff_cap_ms, self.backoff_base_ms
            )));
        }
        for (name, value) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("entity_timeout_secs", self.entity_timeout_secs),
            ("run_timeout_secs", self.run_timeout_secs),
            ("rate_limit_wait_secs", self.rate_limit_wait_secs),
        ] {
            if value == 0 {
                return Err(invalid(format!("{name} must be greater than zero")));
            }
            if value > MAX_TIMEOUT_SECS {
                return Err(invalid(format!(
                    "{name} ({value}) must not exceed {MAX_TIMEOUT_SECS}"
                )));
            }
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(invalid(format!(
                "cache_ttl_secs ({}) must not exceed {MAX_CACHE_TTL_SECS}",
                self.cache_ttl_secs
            )));
        }
        if self.worker_pool_size == 0 {
            return Err(invalid("worker_pool_size must be greater than zero"));
        }

        let w = self.similarity_weights;
        if [w.sector, w.keywords, w.audience]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(invalid("similarity weights must be non-negative numbers"));
        }
        if (w.sum() - 1.0).abs() > 1e-6 {
            return Err(invalid(format!(
                "similarity weights must sum to 1, got {}",
                w.sum()
            )));
        }

        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.strength_percentile) || !in_range(self.weakness_percentile) {
            return Err(invalid("percentile thresholds must lie in 0..=100"));
        }
        if self.weakness_percentile >= self.strength_percentile {
            return Err(invalid(format!(
                "weakness percentile ({}) must be below strength percentile ({})",
                self.weakness_percentile, self.strength_percentile
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn entity_timeout(&self) -> Duration {
        Duration::from_secs(self.entity_timeout_secs)
    }

    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    #[must_use]
    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_wait_secs)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation(reason.into())
}
