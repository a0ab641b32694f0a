//! Percentile benchmarking of the target against its competitors.
//!
//! Every metric is ranked within the full set `{target} ∪ competitors` and
//! classified against the configured strength and weakness thresholds.
//! Metrics the target lacks are reported as excluded, never zero-filled.

use compintel_core::{AnalysisConfig, EntityProfile, Provenance, Slice};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Financial,
    Seo,
    Social,
}

/// A numeric metric extracted from an [`EntityProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Revenue,
    NetWorth,
    Headcount,
    RevenueGrowth,
    OrganicKeywords,
    MonthlyTraffic,
    Backlinks,
    BacklinkQuality,
    DomainAuthority,
    TotalFollowers,
    EngagementRate,
    AudienceGrowth,
}

impl MetricId {
    pub const ALL: [MetricId; 12] = [
        MetricId::Revenue,
        MetricId::NetWorth,
        MetricId::Headcount,
        MetricId::RevenueGrowth,
        MetricId::OrganicKeywords,
        MetricId::MonthlyTraffic,
        MetricId::Backlinks,
        MetricId::BacklinkQuality,
        MetricId::DomainAuthority,
        MetricId::TotalFollowers,
        MetricId::EngagementRate,
        MetricId::AudienceGrowth,
    ];

    #[must_use]
    pub fn category(self) -> MetricCategory {
        match self {
            MetricId::Revenue
            | MetricId::NetWorth
            | MetricId::Headcount
            | MetricId::RevenueGrowth => MetricCategory::Financial,
            MetricId::OrganicKeywords
            | MetricId::MonthlyTraffic
            | MetricId::Backlinks
            | MetricId::BacklinkQuality
            | MetricId::DomainAuthority => MetricCategory::Seo,
            MetricId::TotalFollowers | MetricId::EngagementRate | MetricId::AudienceGrowth => {
                MetricCategory::Social
            }
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MetricId::Revenue => "revenue",
            MetricId::NetWorth => "net_worth",
            MetricId::Headcount => "headcount",
            MetricId::RevenueGrowth => "revenue_growth",
            MetricId::OrganicKeywords => "organic_keywords",
            MetricId::MonthlyTraffic => "monthly_traffic",
            MetricId::Backlinks => "backlinks",
            MetricId::BacklinkQuality => "backlink_quality",
            MetricId::DomainAuthority => "domain_authority",
            MetricId::TotalFollowers => "total_followers",
            MetricId::EngagementRate => "engagement_rate",
            MetricId::AudienceGrowth => "audience_growth",
        }
    }

    /// The metric's value in `profile` with the provenance of its slice.
    ///
    /// `None` when the slice is absent, the value is undefined (no growth
    /// rate for a single fiscal year), or not finite.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extract(self, profile: &EntityProfile) -> Option<(f64, Provenance)> {
        let value = match self.category() {
            MetricCategory::Financial => from_slice(&profile.financial, |history| {
                let latest = history.latest()?;
                match self {
                    MetricId::Revenue => Some(latest.revenue),
                    MetricId::NetWorth => Some(latest.net_worth),
                    MetricId::Headcount => Some(f64::from(latest.headcount)),
                    _ => latest.growth_rate,
                }
            }),
            MetricCategory::Seo => from_slice(&profile.seo, |seo| {
                Some(match self {
                    MetricId::OrganicKeywords => seo.organic_keywords as f64,
                    MetricId::MonthlyTraffic => seo.monthly_traffic as f64,
                    MetricId::Backlinks => seo.backlinks as f64,
                    MetricId::BacklinkQuality => seo.backlink_quality,
                    _ => seo.domain_authority,
                })
            }),
            MetricCategory::Social => from_slice(&profile.social, |social| match self {
                MetricId::TotalFollowers => Some(social.total_followers() as f64),
                MetricId::EngagementRate => social.mean_engagement_rate(),
                _ => social.mean_growth_rate(),
            }),
        }?;
        value.0.is_finite().then_some(value)
    }
}

impl std::fmt::Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn from_slice<T>(
    slice: &Slice<T>,
    read: impl FnOnce(&T) -> Option<f64>,
) -> Option<(f64, Provenance)> {
    let provenance = slice.provenance()?;
    read(slice.value()?).map(|v| (v, provenance))
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Strength,
    Neutral,
    Weakness,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub metric: MetricId,
    pub category: MetricCategory,
    pub target_value: f64,
    /// Provenance of the target's value.
    pub provenance: Provenance,
    /// Percentile rank of the target within target plus competitors, 0-100.
    pub percentile: f64,
    pub classification: Classification,
    pub competitor_mean: f64,
    /// Competitors that had a value for this metric.
    pub competitor_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The target has no value for the metric.
    TargetAbsent,
    /// Fewer than two profiles carry the metric.
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub metric: MetricId,
    pub reason: ExclusionReason,
}

/// Benchmarked metrics in [`MetricId::ALL`] order, plus the ones left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkSet {
    results: Vec<BenchmarkResult>,
    excluded: Vec<Exclusion>,
}

impl BenchmarkSet {
    #[must_use]
    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    #[must_use]
    pub fn excluded(&self) -> &[Exclusion] {
        &self.excluded
    }

    #[must_use]
    pub fn get(&self, metric: MetricId) -> Option<&BenchmarkResult> {
        self.results.iter().find(|r| r.metric == metric)
    }

    pub fn strengths(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.with_class(Classification::Strength)
    }

    pub fn weaknesses(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.with_class(Classification::Weakness)
    }

    fn with_class(&self, class: Classification) -> impl Iterator<Item = &BenchmarkResult> {
        self.results
            .iter()
            .filter(move |r| r.classification == class)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkEngine {
    strength_percentile: f64,
    weakness_percentile: f64,
}

impl Default for BenchmarkEngine {
    fn default() -> Self {
        Self::new(70.0, 30.0)
    }
}

impl BenchmarkEngine {
    #[must_use]
    pub fn new(strength_percentile: f64, weakness_percentile: f64) -> Self {
        Self {
            strength_percentile,
            weakness_percentile,
        }
    }

    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.strength_percentile, config.weakness_percentile)
    }

    #[must_use]
    pub fn classify(&self, percentile: f64) -> Classification {
        if percentile >= self.strength_percentile {
            Classification::Strength
        } else if percentile <= self.weakness_percentile {
            Classification::Weakness
        } else {
            Classification::Neutral
        }
    }

    /// Rank the target on every metric. Pure and deterministic.
    #[must_use]
    pub fn benchmark(&self, target: &EntityProfile, competitors: &[EntityProfile]) -> BenchmarkSet {
        let mut set = BenchmarkSet::default();
        for metric in MetricId::ALL {
            let Some((target_value, provenance)) = metric.extract(target) else {
                set.excluded.push(Exclusion {
                    metric,
                    reason: ExclusionReason::TargetAbsent,
                });
                continue;
            };
            let others: Vec<f64> = competitors
                .iter()
                .filter_map(|p| metric.extract(p).map(|(v, _)| v))
                .collect();
            if others.is_empty() {
                set.excluded.push(Exclusion {
                    metric,
                    reason: ExclusionReason::InsufficientData,
                });
                continue;
            }

            let percentile = percentile_rank(target_value, &others);
            #[allow(clippy::cast_precision_loss)]
            let competitor_mean = others.iter().sum::<f64>() / others.len() as f64;
            set.results.push(BenchmarkResult {
                metric,
                category: metric.category(),
                target_value,
                provenance,
                percentile,
                classification: self.classify(percentile),
                competitor_mean,
                competitor_count: others.len(),
            });
        }
        set
    }
}

/// Mid-rank percentile of `target` within `others` plus the target itself:
/// values strictly below count fully, equal values (the target included)
/// count half.
#[must_use]
pub fn percentile_rank(target: f64, others: &[f64]) -> f64 {
    let below = others.iter().filter(|v| **v < target).count();
    let equal = others.iter().filter(|v| **v == target).count() + 1;
    #[allow(clippy::cast_precision_loss)]
    let rank = (below as f64 + 0.5 * equal as f64) / (others.len() + 1) as f64;
    rank * 100.0
}
