//! Per-entity records produced by the data sources.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fiscal::{company_domain, normalize_company_name, normalize_fiscal_id};

/// Number of fiscal years kept in a [`FinancialHistory`].
pub const FINANCIAL_HISTORY_YEARS: usize = 5;

/// How a caller identifies a company before its registry record is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(default)]
    pub fiscal_id: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

impl EntityRef {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fiscal_id: None,
            domain: None,
        }
    }

    #[must_use]
    pub fn with_fiscal_id(mut self, fiscal_id: impl Into<String>) -> Self {
        self.fiscal_id = Some(fiscal_id.into());
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Normalised query used for cache keys: the digits of the fiscal id when
    /// one is known, otherwise the normalised company name.
    #[must_use]
    pub fn query_key(&self) -> String {
        match self.fiscal_id.as_deref().map(normalize_fiscal_id) {
            Some(id) if !id.is_empty() => id,
            _ => normalize_company_name(&self.name),
        }
    }

    /// Web domain used for SEO lookups; derived from the name when unknown.
    #[must_use]
    pub fn web_domain(&self) -> String {
        match self.domain.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.trim_end_matches('/').to_lowercase(),
            _ => company_domain(&self.name),
        }
    }
}

/// Registry identity record for a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub legal_name: String,
    pub fiscal_id: String,
    pub legal_form: String,
    /// Sector classification code (ATECO), e.g. `62.01`.
    pub sector_code: String,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub registered_address: Option<String>,
}

/// One fiscal year of financial figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub fiscal_year: i32,
    pub revenue: f64,
    pub net_worth: f64,
    pub headcount: u32,
    /// Year-over-year revenue growth in percent. `None` for the first year of
    /// a history or when the previous revenue is zero.
    #[serde(default)]
    pub growth_rate: Option<f64>,
}

/// Fiscal years for one entity, ordered oldest to newest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FinancialSnapshot>", into = "Vec<FinancialSnapshot>")]
pub struct FinancialHistory {
    snapshots: Vec<FinancialSnapshot>,
}

impl FinancialHistory {
    /// Orders snapshots by year, keeps the last entry for a repeated year,
    /// trims to the most recent [`FINANCIAL_HISTORY_YEARS`] and fills in any
    /// missing growth rate from the previous year's revenue.
    #[must_use]
    pub fn new(snapshots: Vec<FinancialSnapshot>) -> Self {
        let by_year: BTreeMap<i32, FinancialSnapshot> = snapshots
            .into_iter()
            .map(|s| (s.fiscal_year, s))
            .collect();
        let mut ordered: Vec<FinancialSnapshot> = by_year.into_values().collect();
        let excess = ordered.len().saturating_sub(FINANCIAL_HISTORY_YEARS);
        ordered.drain(..excess);

        let mut previous_revenue: Option<f64> = None;
        for snapshot in &mut ordered {
            if snapshot.growth_rate.is_none() {
                snapshot.growth_rate = previous_revenue
                    .filter(|prev| *prev > 0.0)
                    .map(|prev| round1((snapshot.revenue / prev - 1.0) * 100.0));
            }
            previous_revenue = Some(snapshot.revenue);
        }

        Self { snapshots: ordered }
    }

    #[must_use]
    pub fn snapshots(&self) -> &[FinancialSnapshot] {
        &self.snapshots
    }

    /// Most recent fiscal year, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&FinancialSnapshot> {
        self.snapshots.last()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl From<Vec<FinancialSnapshot>> for FinancialHistory {
    fn from(snapshots: Vec<FinancialSnapshot>) -> Self {
        Self::new(snapshots)
    }
}

impl From<FinancialHistory> for Vec<FinancialSnapshot> {
    fn from(history: FinancialHistory) -> Self {
        history.snapshots
    }
}

/// Search visibility metrics for one entity at one observation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoProfile {
    pub organic_keywords: u64,
    pub monthly_traffic: u64,
    pub backlinks: u64,
    /// Backlink quality score, 0–100.
    pub backlink_quality: f64,
    /// Domain authority score, 0–100.
    pub domain_authority: f64,
    /// Top ranking keywords, used for competitor similarity.
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMetrics {
    pub followers: u64,
    /// Engagement rate in percent.
    pub engagement_rate: f64,
    /// Follower growth rate in percent.
    pub growth_rate: f64,
}

/// Per-platform social metrics for one entity at one observation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub platforms: BTreeMap<String, SocialMetrics>,
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

impl SocialProfile {
    /// Sum of followers across all platforms.
    #[must_use]
    pub fn total_followers(&self) -> u64 {
        self.platforms.values().map(|m| m.followers).sum()
    }

    /// Unweighted mean engagement rate across platforms.
    #[must_use]
    pub fn mean_engagement_rate(&self) -> Option<f64> {
        mean(self.platforms.values().map(|m| m.engagement_rate))
    }

    /// Unweighted mean follower growth rate across platforms.
    #[must_use]
    pub fn mean_growth_rate(&self) -> Option<f64> {
        mean(self.platforms.values().map(|m| m.growth_rate))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / f64::from(count))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
