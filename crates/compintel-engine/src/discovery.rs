//! Competitor discovery: pull a candidate pool for the target's sector and
//! name, score each candidate's similarity to the target, and keep the top `k`.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use compintel_core::fiscal::normalize_fiscal_id;
use compintel_core::{normalize_company_name, Candidate, EntityProfile, SimilarityWeights, SourceId};
use compintel_sources::{CandidateSearch, Payload, SourceError, SourceServices};
use serde::Serialize;

/// Similarity of one candidate to the target, with its weighted components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityScore {
    pub sector: f64,
    pub keywords: f64,
    pub audience: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub similarity: SimilarityScore,
}

/// Competitors ranked by similarity, most similar first.
///
/// Never contains the target and never contains two candidates with the same
/// fiscal id (or, without one, the same normalised name).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompetitorSet {
    ranked: Vec<RankedCandidate>,
}

impl CompetitorSet {
    #[must_use]
    pub fn ranked(&self) -> &[RankedCandidate] {
        &self.ranked
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    #[must_use]
    pub fn into_ranked(self) -> Vec<RankedCandidate> {
        self.ranked
    }
}

pub struct CompetitorDiscoverer {
    search: Arc<dyn CandidateSearch>,
    services: Arc<SourceServices>,
    weights: SimilarityWeights,
}

impl CompetitorDiscoverer {
    #[must_use]
    pub fn new(
        search: Arc<dyn CandidateSearch>,
        services: Arc<SourceServices>,
        weights: SimilarityWeights,
    ) -> Self {
        Self {
            search,
            services,
            weights,
        }
    }

    /// Up to `k` competitors for `target`, drawn only from the search pool.
    ///
    /// The search goes through the shared cache, rate limiter and retry
    /// policy like every other source. A disabled search source yields an
    /// empty set.
    ///
    /// # Errors
    ///
    /// Returns the [`SourceError`] of a failed candidate search.
    pub async fn discover(
        &self,
        target: &EntityProfile,
        k: usize,
    ) -> Result<CompetitorSet, SourceError> {
        if k == 0 || !self.services.settings(SourceId::Search).enabled {
            return Ok(CompetitorSet::default());
        }

        let sector = target.identity.value().map(|e| e.sector_code.clone());
        let name = target.display_name().to_string();
        let query = format!(
            "{}|{}",
            sector.as_deref().unwrap_or(""),
            normalize_company_name(&name)
        );

        let search = &self.search;
        let sector_ref = sector.as_deref();
        let name_ref = name.as_str();
        let payload = self
            .services
            .fetch(SourceId::Search, &query, move || async move {
                search
                    .search(sector_ref, name_ref)
                    .await
                    .map(Payload::Candidates)
            })
            .await?;
        let Payload::Candidates(pool) = payload else {
            return Err(SourceError::Terminal {
                source_id: SourceId::Search,
                reason: format!("cached payload for '{query}' has the wrong kind"),
            });
        };

        let set = rank_candidates(target, pool, k, self.weights);
        tracing::debug!(
            entity = %name,
            competitors = set.len(),
            "competitor discovery complete"
        );
        Ok(set)
    }
}

/// Score, order, filter and truncate a candidate pool.
#[must_use]
pub fn rank_candidates(
    target: &EntityProfile,
    pool: Vec<Candidate>,
    k: usize,
    weights: SimilarityWeights,
) -> CompetitorSet {
    let target_fiscal = target.fiscal_id().map(normalize_fiscal_id);
    let target_names: HashSet<String> = [target.display_name(), target.reference.name.as_str()]
        .into_iter()
        .map(normalize_company_name)
        .collect();

    let mut ranked: Vec<RankedCandidate> = pool
        .into_iter()
        .filter(|c| !is_target(c, target_fiscal.as_deref(), &target_names))
        .map(|candidate| {
            let similarity = similarity(target, &candidate, weights);
            RankedCandidate {
                candidate,
                similarity,
            }
        })
        .collect();

    ranked.sort_by(compare_ranked);

    let mut seen = HashSet::new();
    ranked.retain(|r| seen.insert(r.candidate.identity_key()));
    ranked.truncate(k);
    CompetitorSet { ranked }
}

fn is_target(
    candidate: &Candidate,
    target_fiscal: Option<&str>,
    target_names: &HashSet<String>,
) -> bool {
    if let (Some(target_id), Some(candidate_id)) =
        (target_fiscal, candidate.fiscal_id.as_deref())
    {
        if !target_id.is_empty() && normalize_fiscal_id(candidate_id) == target_id {
            return true;
        }
    }
    target_names.contains(&normalize_company_name(&candidate.name))
}

/// Higher similarity first, then larger audience (unknown last), then name.
fn compare_ranked(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.similarity
        .total
        .total_cmp(&a.similarity.total)
        .then_with(|| match (a.candidate.audience_size, b.candidate.audience_size) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.candidate.name.cmp(&b.candidate.name))
}

#[must_use]
pub fn similarity(
    target: &EntityProfile,
    candidate: &Candidate,
    weights: SimilarityWeights,
) -> SimilarityScore {
    let sector = sector_match(
        target.identity.value().map(|e| e.sector_code.as_str()),
        candidate.sector_code.as_deref(),
    );
    let keywords = target
        .seo
        .value()
        .map_or(0.0, |seo| jaccard(&seo.keywords, &candidate.keywords));
    let audience = match (target.social.value(), candidate.audience_size) {
        (Some(social), Some(size)) => band_proximity(social.total_followers(), size),
        _ => 0.0,
    };
    SimilarityScore {
        sector,
        keywords,
        audience,
        total: weights.sector * sector + weights.keywords * keywords + weights.audience * audience,
    }
}

/// 1 for the same code, 0.5 for the same two-digit division, else 0.
fn sector_match(target: Option<&str>, candidate: Option<&str>) -> f64 {
    let (Some(target), Some(candidate)) = (target.map(str::trim), candidate.map(str::trim)) else {
        return 0.0;
    };
    if target.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if target == candidate {
        return 1.0;
    }
    let division = |code: &str| code.split('.').next().unwrap_or("").to_string();
    if division(target) == division(candidate) {
        0.5
    } else {
        0.0
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let normalise = |set: &BTreeSet<String>| -> BTreeSet<String> {
        set.iter().map(|k| k.trim().to_lowercase()).collect()
    };
    let (a, b) = (normalise(a), normalise(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = a.intersection(&b).count() as f64 / union as f64;
    ratio
}

/// Order-of-magnitude band of an audience size.
fn audience_band(size: u64) -> i32 {
    let mut band = 0;
    let mut rest = size.max(1);
    while rest >= 10 {
        rest /= 10;
        band += 1;
    }
    band
}

/// 1 in the same band, falling linearly to 0 three bands apart.
fn band_proximity(a: u64, b: u64) -> f64 {
    let distance = f64::from((audience_band(a) - audience_band(b)).abs());
    (1.0 - distance / 3.0).max(0.0)
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
