use std::collections::BTreeMap;

use chrono::Utc;
use compintel_core::{
    AnalysisConfig, Entity, EntityRef, SeoProfile, Slice, SocialMetrics, SocialProfile,
};
use compintel_sources::StaticCandidates;

use super::*;

fn target() -> EntityProfile {
    let mut profile =
        EntityProfile::new(EntityRef::named("Acme S.r.l.").with_fiscal_id("00743110157"));
    profile.identity = Slice::Real(Entity {
        legal_name: "Acme S.r.l.".to_string(),
        fiscal_id: "00743110157".to_string(),
        legal_form: "SRL".to_string(),
        sector_code: "62.01".to_string(),
        registration_date: None,
        registered_address: None,
    });
    profile.seo = Slice::Real(SeoProfile {
        organic_keywords: 1200,
        monthly_traffic: 20_000,
        backlinks: 3000,
        backlink_quality: 50.0,
        domain_authority: 40.0,
        keywords: ["erp", "cloud", "crm", "saas"]
            .into_iter()
            .map(String::from)
            .collect(),
        observed_at: Utc::now(),
    });
    let mut platforms = BTreeMap::new();
    platforms.insert(
        "linkedin".to_string(),
        SocialMetrics {
            followers: 5000,
            engagement_rate: 2.0,
            growth_rate: 3.0,
        },
    );
    profile.social = Slice::Real(SocialProfile {
        platforms,
        observed_at: Utc::now(),
    });
    profile
}

fn candidate(name: &str) -> Candidate {
    Candidate {
        name: name.to_string(),
        fiscal_id: None,
        domain: None,
        sector_code: Some("62.01".to_string()),
        keywords: ["erp", "cloud"].into_iter().map(String::from).collect(),
        audience_size: Some(8000),
    }
}

fn names(set: &CompetitorSet) -> Vec<&str> {
    set.ranked()
        .iter()
        .map(|r| r.candidate.name.as_str())
        .collect()
}

#[test]
fn score_components_follow_weights() {
    let mut c = candidate("Beta");
    c.sector_code = Some("62.09".to_string());
    c.audience_size = Some(500_000);
    let score = similarity(&target(), &c, SimilarityWeights::default());
    assert!((score.sector - 0.5).abs() < 1e-9);
    // {erp, cloud} against {erp, cloud, crm, saas}
    assert!((score.keywords - 0.5).abs() < 1e-9);
    // 5000 is band 3, 500_000 band 5
    assert!((score.audience - 1.0 / 3.0).abs() < 1e-9);
    let expected = 0.5 * 0.5 + 0.3 * 0.5 + 0.2 / 3.0;
    assert!((score.total - expected).abs() < 1e-9);
}

#[test]
fn missing_signals_score_zero() {
    let mut c = candidate("Beta");
    c.sector_code = None;
    c.keywords.clear();
    c.audience_size = None;
    let score = similarity(
        &EntityProfile::new(EntityRef::named("Acme")),
        &c,
        SimilarityWeights::default(),
    );
    assert_eq!(score.total, 0.0);
}

#[test]
fn unrelated_sector_scores_zero() {
    assert_eq!(sector_match(Some("62.01"), Some("47.11")), 0.0);
    assert_eq!(sector_match(Some("62.01"), Some("62.01")), 1.0);
    assert_eq!(sector_match(Some(""), Some("62.01")), 0.0);
}

#[test]
fn audience_bands_are_orders_of_magnitude() {
    assert_eq!(audience_band(0), 0);
    assert_eq!(audience_band(9), 0);
    assert_eq!(audience_band(10), 1);
    assert_eq!(audience_band(99_999), 4);
    assert_eq!(band_proximity(100, 900), 1.0);
    assert_eq!(band_proximity(10, 1_000_000), 0.0);
}

#[test]
fn ties_break_on_audience_then_name() {
    let mut small = candidate("Alpha");
    small.audience_size = Some(2000);
    let mut large = candidate("Zeta");
    large.audience_size = Some(9000);
    let also_large = candidate("Delta");
    let mut unknown = candidate("Beta");
    unknown.audience_size = None;
    // Sector alone carries weight, so every candidate ties on similarity.
    let set = rank_candidates(
        &target(),
        vec![small, unknown, large, also_large],
        10,
        SimilarityWeights {
            sector: 1.0,
            keywords: 0.0,
            audience: 0.0,
        },
    );
    assert_eq!(names(&set), vec!["Zeta", "Delta", "Alpha", "Beta"]);
}

#[test]
fn never_returns_target_or_duplicates() {
    let mut by_fiscal = candidate("Acme Holding");
    by_fiscal.fiscal_id = Some("IT00743110157".to_string());
    let by_name = candidate("ACME srl");
    let mut beta = candidate("Beta");
    beta.fiscal_id = Some("12345678903".to_string());
    let mut beta_again = candidate("Beta Software S.p.A.");
    beta_again.fiscal_id = Some("123 456 789 03".to_string());
    let gamma = candidate("Gamma");
    let gamma_again = candidate("GAMMA S.R.L.");

    let set = rank_candidates(
        &target(),
        vec![by_fiscal, by_name, beta, beta_again, gamma, gamma_again],
        5,
        SimilarityWeights::default(),
    );
    assert_eq!(set.len(), 2);
    for ranked in set.ranked() {
        assert!(!ranked.candidate.name.to_lowercase().contains("acme"));
    }
    let keys: HashSet<String> = set
        .ranked()
        .iter()
        .map(|r| r.candidate.identity_key())
        .collect();
    assert_eq!(keys.len(), 2);
}

#[test]
fn truncates_to_k_and_keeps_small_pools() {
    let pool: Vec<Candidate> = ["Beta", "Gamma", "Delta", "Epsilon"]
        .into_iter()
        .map(candidate)
        .collect();
    let weights = SimilarityWeights::default();
    assert_eq!(rank_candidates(&target(), pool.clone(), 2, weights).len(), 2);
    assert_eq!(rank_candidates(&target(), pool, 10, weights).len(), 4);
}

fn discoverer(config: &AnalysisConfig, pool: Vec<Candidate>) -> CompetitorDiscoverer {
    CompetitorDiscoverer::new(
        Arc::new(StaticCandidates::new(pool)),
        Arc::new(SourceServices::from_config(config)),
        config.similarity_weights,
    )
}

#[tokio::test]
async fn discover_ranks_the_search_pool() {
    let mut unrelated = candidate("Retail Co");
    unrelated.sector_code = Some("47.11".to_string());
    unrelated.keywords.clear();
    let d = discoverer(
        &AnalysisConfig::default(),
        vec![unrelated, candidate("Beta")],
    );
    let set = d.discover(&target(), 3).await.unwrap();
    // The static pool narrows to the target's division first.
    assert_eq!(names(&set), vec!["Beta"]);
}

#[tokio::test]
async fn disabled_search_yields_no_competitors() {
    let mut config = AnalysisConfig::default();
    config.sources.search.enabled = false;
    let d = discoverer(&config, vec![candidate("Beta")]);
    assert!(d.discover(&target(), 3).await.unwrap().is_empty());
}
