//! Deterministic synthetic data used when a source is disabled or unavailable.
//!
//! Every generator draws from a [`StdRng`] seeded by the source and the
//! entity's query key, so the same entity always receives the same values.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Utc};
use compintel_core::fiscal::with_control_digit;
use compintel_core::{
    Entity, EntityRef, FinancialHistory, FinancialSnapshot, SeoProfile, SocialMetrics,
    SocialProfile, SourceId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Revenue multipliers for the five fiscal years, oldest first.
const REVENUE_RAMP: [f64; 5] = [0.5, 0.6, 0.7, 0.85, 1.0];
const RAMP_SPAN_YEARS: i32 = 4;

const PLATFORMS: [&str; 5] = ["instagram", "facebook", "linkedin", "tiktok", "youtube"];

const STREETS: [&str; 5] = [
    "Via Roma",
    "Via Milano",
    "Corso Italia",
    "Piazza Duomo",
    "Via Nazionale",
];
const CITIES: [&str; 5] = ["Milano", "Roma", "Napoli", "Torino", "Firenze"];

const KEYWORD_POOL: [&str; 12] = [
    "consulenza",
    "software gestionale",
    "servizi aziendali",
    "marketing digitale",
    "ecommerce",
    "sviluppo web",
    "assistenza clienti",
    "logistica",
    "formazione",
    "cloud",
    "sicurezza informatica",
    "automazione",
];

/// RNG seeded from the first eight bytes of `SHA-256("<source>:<key>")`.
#[must_use]
pub fn seeded_rng(source: SourceId, key: &str) -> StdRng {
    let digest = Sha256::digest(format!("{source}:{key}").as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    StdRng::seed_from_u64(u64::from_be_bytes(seed))
}

/// Most recent fiscal year with closed accounts.
#[must_use]
pub fn last_closed_fiscal_year() -> i32 {
    Utc::now().year() - 1
}

#[must_use]
pub fn synthesize_entity(reference: &EntityRef, rng: &mut StdRng) -> Entity {
    let fiscal_id = reference
        .fiscal_id
        .clone()
        .filter(|id| compintel_core::validate_fiscal_id(id))
        .unwrap_or_else(|| synthetic_fiscal_id(rng));
    let registration_date = NaiveDate::from_ymd_opt(
        rng.random_range(1990..=2020),
        rng.random_range(1..=12),
        rng.random_range(1..=28),
    );
    let address = format!(
        "{} {}, {}",
        STREETS[rng.random_range(0..STREETS.len())],
        rng.random_range(1..=200),
        CITIES[rng.random_range(0..CITIES.len())]
    );
    Entity {
        legal_name: reference.name.trim().to_string(),
        fiscal_id,
        legal_form: "SRL".to_string(),
        sector_code: "62.01".to_string(),
        registration_date,
        registered_address: Some(address),
    }
}

fn synthetic_fiscal_id(rng: &mut StdRng) -> String {
    let prefix = format!("{:010}", rng.random_range(1_000_000_000u64..10_000_000_000));
    // A ten-digit prefix always yields an id.
    with_control_digit(&prefix).unwrap_or(prefix)
}

#[must_use]
pub fn synthesize_financial(latest_year: i32, rng: &mut StdRng) -> FinancialHistory {
    let base_revenue = f64::from(rng.random_range(500_000u32..=10_000_000));
    let headcount = rng.random_range(5..=50);
    let first_year = latest_year - RAMP_SPAN_YEARS;
    let snapshots = REVENUE_RAMP
        .iter()
        .zip(first_year..)
        .map(|(ramp, fiscal_year)| {
            let revenue = (base_revenue * ramp).round();
            FinancialSnapshot {
                fiscal_year,
                revenue,
                net_worth: (revenue * 0.15).round(),
                headcount,
                growth_rate: None,
            }
        })
        .collect();
    FinancialHistory::new(snapshots)
}

#[must_use]
pub fn synthesize_seo(rng: &mut StdRng) -> SeoProfile {
    let keyword_count = rng.random_range(3..=6);
    let mut keywords = BTreeSet::new();
    while keywords.len() < keyword_count {
        keywords.insert(KEYWORD_POOL[rng.random_range(0..KEYWORD_POOL.len())].to_string());
    }
    SeoProfile {
        organic_keywords: rng.random_range(200..=5_000),
        monthly_traffic: rng.random_range(1_000..=100_000),
        backlinks: rng.random_range(100..=20_000),
        backlink_quality: round1(rng.random_range(10.0..=90.0)),
        domain_authority: round1(rng.random_range(10.0..=70.0)),
        keywords,
        observed_at: Utc::now(),
    }
}

#[must_use]
pub fn synthesize_social(rng: &mut StdRng) -> SocialProfile {
    let platforms: BTreeMap<String, SocialMetrics> = PLATFORMS
        .iter()
        .map(|platform| {
            (
                (*platform).to_string(),
                SocialMetrics {
                    followers: rng.random_range(500..=100_000),
                    engagement_rate: round2(rng.random_range(0.5..=6.0)),
                    growth_rate: round2(rng.random_range(-2.0..=15.0)),
                },
            )
        })
        .collect();
    SocialProfile {
        platforms,
        observed_at: Utc::now(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
