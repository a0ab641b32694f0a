//! In-memory data sources for orchestrator tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use compintel_core::fiscal::with_control_digit;
use compintel_core::{company_domain, AnalysisConfig, Candidate, SourceId};
use compintel_sources::{DataSource, SourceError, SourceRequest};
use serde_json::{json, Value};

/// What the fake answers for one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Transient,
    Terminal,
    /// Sleep, then fail. Long enough to hit any deadline a test sets.
    Stall(Duration),
}

/// Metrics for one fake company.
#[derive(Debug, Clone)]
pub struct Company {
    pub name: &'static str,
    pub fiscal_id: String,
    pub revenue: f64,
    pub organic_keywords: u64,
    pub followers: u64,
    pub keywords: &'static [&'static str],
}

impl Company {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fiscal_id: fiscal_id_for(name),
            revenue: 1_000_000.0,
            organic_keywords: 1000,
            followers: 5000,
            keywords: &["erp", "cloud", "crm"],
        }
    }

    /// Registry answers with this fiscal id instead of the name-derived one.
    pub fn fiscal_id(mut self, fiscal_id: &str) -> Self {
        self.fiscal_id = fiscal_id.to_string();
        self
    }

    pub fn revenue(mut self, revenue: f64) -> Self {
        self.revenue = revenue;
        self
    }

    pub fn organic_keywords(mut self, organic_keywords: u64) -> Self {
        self.organic_keywords = organic_keywords;
        self
    }

    pub fn followers(mut self, followers: u64) -> Self {
        self.followers = followers;
        self
    }

    /// Search-pool entry for this company.
    pub fn candidate(&self) -> Candidate {
        Candidate {
            name: self.name.to_string(),
            fiscal_id: None,
            domain: None,
            sector_code: Some("62.01".to_string()),
            keywords: self.keywords.iter().map(|k| (*k).to_string()).collect(),
            audience_size: Some(self.followers),
        }
    }
}

/// Valid fiscal id derived from the name, distinct for distinct names.
fn fiscal_id_for(name: &str) -> String {
    let seed = name.bytes().fold(17_u64, |acc, b| {
        acc.wrapping_mul(131).wrapping_add(u64::from(b))
    });
    with_control_digit(&format!("{:010}", seed % 10_000_000_000)).unwrap()
}

#[derive(Default)]
struct InFlight {
    current: usize,
    peak: usize,
}

/// Answers from a fixed table keyed by source and the request's lookup
/// value; records every call.
#[derive(Default)]
pub struct FakeSource {
    replies: HashMap<(SourceId, String), Reply>,
    overrides: HashMap<SourceId, Reply>,
    latency: HashMap<SourceId, Duration>,
    calls: Mutex<Vec<(SourceId, String)>>,
    in_flight: Mutex<HashMap<SourceId, InFlight>>,
}

/// Counts one call as in flight until dropped, so calls abandoned at a
/// deadline are released too.
struct InFlightGuard<'a> {
    source: SourceId,
    table: &'a Mutex<HashMap<SourceId, InFlight>>,
}

impl<'a> InFlightGuard<'a> {
    fn enter(source: SourceId, table: &'a Mutex<HashMap<SourceId, InFlight>>) -> Self {
        let mut table_guard = table.lock().unwrap();
        let entry = table_guard.entry(source).or_default();
        entry.current += 1;
        entry.peak = entry.peak.max(entry.current);
        drop(table_guard);
        Self { source, table }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.table.lock().unwrap().get_mut(&self.source) {
            entry.current -= 1;
        }
    }
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register full registry, financial, SEO and social data for `company`.
    pub fn company(mut self, company: &Company) -> Self {
        let name = company.name.to_string();
        self.replies.insert(
            (SourceId::Registry, name.clone()),
            Reply::Json(json!({
                "legal_name": company.name,
                "fiscal_id": company.fiscal_id,
                "legal_form": "SRL",
                "sector_code": "62.01",
                "registration_date": "2010-03-01",
                "registered_address": "Via Roma 1, Milano"
            })),
        );
        self.replies.insert(
            (SourceId::Financial, name.clone()),
            Reply::Json(json!([
                {"fiscal_year": 2023, "revenue": company.revenue * 0.8,
                 "net_worth": company.revenue * 0.1, "headcount": 10},
                {"fiscal_year": 2024, "revenue": company.revenue,
                 "net_worth": company.revenue * 0.15, "headcount": 12}
            ])),
        );
        self.replies.insert(
            (SourceId::Seo, company_domain(company.name)),
            Reply::Json(json!({
                "organic_keywords": company.organic_keywords,
                "monthly_traffic": 20000,
                "backlinks": 4000,
                "backlink_quality": 50.0,
                "domain_authority": 40.0,
                "keywords": company.keywords,
                "observed_at": "2025-01-01T00:00:00Z"
            })),
        );
        self.replies.insert(
            (SourceId::Social, name),
            Reply::Json(json!({
                "platforms": {
                    "linkedin": {
                        "followers": company.followers,
                        "engagement_rate": 2.0,
                        "growth_rate": 3.0
                    }
                },
                "observed_at": "2025-01-01T00:00:00Z"
            })),
        );
        self
    }

    /// Answer every request to `source` with `reply`.
    pub fn override_source(mut self, source: SourceId, reply: Reply) -> Self {
        self.overrides.insert(source, reply);
        self
    }

    /// Every request to `source` takes `delay` before answering.
    pub fn latency(mut self, source: SourceId, delay: Duration) -> Self {
        self.latency.insert(source, delay);
        self
    }

    /// Most calls to `source` that were in flight at the same time.
    pub fn peak_in_flight(&self, source: SourceId) -> usize {
        self.in_flight
            .lock()
            .unwrap()
            .get(&source)
            .map_or(0, |entry| entry.peak)
    }

    pub fn calls(&self, source: SourceId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == source)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

fn lookup_value(request: &SourceRequest) -> String {
    ["q", "fiscal_id", "domain", "name"]
        .into_iter()
        .find_map(|p| request.get(p))
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl DataSource for FakeSource {
    async fn fetch(&self, request: &SourceRequest) -> Result<Value, SourceError> {
        let key = lookup_value(request);
        self.calls
            .lock()
            .unwrap()
            .push((request.source, key.clone()));
        let _in_flight = InFlightGuard::enter(request.source, &self.in_flight);
        if let Some(delay) = self.latency.get(&request.source) {
            tokio::time::sleep(*delay).await;
        }

        let reply = self
            .overrides
            .get(&request.source)
            .or_else(|| self.replies.get(&(request.source, key.clone())))
            .cloned();
        match reply {
            Some(Reply::Json(body)) => Ok(body),
            Some(Reply::Transient) => Err(SourceError::Transient {
                source_id: request.source,
                reason: "HTTP 503".to_string(),
            }),
            Some(Reply::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Err(SourceError::Transient {
                    source_id: request.source,
                    reason: "timed out".to_string(),
                })
            }
            Some(Reply::Terminal) | None => Err(SourceError::Terminal {
                source_id: request.source,
                reason: format!("no record for '{key}'"),
            }),
        }
    }
}

/// Defaults with short back-off so retry tests stay quick.
pub fn test_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.backoff_base_ms = 10;
    config.backoff_cap_ms = 40;
    config
}
