//! Fan-out of the profile collectors across the target and its competitors.
//!
//! Order of a run: the target profile, then competitor discovery on that
//! profile, then every competitor profile concurrently, then benchmarking
//! and report assembly. Each entity has its own deadline; the run deadline
//! caps all of them.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use compintel_core::fiscal::normalize_fiscal_id;
use compintel_core::{AnalysisConfig, EntityProfile, EntityRef, SourceId};
use compintel_sources::{build_all, CandidateSearch, Collector, DataSource, SourceServices};
use futures::stream::{self, FuturesUnordered, StreamExt};
use tokio::time::Instant;

use crate::benchmark::BenchmarkEngine;
use crate::discovery::{CompetitorDiscoverer, CompetitorSet};
use crate::error::AnalysisError;
use crate::pool::WorkerPool;
use crate::report::{assemble, AnalysisReport, CompetitorProfile};

/// Stand-in for a deadline too far out to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub struct Orchestrator {
    config: AnalysisConfig,
    collectors: Vec<Arc<dyn Collector>>,
    discoverer: CompetitorDiscoverer,
    pool: WorkerPool,
    engine: BenchmarkEngine,
}

/// One entity's profile plus the notes its collection produced.
struct Gathered {
    profile: EntityProfile,
    warnings: Vec<String>,
}

impl Orchestrator {
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] if `config` fails validation.
    pub fn new(
        config: AnalysisConfig,
        collectors: Vec<Arc<dyn Collector>>,
        discoverer: CompetitorDiscoverer,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            pool: WorkerPool::new(&config),
            engine: BenchmarkEngine::from_config(&config),
            config,
            collectors,
            discoverer,
        })
    }

    /// Wire the four profile collectors and the discoverer over `services`.
    ///
    /// Passing the same `services` to several orchestrators shares one
    /// rate limiter and one cache between their runs.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] if `config` fails validation.
    pub fn with_services(
        config: AnalysisConfig,
        services: Arc<SourceServices>,
        transport: Arc<dyn DataSource>,
        search: Arc<dyn CandidateSearch>,
    ) -> Result<Self, AnalysisError> {
        let collectors = build_all(&services, &transport);
        let discoverer = CompetitorDiscoverer::new(search, services, config.similarity_weights);
        Self::new(config, collectors, discoverer)
    }

    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] if `config` fails validation.
    pub fn from_transport(
        config: AnalysisConfig,
        transport: Arc<dyn DataSource>,
        search: Arc<dyn CandidateSearch>,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let services = Arc::new(SourceServices::from_config(&config));
        Self::with_services(config, services, transport, search)
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Collect, discover, benchmark and assemble a report for `target`.
    ///
    /// Source failures never fail the run; they show up as fallback data,
    /// absent slices and report warnings.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoUsableProfiles`] when the run deadline
    /// expired before any profile, target or competitor, got a single slice.
    pub async fn analyze(
        &self,
        target: &EntityRef,
        competitor_count: usize,
    ) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();
        let run_deadline = started
            .checked_add(self.config.run_timeout())
            .unwrap_or_else(|| started + FAR_FUTURE);
        tracing::info!(
            entity = %target.name,
            competitor_count,
            "starting analysis run"
        );

        let Gathered {
            profile: target_profile,
            mut warnings,
        } = self.gather(target, run_deadline).await;

        let competitors = self
            .discover(&target_profile, competitor_count, run_deadline, &mut warnings)
            .await;

        let ranked = competitors.into_ranked();
        let gathered: Vec<Gathered> = stream::iter(&ranked)
            .map(|r| async move { self.gather(&r.candidate.entity_ref(), run_deadline).await })
            .buffered(self.config.worker_pool_size.max(1))
            .collect()
            .await;

        let mut competitor_profiles = Vec::with_capacity(ranked.len());
        for (ranked, gathered) in ranked.into_iter().zip(gathered) {
            warnings.extend(gathered.warnings);
            competitor_profiles.push(CompetitorProfile {
                profile: gathered.profile,
                similarity: ranked.similarity,
            });
        }
        let competitor_profiles =
            drop_resolved_duplicates(&target_profile, competitor_profiles, &mut warnings);

        if Instant::now() >= run_deadline {
            let usable = target_profile.is_usable()
                || competitor_profiles.iter().any(|c| c.profile.is_usable());
            if !usable {
                tracing::error!(entity = %target.name, "run timed out with no usable profile");
                return Err(AnalysisError::NoUsableProfiles {
                    target: target.name.clone(),
                    timeout_secs: self.config.run_timeout_secs,
                });
            }
            tracing::warn!(entity = %target.name, "run timed out; returning partial report");
            warnings.push(format!(
                "run timed out after {}s; report built from completed profiles",
                self.config.run_timeout_secs
            ));
        }

        let peers: Vec<EntityProfile> = competitor_profiles
            .iter()
            .map(|c| c.profile.clone())
            .collect();
        let benchmarks = self.engine.benchmark(&target_profile, &peers);
        let report = assemble(target_profile, competitor_profiles, benchmarks, warnings);

        tracing::info!(
            run_id = %report.run_id(),
            entity = %target.name,
            competitors = report.competitors().len(),
            benchmarked = report.benchmarks().results().len(),
            warnings = report.warnings().len(),
            coverage = report.data_quality().coverage,
            elapsed_ms = started.elapsed().as_millis(),
            "analysis run complete"
        );
        Ok(report)
    }

    async fn discover(
        &self,
        target: &EntityProfile,
        k: usize,
        run_deadline: Instant,
        warnings: &mut Vec<String>,
    ) -> CompetitorSet {
        match tokio::time::timeout_at(run_deadline, self.discoverer.discover(target, k)).await {
            Ok(Ok(set)) => set,
            Ok(Err(err)) => {
                tracing::warn!(
                    entity = %target.display_name(),
                    error = %err,
                    "competitor discovery failed"
                );
                warnings.push(format!("competitor discovery failed: {err}"));
                CompetitorSet::default()
            }
            Err(_) => {
                tracing::warn!(entity = %target.display_name(), "competitor discovery timed out");
                warnings.push("competitor discovery timed out".to_string());
                CompetitorSet::default()
            }
        }
    }

    /// Run every collector for `entity` until all have answered or the
    /// entity's deadline passes. Calls still pending at the deadline are
    /// dropped and their slices stay absent.
    async fn gather(&self, entity: &EntityRef, run_deadline: Instant) -> Gathered {
        let mut gathered = Gathered {
            profile: EntityProfile::new(entity.clone()),
            warnings: Vec::new(),
        };
        let now = Instant::now();
        if now >= run_deadline {
            gathered
                .warnings
                .push(format!("{}: skipped, run deadline reached", entity.name));
            return gathered;
        }
        let deadline = now
            .checked_add(self.config.entity_timeout())
            .map_or(run_deadline, |d| d.min(run_deadline));

        let mut pending: BTreeSet<SourceId> = self.collectors.iter().map(|c| c.source()).collect();
        let mut calls: FuturesUnordered<_> = self
            .collectors
            .iter()
            .map(|collector| async move {
                let _admission = self.pool.admit(collector.source()).await;
                collector.collect(entity).await
            })
            .collect();

        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);
        loop {
            tokio::select! {
                biased;
                next = calls.next() => {
                    let Some(collected) = next else { break };
                    pending.remove(&collected.slice.source());
                    if let Some(warning) = collected.warning {
                        gathered.warnings.push(format!("{}: {warning}", entity.name));
                    }
                    gathered.profile.apply(collected.slice);
                }
                () = &mut expiry => {
                    let sources: Vec<&str> = pending.iter().map(|s| s.as_str()).collect();
                    tracing::warn!(
                        entity = %entity.name,
                        pending = ?sources,
                        "entity collection timed out"
                    );
                    gathered.warnings.push(format!(
                        "{}: timed out waiting for {}",
                        entity.name,
                        sources.join(", ")
                    ));
                    break;
                }
            }
        }
        gathered
    }
}

/// Drop competitors whose registry lookup resolved to the target's fiscal id
/// or to one already held by a higher-ranked competitor.
///
/// Discovery only sees candidate names, so two names can turn out to be the
/// same company once the registry answers.
fn drop_resolved_duplicates(
    target: &EntityProfile,
    competitors: Vec<CompetitorProfile>,
    warnings: &mut Vec<String>,
) -> Vec<CompetitorProfile> {
    let fiscal_key = |profile: &EntityProfile| {
        profile
            .fiscal_id()
            .map(normalize_fiscal_id)
            .filter(|id| !id.is_empty())
    };
    let target_id = fiscal_key(target);
    let mut seen: HashSet<String> = target_id.iter().cloned().collect();

    competitors
        .into_iter()
        .filter(|competitor| {
            let Some(id) = fiscal_key(&competitor.profile) else {
                return true;
            };
            if seen.insert(id.clone()) {
                return true;
            }
            let name = &competitor.profile.reference.name;
            let reason = if target_id.as_deref() == Some(id.as_str()) {
                "is the target"
            } else {
                "duplicates a higher-ranked competitor"
            };
            tracing::warn!(competitor = %name, fiscal_id = %id, reason, "competitor dropped");
            warnings.push(format!("{name}: dropped, fiscal id {id} {reason}"));
            false
        })
        .collect()
}

/// One-shot entry point: build an orchestrator for `config` and run it once.
///
/// # Errors
///
/// See [`Orchestrator::from_transport`] and [`Orchestrator::analyze`].
pub async fn analyze(
    target: &EntityRef,
    competitor_count: usize,
    config: AnalysisConfig,
    transport: Arc<dyn DataSource>,
    search: Arc<dyn CandidateSearch>,
) -> Result<AnalysisReport, AnalysisError> {
    Orchestrator::from_transport(config, transport, search)?
        .analyze(target, competitor_count)
        .await
}
