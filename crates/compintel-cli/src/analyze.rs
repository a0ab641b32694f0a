//! `analyze` command: wire the HTTP sources, run one analysis, emit JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use compintel_core::{AnalysisConfig, EntityRef, SourceId};
use compintel_engine::Orchestrator;
use compintel_sources::{
    CandidateSearch, DataSource, HttpJsonSource, StaticCandidates, TransportSearch,
};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Company name as registered
    #[arg(long)]
    pub name: String,
    /// VAT number; takes precedence over the name for lookups
    #[arg(long)]
    pub fiscal_id: Option<String>,
    /// Web domain for SEO lookups (derived from the name when omitted)
    #[arg(long)]
    pub domain: Option<String>,
    /// Maximum number of competitors to profile
    #[arg(long, default_value = "5")]
    pub competitors: usize,
    /// YAML candidate pool to use instead of the search source
    #[arg(long)]
    pub candidates: Option<PathBuf>,
    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl AnalyzeArgs {
    pub fn entity_ref(&self) -> EntityRef {
        let mut entity = EntityRef::named(self.name.trim());
        if let Some(id) = self.fiscal_id.as_deref() {
            entity = entity.with_fiscal_id(id);
        }
        if let Some(domain) = self.domain.as_deref() {
            entity = entity.with_domain(domain);
        }
        entity
    }
}

/// Turn off every source that has nowhere to send requests, so it goes
/// straight to fallback (or absence) instead of failing on each call.
///
/// Search stays on without a URL when a static candidate pool is given.
pub fn disable_unreachable_sources(config: &mut AnalysisConfig, static_search: bool) {
    for source in SourceId::ALL {
        let settings = config.sources.get_mut(source);
        let reachable =
            settings.base_url.is_some() || (source == SourceId::Search && static_search);
        if settings.enabled && !reachable {
            tracing::info!(%source, "no base URL configured; source disabled");
            settings.enabled = false;
        }
    }
}

/// Run one analysis and print or write the JSON report.
///
/// # Errors
///
/// Returns an error if the candidate file cannot be loaded, the HTTP client
/// cannot be built, the configuration is invalid, the run produced no usable
/// profile, or the report cannot be written.
pub(crate) async fn run_analyze(
    mut config: AnalysisConfig,
    args: &AnalyzeArgs,
) -> anyhow::Result<()> {
    disable_unreachable_sources(&mut config, args.candidates.is_some());
    let http = HttpJsonSource::from_sources(&config.sources, config.request_timeout())
        .context("failed to build HTTP transport")?;
    let transport: Arc<dyn DataSource> = Arc::new(http);

    let search: Arc<dyn CandidateSearch> = match args.candidates.as_deref() {
        Some(path) => Arc::new(
            StaticCandidates::from_yaml(path)
                .with_context(|| format!("failed to load candidates from {}", path.display()))?,
        ),
        None => Arc::new(TransportSearch::new(Arc::clone(&transport))),
    };

    let orchestrator = Orchestrator::from_transport(config, transport, search)?;
    let report = orchestrator
        .analyze(&args.entity_ref(), args.competitors)
        .await?;

    for warning in report.warnings() {
        tracing::warn!("{warning}");
    }
    let json = report.to_json_pretty()?;
    match args.output.as_deref() {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), run_id = %report.run_id(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
