//! Shared data model and configuration for competitive-intelligence runs.
//!
//! Holds the per-entity records produced by the data sources, the
//! provenance-tagged [`EntityProfile`] the orchestrator assembles, the
//! [`AnalysisConfig`] loaded from the environment, and the identity helpers
//! (fiscal-id validation, company-name normalisation) used for cache keys and
//! competitor deduplication.

pub mod app_config;
pub mod candidates;
pub mod config;
pub mod entity;
pub mod fiscal;
pub mod profile;

use thiserror::Error;

pub use app_config::{AnalysisConfig, SimilarityWeights, SourceSettings, SourceTable};
pub use candidates::{load_candidates, parse_candidates, Candidate, CandidatesFile};
pub use config::{load_analysis_config, load_analysis_config_from_env};
pub use entity::{
    Entity, EntityRef, FinancialHistory, FinancialSnapshot, SeoProfile, SocialMetrics,
    SocialProfile,
};
pub use fiscal::{company_domain, normalize_company_name, validate_fiscal_id};
pub use profile::{CollectedSlice, EntityProfile, Provenance, Slice, SourceId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),

    #[error("failed to read candidates file {path}: {source}")]
    CandidatesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse candidates file: {0}")]
    CandidatesFileParse(#[from] serde_yaml::Error),
}
