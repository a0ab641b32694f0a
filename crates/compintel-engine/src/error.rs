use compintel_core::ConfigError;
use thiserror::Error;

/// Failures that abort a whole analysis run.
///
/// Individual source failures never surface here; they are resolved inside
/// each profile as fallback data or explicit absence.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("run timed out after {timeout_secs}s with no usable profile for '{target}'")]
    NoUsableProfiles { target: String, timeout_secs: u64 },
}
