//! Candidate-search collaborators used for competitor discovery.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use compintel_core::{load_candidates, Candidate, ConfigError, SourceId};

use crate::collectors::decode;
use crate::error::SourceError;
use crate::transport::{DataSource, SourceRequest};

/// Returns possible competitors for a sector and company name.
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SourceError`] if the search source fails.
    async fn search(&self, sector: Option<&str>, name: &str)
        -> Result<Vec<Candidate>, SourceError>;
}

/// A fixed candidate pool, typically loaded from YAML.
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates {
    candidates: Vec<Candidate>,
}

impl StaticCandidates {
    #[must_use]
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Load a pool from a `candidates:` YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
    pub fn from_yaml(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(load_candidates(path)?.candidates))
    }
}

#[async_trait]
impl CandidateSearch for StaticCandidates {
    /// Candidates in the same sector division when a sector is given;
    /// the whole pool otherwise, or when nothing in the pool matches.
    async fn search(
        &self,
        sector: Option<&str>,
        _name: &str,
    ) -> Result<Vec<Candidate>, SourceError> {
        let Some(division) = sector.and_then(|s| s.split('.').next()) else {
            return Ok(self.candidates.clone());
        };
        let same_division: Vec<Candidate> = self
            .candidates
            .iter()
            .filter(|c| {
                c.sector_code
                    .as_deref()
                    .and_then(|s| s.split('.').next())
                    .is_some_and(|d| d == division)
            })
            .cloned()
            .collect();
        if same_division.is_empty() {
            Ok(self.candidates.clone())
        } else {
            Ok(same_division)
        }
    }
}

/// Candidate search over the same transport as the collectors (`/search`).
pub struct TransportSearch {
    transport: Arc<dyn DataSource>,
}

impl TransportSearch {
    #[must_use]
    pub fn new(transport: Arc<dyn DataSource>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl CandidateSearch for TransportSearch {
    async fn search(
        &self,
        sector: Option<&str>,
        name: &str,
    ) -> Result<Vec<Candidate>, SourceError> {
        let mut request = SourceRequest::new(SourceId::Search, "search").param("name", name.trim());
        if let Some(sector) = sector {
            request = request.param("sector", sector);
        }
        let body = self.transport.fetch(&request).await?;
        decode(SourceId::Search, "candidate list", body)
    }
}
