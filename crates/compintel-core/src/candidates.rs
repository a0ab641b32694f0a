use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;
use crate::fiscal::{normalize_company_name, normalize_fiscal_id, validate_fiscal_id};
use crate::ConfigError;

/// A possible competitor as returned by candidate search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    #[serde(default)]
    pub fiscal_id: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub sector_code: Option<String>,
    /// SEO keywords the candidate ranks for.
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    /// Combined social audience.
    #[serde(default)]
    pub audience_size: Option<u64>,
}

impl Candidate {
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            name: self.name.clone(),
            fiscal_id: self.fiscal_id.clone(),
            domain: self.domain.clone(),
        }
    }

    /// Identity used to collapse duplicates: fiscal-id digits when known,
    /// otherwise the normalised name.
    #[must_use]
    pub fn identity_key(&self) -> String {
        self.entity_ref().query_key()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidatesFile {
    pub candidates: Vec<Candidate>,
}

/// Load and validate a static candidate pool from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_candidates(path: &Path) -> Result<CandidatesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CandidatesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_candidates(&content)
}

/// Parse and validate a candidate pool from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_candidates(content: &str) -> Result<CandidatesFile, ConfigError> {
    let file: CandidatesFile = serde_yaml::from_str(content)?;
    validate_candidates(&file)?;
    Ok(file)
}

fn validate_candidates(file: &CandidatesFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for candidate in &file.candidates {
        if normalize_company_name(&candidate.name).is_empty() {
            return Err(ConfigError::Validation(format!(
                "candidate name must be non-empty (got '{}')",
                candidate.name
            )));
        }

        if let Some(id) = candidate.fiscal_id.as_deref() {
            if !validate_fiscal_id(id) {
                return Err(ConfigError::Validation(format!(
                    "candidate '{}' has invalid fiscal id '{id}'",
                    candidate.name
                )));
            }
            if !seen_ids.insert(normalize_fiscal_id(id)) {
                return Err(ConfigError::Validation(format!(
                    "duplicate candidate fiscal id: '{id}'"
                )));
            }
        }
    }

    Ok(())
}
