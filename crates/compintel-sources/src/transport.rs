use async_trait::async_trait;
use compintel_core::SourceId;

use crate::error::SourceError;

/// One outbound call: which source, which endpoint, which query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub source: SourceId,
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl SourceRequest {
    #[must_use]
    pub fn new(source: SourceId, path: &'static str) -> Self {
        Self {
            source,
            path,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Value of the first parameter called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport seam behind every collector: turns a request into a JSON body.
///
/// Implementations classify their failures as [`SourceError::Transient`] or
/// [`SourceError::Terminal`]; retries, caching and rate limiting happen above
/// this layer.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, request: &SourceRequest) -> Result<serde_json::Value, SourceError>;
}
