use std::sync::Arc;

use compintel_core::SourceId;
use thiserror::Error;

/// Errors raised while talking to an external data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure, 5xx or a remote rate-limit signal. Worth retrying.
    #[error("{source_id}: transient failure: {reason}")]
    Transient { source_id: SourceId, reason: String },

    /// Authentication failure, malformed query or other 4xx. Never retried.
    #[error("{source_id}: terminal failure: {reason}")]
    Terminal { source_id: SourceId, reason: String },

    /// The response body did not match the expected shape.
    #[error("{source_id}: JSON deserialization error for {context}: {source}")]
    Deserialize {
        source_id: SourceId,
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The local request ceiling stayed exhausted past the caller's wait budget.
    #[error("{source_id}: rate limit exceeded after waiting {waited_ms} ms")]
    RateLimitExceeded { source_id: SourceId, waited_ms: u64 },

    /// Every attempt failed with a transient error.
    #[error("{source_id}: unavailable after {attempts} attempts: {last_error}")]
    Unavailable {
        source_id: SourceId,
        attempts: u32,
        last_error: String,
    },

    #[error("{source_id}: source disabled by configuration")]
    Disabled { source_id: SourceId },
}

impl SourceError {
    #[must_use]
    pub fn source_id(&self) -> SourceId {
        match self {
            SourceError::Transient { source_id, .. }
            | SourceError::Terminal { source_id, .. }
            | SourceError::Deserialize { source_id, .. }
            | SourceError::RateLimitExceeded { source_id, .. }
            | SourceError::Unavailable { source_id, .. }
            | SourceError::Disabled { source_id } => *source_id,
        }
    }

    /// Returns `true` for errors that are worth retrying after a back-off delay.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Transient { .. } => true,
            SourceError::Terminal { .. }
            | SourceError::Deserialize { .. }
            | SourceError::RateLimitExceeded { .. }
            | SourceError::Unavailable { .. }
            | SourceError::Disabled { .. } => false,
        }
    }

    /// Whether the collector may substitute fallback data for this failure.
    ///
    /// Terminal failures mean the query itself is wrong, so they resolve to
    /// explicit absence instead.
    #[must_use]
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            SourceError::Unavailable { .. }
                | SourceError::RateLimitExceeded { .. }
                | SourceError::Transient { .. }
                | SourceError::Disabled { .. }
        )
    }

    /// Recover an owned error from the shared one handed back by the cache.
    ///
    /// Concurrent waiters on the same key all receive the first fetch's error;
    /// only one of them can take ownership, the rest get an equivalent copy.
    #[must_use]
    pub fn from_shared(err: Arc<SourceError>) -> SourceError {
        Arc::try_unwrap(err).unwrap_or_else(|shared| shared.duplicate())
    }

    fn duplicate(&self) -> SourceError {
        match self {
            SourceError::Transient { source_id, reason } => SourceError::Transient {
                source_id: *source_id,
                reason: reason.clone(),
            },
            SourceError::Terminal { source_id, reason } => SourceError::Terminal {
                source_id: *source_id,
                reason: reason.clone(),
            },
            SourceError::Deserialize { source_id, .. } => SourceError::Terminal {
                source_id: *source_id,
                reason: self.to_string(),
            },
            SourceError::RateLimitExceeded {
                source_id,
                waited_ms,
            } => SourceError::RateLimitExceeded {
                source_id: *source_id,
                waited_ms: *waited_ms,
            },
            SourceError::Unavailable {
                source_id,
                attempts,
                last_error,
            } => SourceError::Unavailable {
                source_id: *source_id,
                attempts: *attempts,
                last_error: last_error.clone(),
            },
            SourceError::Disabled { source_id } => SourceError::Disabled {
                source_id: *source_id,
            },
        }
    }
}
