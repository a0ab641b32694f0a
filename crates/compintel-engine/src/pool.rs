use std::collections::HashMap;

use compintel_core::{AnalysisConfig, SourceId};
use tokio::sync::{Semaphore, SemaphorePermit};

/// Bounded worker pool for collector calls.
///
/// A global semaphore caps concurrent calls overall; a per-source semaphore
/// caps in-flight calls to one source at `min(ceiling, pool size)`, so the
/// pool never has more requests outstanding against a source than its
/// ceiling allows in a window.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Semaphore,
    per_source: HashMap<SourceId, Semaphore>,
}

/// Held for the duration of one collector call.
#[derive(Debug)]
pub struct Admission<'a> {
    _source: Option<SemaphorePermit<'a>>,
    _worker: Option<SemaphorePermit<'a>>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        let size = config.worker_pool_size.max(1);
        let per_source = SourceId::ALL
            .into_iter()
            .map(|id| {
                let ceiling =
                    usize::try_from(config.sources.get(id).requests_per_minute).unwrap_or(size);
                (id, Semaphore::new(ceiling.min(size).max(1)))
            })
            .collect();
        Self {
            workers: Semaphore::new(size),
            per_source,
        }
    }

    /// Wait for a slot for `source`, then for a worker.
    ///
    /// The source slot is taken first so that callers queued on a saturated
    /// source do not hold workers other sources could use.
    pub async fn admit(&self, source: SourceId) -> Admission<'_> {
        let source_permit = match self.per_source.get(&source) {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };
        let worker_permit = self.workers.acquire().await.ok();
        Admission {
            _source: source_permit,
            _worker: worker_permit,
        }
    }

    #[must_use]
    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }

    #[must_use]
    pub fn available_for(&self, source: SourceId) -> usize {
        self.per_source
            .get(&source)
            .map_or(0, Semaphore::available_permits)
    }
}
