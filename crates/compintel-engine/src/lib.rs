//! Collection-and-benchmarking engine.
//!
//! [`Orchestrator::analyze`] builds the target's profile, discovers and
//! profiles its competitors under a bounded worker pool, ranks the target
//! against them and returns an immutable [`AnalysisReport`].

pub mod benchmark;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod quality;
pub mod report;

pub use benchmark::{
    BenchmarkEngine, BenchmarkResult, BenchmarkSet, Classification, Exclusion, ExclusionReason,
    MetricCategory, MetricId,
};
pub use discovery::{CompetitorDiscoverer, CompetitorSet, RankedCandidate, SimilarityScore};
pub use error::AnalysisError;
pub use orchestrator::{analyze, Orchestrator};
pub use pool::WorkerPool;
pub use quality::{DataQuality, QualityLevel, SliceCounts};
pub use report::{assemble, AnalysisReport, CompetitorProfile};
