//! The terminal artifact of an analysis run.

use chrono::{DateTime, Utc};
use compintel_core::EntityProfile;
use serde::Serialize;
use uuid::Uuid;

use crate::benchmark::BenchmarkSet;
use crate::discovery::SimilarityScore;
use crate::quality::DataQuality;

/// A competitor's collected profile with the similarity that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorProfile {
    pub profile: EntityProfile,
    pub similarity: SimilarityScore,
}

/// Read-only once assembled; fields are exposed through getters only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    target: EntityProfile,
    competitors: Vec<CompetitorProfile>,
    benchmarks: BenchmarkSet,
    data_quality: DataQuality,
    warnings: Vec<String>,
}

/// Package the results of a run. Pure apart from the id and timestamp.
#[must_use]
pub fn assemble(
    target: EntityProfile,
    competitors: Vec<CompetitorProfile>,
    benchmarks: BenchmarkSet,
    warnings: Vec<String>,
) -> AnalysisReport {
    let data_quality = DataQuality::measure(
        std::iter::once(&target).chain(competitors.iter().map(|c| &c.profile)),
    );
    AnalysisReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        target,
        competitors,
        benchmarks,
        data_quality,
        warnings,
    }
}

impl AnalysisReport {
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    #[must_use]
    pub fn target(&self) -> &EntityProfile {
        &self.target
    }

    #[must_use]
    pub fn competitors(&self) -> &[CompetitorProfile] {
        &self.competitors
    }

    #[must_use]
    pub fn benchmarks(&self) -> &BenchmarkSet {
        &self.benchmarks
    }

    #[must_use]
    pub fn data_quality(&self) -> &DataQuality {
        &self.data_quality
    }

    /// Source failures, fallbacks and timeouts hit during the run.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialisation fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use compintel_core::{EntityRef, Slice, SourceId};

    use super::*;

    #[test]
    fn assembled_report_exports_explicit_absence() {
        let report = assemble(
            EntityProfile::new(EntityRef::named("Acme")),
            Vec::new(),
            BenchmarkSet::default(),
            vec!["seo: timed out".to_string()],
        );
        assert_eq!(report.target().seo, Slice::Absent);
        assert_eq!(report.data_quality().by_source[&SourceId::Seo].absent, 1);

        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["target"]["financial"]["status"], "absent");
        assert_eq!(json["warnings"][0], "seo: timed out");
        assert_eq!(json["run_id"], report.run_id().to_string());
    }

    #[test]
    fn each_report_gets_its_own_run_id() {
        let make = || {
            assemble(
                EntityProfile::new(EntityRef::named("Acme")),
                Vec::new(),
                BenchmarkSet::default(),
                Vec::new(),
            )
        };
        assert_ne!(make().run_id(), make().run_id());
    }
}
