use std::collections::BTreeMap;

use compintel_core::{EntityProfile, Provenance, SourceId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SliceCounts {
    pub real: usize,
    pub fallback: usize,
    pub absent: usize,
}

impl SliceCounts {
    fn record(&mut self, provenance: Option<Provenance>) {
        match provenance {
            Some(Provenance::Real) => self.real += 1,
            Some(Provenance::SimulatedFallback) => self.fallback += 1,
            None => self.absent += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.real + self.fallback + self.absent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excellent,
    Good,
    Sufficient,
    Limited,
}

impl QualityLevel {
    #[must_use]
    pub fn from_coverage(coverage: f64) -> Self {
        if coverage >= 0.8 {
            QualityLevel::Excellent
        } else if coverage >= 0.6 {
            QualityLevel::Good
        } else if coverage >= 0.4 {
            QualityLevel::Sufficient
        } else {
            QualityLevel::Limited
        }
    }
}

/// How much of a report rests on live data.
///
/// `coverage` is the share of all profile slices, target and competitors
/// alike, that hold real data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub by_source: BTreeMap<SourceId, SliceCounts>,
    pub coverage: f64,
    pub level: QualityLevel,
}

impl DataQuality {
    #[must_use]
    pub fn measure<'a>(profiles: impl IntoIterator<Item = &'a EntityProfile>) -> Self {
        let mut by_source: BTreeMap<SourceId, SliceCounts> = SourceId::PROFILE
            .into_iter()
            .map(|s| (s, SliceCounts::default()))
            .collect();
        for profile in profiles {
            for source in SourceId::PROFILE {
                by_source
                    .entry(source)
                    .or_default()
                    .record(profile.provenance_of(source));
            }
        }

        let (real, total) = by_source
            .values()
            .fold((0, 0), |(r, t), c| (r + c.real, t + c.total()));
        #[allow(clippy::cast_precision_loss)]
        let coverage = if total == 0 {
            0.0
        } else {
            real as f64 / total as f64
        };
        Self {
            by_source,
            coverage,
            level: QualityLevel::from_coverage(coverage),
        }
    }
}

#[cfg(test)]
mod tests {
    use compintel_core::{EntityRef, Slice, SocialProfile};

    use super::*;

    fn social() -> SocialProfile {
        SocialProfile {
            platforms: Default::default(),
            observed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn counts_every_slice_of_every_profile() {
        let mut a = EntityProfile::new(EntityRef::named("Acme"));
        a.social = Slice::Real(social());
        let mut b = EntityProfile::new(EntityRef::named("Beta"));
        b.social = Slice::SimulatedFallback(social());

        let quality = DataQuality::measure([&a, &b]);
        let social_counts = quality.by_source[&SourceId::Social];
        assert_eq!(social_counts.real, 1);
        assert_eq!(social_counts.fallback, 1);
        assert_eq!(quality.by_source[&SourceId::Seo].absent, 2);
        assert!((quality.coverage - 1.0 / 8.0).abs() < 1e-9);
        assert_eq!(quality.level, QualityLevel::Limited);
    }

    #[test]
    fn empty_input_has_zero_coverage() {
        let quality = DataQuality::measure(std::iter::empty());
        assert_eq!(quality.coverage, 0.0);
        assert_eq!(quality.by_source.len(), 4);
        assert!(!quality.by_source.contains_key(&SourceId::Search));
    }

    #[test]
    fn levels_follow_coverage_bands() {
        assert_eq!(QualityLevel::from_coverage(0.8), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_coverage(0.79), QualityLevel::Good);
        assert_eq!(QualityLevel::from_coverage(0.4), QualityLevel::Sufficient);
        assert_eq!(QualityLevel::from_coverage(0.39), QualityLevel::Limited);
    }
}
