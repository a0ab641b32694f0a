//! Provenance-tagged profile slices and the per-entity profile they fold into.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityRef, FinancialHistory, SeoProfile, SocialProfile};

/// External data source identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Registry,
    Financial,
    Seo,
    Social,
    Search,
}

impl SourceId {
    /// Every source, collectors first.
    pub const ALL: [SourceId; 5] = [
        SourceId::Registry,
        SourceId::Financial,
        SourceId::Seo,
        SourceId::Social,
        SourceId::Search,
    ];

    /// The sources that contribute a slice to an [`EntityProfile`].
    pub const PROFILE: [SourceId; 4] = [
        SourceId::Registry,
        SourceId::Financial,
        SourceId::Seo,
        SourceId::Social,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Registry => "registry",
            SourceId::Financial => "financial",
            SourceId::Seo => "seo",
            SourceId::Social => "social",
            SourceId::Search => "search",
        }
    }

    /// Upper-case name used in environment variable keys.
    #[must_use]
    pub fn env_name(self) -> &'static str {
        match self {
            SourceId::Registry => "REGISTRY",
            SourceId::Financial => "FINANCIAL",
            SourceId::Seo => "SEO",
            SourceId::Social => "SOCIAL",
            SourceId::Search => "SEARCH",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a value came from a live source or was synthesised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Real,
    SimulatedFallback,
}

/// One metric category of a profile: a complete value with its provenance,
/// or explicit absence. There is no partially populated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "kebab-case")]
pub enum Slice<T> {
    Real(T),
    SimulatedFallback(T),
    Absent,
}

impl<T> Slice<T> {
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Slice::Real(v) | Slice::SimulatedFallback(v) => Some(v),
            Slice::Absent => None,
        }
    }

    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            Slice::Real(_) => Some(Provenance::Real),
            Slice::SimulatedFallback(_) => Some(Provenance::SimulatedFallback),
            Slice::Absent => None,
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Slice::Absent)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slice<U> {
        match self {
            Slice::Real(v) => Slice::Real(f(v)),
            Slice::SimulatedFallback(v) => Slice::SimulatedFallback(f(v)),
            Slice::Absent => Slice::Absent,
        }
    }
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Slice::Absent
    }
}

/// A slice returned by one collector, tagged with the category it fills.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectedSlice {
    Registry(Slice<Entity>),
    Financial(Slice<FinancialHistory>),
    Seo(Slice<SeoProfile>),
    Social(Slice<SocialProfile>),
}

impl CollectedSlice {
    #[must_use]
    pub fn source(&self) -> SourceId {
        match self {
            CollectedSlice::Registry(_) => SourceId::Registry,
            CollectedSlice::Financial(_) => SourceId::Financial,
            CollectedSlice::Seo(_) => SourceId::Seo,
            CollectedSlice::Social(_) => SourceId::Social,
        }
    }

    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            CollectedSlice::Registry(s) => s.provenance(),
            CollectedSlice::Financial(s) => s.provenance(),
            CollectedSlice::Seo(s) => s.provenance(),
            CollectedSlice::Social(s) => s.provenance(),
        }
    }
}

/// Identity plus the latest financial, SEO and social slices for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    pub reference: EntityRef,
    pub identity: Slice<Entity>,
    pub financial: Slice<FinancialHistory>,
    pub seo: Slice<SeoProfile>,
    pub social: Slice<SocialProfile>,
}

impl EntityProfile {
    /// A profile with every slice absent.
    #[must_use]
    pub fn new(reference: EntityRef) -> Self {
        Self {
            reference,
            identity: Slice::Absent,
            financial: Slice::Absent,
            seo: Slice::Absent,
            social: Slice::Absent,
        }
    }

    /// Store a collected slice in its category, replacing what was there.
    pub fn apply(&mut self, slice: CollectedSlice) {
        match slice {
            CollectedSlice::Registry(s) => self.identity = s,
            CollectedSlice::Financial(s) => self.financial = s,
            CollectedSlice::Seo(s) => self.seo = s,
            CollectedSlice::Social(s) => self.social = s,
        }
    }

    /// Registry legal name when known, otherwise the requested name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.identity
            .value()
            .map_or(self.reference.name.as_str(), |e| e.legal_name.as_str())
    }

    /// Registry fiscal id when known, otherwise the requested one.
    #[must_use]
    pub fn fiscal_id(&self) -> Option<&str> {
        self.identity
            .value()
            .map(|e| e.fiscal_id.as_str())
            .or(self.reference.fiscal_id.as_deref())
    }

    #[must_use]
    pub fn provenance_of(&self, source: SourceId) -> Option<Provenance> {
        match source {
            SourceId::Registry => self.identity.provenance(),
            SourceId::Financial => self.financial.provenance(),
            SourceId::Seo => self.seo.provenance(),
            SourceId::Social => self.social.provenance(),
            SourceId::Search => None,
        }
    }

    /// `true` if at least one slice is present.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        SourceId::PROFILE
            .iter()
            .any(|s| self.provenance_of(*s).is_some())
    }
}
