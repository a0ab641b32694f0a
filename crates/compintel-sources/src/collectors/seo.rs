use compintel_core::{CollectedSlice, EntityRef, SeoProfile, Slice, SourceId};
use rand::rngs::StdRng;

use super::{decode, SliceKind};
use crate::error::SourceError;
use crate::fallback::synthesize_seo;
use crate::services::Payload;
use crate::transport::SourceRequest;

/// Search visibility metrics, keyed by web domain.
pub struct SeoKind;

impl SliceKind for SeoKind {
    type Output = SeoProfile;

    const SOURCE: SourceId = SourceId::Seo;

    fn request(entity: &EntityRef) -> Result<SourceRequest, SourceError> {
        Ok(SourceRequest::new(Self::SOURCE, "seo").param("domain", entity.web_domain()))
    }

    fn query_key(entity: &EntityRef) -> String {
        entity.web_domain()
    }

    fn parse(body: serde_json::Value) -> Result<SeoProfile, SourceError> {
        decode(Self::SOURCE, "seo profile", body)
    }

    fn synthesize(_entity: &EntityRef, rng: &mut StdRng) -> SeoProfile {
        synthesize_seo(rng)
    }

    fn into_payload(value: SeoProfile) -> Payload {
        Payload::Seo(value)
    }

    fn from_payload(payload: Payload) -> Option<SeoProfile> {
        match payload {
            Payload::Seo(profile) => Some(profile),
            _ => None,
        }
    }

    fn into_slice(slice: Slice<SeoProfile>) -> CollectedSlice {
        CollectedSlice::Seo(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_the_domain() {
        let a = EntityRef::named("ACME S.r.l.");
        let b = EntityRef::named("Acme");
        assert_eq!(SeoKind::query_key(&a), "www.acme.it");
        assert_eq!(SeoKind::query_key(&a), SeoKind::query_key(&b));
        let request = SeoKind::request(&a.with_domain("acme.com")).unwrap();
        assert_eq!(request.get("domain"), Some("acme.com"));
    }
}
