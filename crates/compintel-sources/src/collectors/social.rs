use compintel_core::{CollectedSlice, EntityRef, Slice, SocialProfile, SourceId};
use rand::rngs::StdRng;

use super::{decode, SliceKind};
use crate::error::SourceError;
use crate::fallback::synthesize_social;
use crate::services::Payload;
use crate::transport::SourceRequest;

pub struct SocialKind;

impl SliceKind for SocialKind {
    type Output = SocialProfile;

    const SOURCE: SourceId = SourceId::Social;

    fn request(entity: &EntityRef) -> Result<SourceRequest, SourceError> {
        let name = entity.name.trim();
        if name.is_empty() {
            return Err(SourceError::Terminal {
                source_id: Self::SOURCE,
                reason: "empty company name".to_string(),
            });
        }
        Ok(SourceRequest::new(Self::SOURCE, "social").param("name", name))
    }

    fn parse(body: serde_json::Value) -> Result<SocialProfile, SourceError> {
        let profile: SocialProfile = decode(Self::SOURCE, "social profile", body)?;
        if profile.platforms.is_empty() {
            return Err(SourceError::Terminal {
                source_id: Self::SOURCE,
                reason: "no social platforms reported".to_string(),
            });
        }
        Ok(profile)
    }

    fn synthesize(_entity: &EntityRef, rng: &mut StdRng) -> SocialProfile {
        synthesize_social(rng)
    }

    fn into_payload(value: SocialProfile) -> Payload {
        Payload::Social(value)
    }

    fn from_payload(payload: Payload) -> Option<SocialProfile> {
        match payload {
            Payload::Social(profile) => Some(profile),
            _ => None,
        }
    }

    fn into_slice(slice: Slice<SocialProfile>) -> CollectedSlice {
        CollectedSlice::Social(slice)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_reads_platform_map() {
        let profile = SocialKind::parse(json!({
            "platforms": {
                "instagram": {"followers": 5000, "engagement_rate": 2.5, "growth_rate": 3.0},
                "linkedin": {"followers": 1200, "engagement_rate": 1.1, "growth_rate": 0.5}
            }
        }))
        .unwrap();
        assert_eq!(profile.total_followers(), 6200);
    }

    #[test]
    fn parse_rejects_empty_platforms() {
        let err = SocialKind::parse(json!({"platforms": {}})).unwrap_err();
        assert!(matches!(err, SourceError::Terminal { .. }));
    }
}
