use compintel_core::fiscal::normalize_fiscal_id;
use compintel_core::{validate_fiscal_id, CollectedSlice, Entity, EntityRef, Slice, SourceId};
use rand::rngs::StdRng;

use super::{decode, SliceKind};
use crate::error::SourceError;
use crate::fallback::synthesize_entity;
use crate::services::Payload;
use crate::transport::SourceRequest;

/// Company registry lookup by fiscal id, or by name when none is known.
pub struct RegistryKind;

impl SliceKind for RegistryKind {
    type Output = Entity;

    const SOURCE: SourceId = SourceId::Registry;

    fn request(entity: &EntityRef) -> Result<SourceRequest, SourceError> {
        let query = match entity.fiscal_id.as_deref() {
            Some(id) if !validate_fiscal_id(id) => {
                return Err(SourceError::Terminal {
                    source_id: Self::SOURCE,
                    reason: format!("malformed fiscal id '{id}'"),
                });
            }
            Some(id) => normalize_fiscal_id(id),
            None if entity.name.trim().is_empty() => {
                return Err(SourceError::Terminal {
                    source_id: Self::SOURCE,
                    reason: "empty company name".to_string(),
                });
            }
            None => entity.name.trim().to_string(),
        };
        Ok(SourceRequest::new(Self::SOURCE, "registry").param("q", query))
    }

    fn parse(body: serde_json::Value) -> Result<Entity, SourceError> {
        let entity: Entity = decode(Self::SOURCE, "registry record", body)?;
        if entity.legal_name.trim().is_empty() {
            return Err(SourceError::Terminal {
                source_id: Self::SOURCE,
                reason: "registry record has no legal name".to_string(),
            });
        }
        Ok(entity)
    }

    fn synthesize(entity: &EntityRef, rng: &mut StdRng) -> Entity {
        synthesize_entity(entity, rng)
    }

    fn into_payload(value: Entity) -> Payload {
        Payload::Registry(value)
    }

    fn from_payload(payload: Payload) -> Option<Entity> {
        match payload {
            Payload::Registry(entity) => Some(entity),
            _ => None,
        }
    }

    fn into_slice(slice: Slice<Entity>) -> CollectedSlice {
        CollectedSlice::Registry(slice)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_prefers_fiscal_id_digits() {
        let entity = EntityRef::named("Acme").with_fiscal_id("IT 00743110157");
        let request = RegistryKind::request(&entity).unwrap();
        assert_eq!(request.path, "registry");
        assert_eq!(request.get("q"), Some("00743110157"));
    }

    #[test]
    fn request_rejects_malformed_fiscal_id() {
        let entity = EntityRef::named("Acme").with_fiscal_id("12345");
        let err = RegistryKind::request(&entity).unwrap_err();
        assert!(matches!(err, SourceError::Terminal { .. }));
    }

    #[test]
    fn request_by_name() {
        let request = RegistryKind::request(&EntityRef::named(" Acme S.r.l. ")).unwrap();
        assert_eq!(request.get("q"), Some("Acme S.r.l."));
    }

    #[test]
    fn parse_reads_registry_record() {
        let entity = RegistryKind::parse(json!({
            "legal_name": "Acme S.r.l.",
            "fiscal_id": "00743110157",
            "legal_form": "SRL",
            "sector_code": "62.01",
            "registration_date": "2004-05-17"
        }))
        .unwrap();
        assert_eq!(entity.sector_code, "62.01");
        assert!(entity.registration_date.is_some());
        assert!(entity.registered_address.is_none());
    }

    #[test]
    fn parse_rejects_incomplete_record() {
        let err = RegistryKind::parse(json!({"legal_name": "Acme"})).unwrap_err();
        assert!(matches!(err, SourceError::Deserialize { .. }));
    }
}
