use compintel_core::fiscal::normalize_fiscal_id;
use compintel_core::{CollectedSlice, EntityRef, FinancialHistory, Slice, SourceId};
use rand::rngs::StdRng;

use super::{decode, SliceKind};
use crate::error::SourceError;
use crate::fallback::{last_closed_fiscal_year, synthesize_financial};
use crate::services::Payload;
use crate::transport::SourceRequest;

/// Filed accounts: the five most recent fiscal years.
pub struct FinancialKind;

impl SliceKind for FinancialKind {
    type Output = FinancialHistory;

    const SOURCE: SourceId = SourceId::Financial;

    fn request(entity: &EntityRef) -> Result<SourceRequest, SourceError> {
        let request = SourceRequest::new(Self::SOURCE, "financial");
        match entity.fiscal_id.as_deref().map(normalize_fiscal_id) {
            Some(id) if !id.is_empty() => Ok(request.param("fiscal_id", id)),
            _ if entity.name.trim().is_empty() => Err(SourceError::Terminal {
                source_id: Self::SOURCE,
                reason: "neither fiscal id nor company name given".to_string(),
            }),
            _ => Ok(request.param("name", entity.name.trim())),
        }
    }

    fn parse(body: serde_json::Value) -> Result<FinancialHistory, SourceError> {
        let history: FinancialHistory = decode(Self::SOURCE, "financial history", body)?;
        if history.is_empty() {
            return Err(SourceError::Terminal {
                source_id: Self::SOURCE,
                reason: "no filed fiscal years".to_string(),
            });
        }
        Ok(history)
    }

    fn synthesize(_entity: &EntityRef, rng: &mut StdRng) -> FinancialHistory {
        synthesize_financial(last_closed_fiscal_year(), rng)
    }

    fn into_payload(value: FinancialHistory) -> Payload {
        Payload::Financial(value)
    }

    fn from_payload(payload: Payload) -> Option<FinancialHistory> {
        match payload {
            Payload::Financial(history) => Some(history),
            _ => None,
        }
    }

    fn into_slice(slice: Slice<FinancialHistory>) -> CollectedSlice {
        CollectedSlice::Financial(slice)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_uses_fiscal_id_then_name() {
        let by_id = FinancialKind::request(&EntityRef::named("Acme").with_fiscal_id("00743110157"))
            .unwrap();
        assert_eq!(by_id.get("fiscal_id"), Some("00743110157"));
        let by_name = FinancialKind::request(&EntityRef::named("Acme")).unwrap();
        assert_eq!(by_name.get("name"), Some("Acme"));
    }

    #[test]
    fn parse_orders_years_and_computes_growth() {
        let history = FinancialKind::parse(json!([
            {"fiscal_year": 2023, "revenue": 1500000.0, "net_worth": 200000.0, "headcount": 12},
            {"fiscal_year": 2022, "revenue": 1000000.0, "net_worth": 150000.0, "headcount": 10}
        ]))
        .unwrap();
        let latest = history.latest().unwrap();
        assert_eq!(latest.fiscal_year, 2023);
        assert_eq!(latest.growth_rate, Some(50.0));
    }

    #[test]
    fn parse_rejects_empty_history() {
        let err = FinancialKind::parse(json!([])).unwrap_err();
        assert!(matches!(err, SourceError::Terminal { .. }));
    }
}
