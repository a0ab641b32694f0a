//! One collector per profile category, all sharing the same fetch path:
//! cache, then rate-limit permit, then retried outbound call, then fallback
//! or explicit absence on failure.

mod financial;
mod registry;
mod seo;
mod social;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use compintel_core::{CollectedSlice, EntityRef, Slice, SourceId};
use rand::rngs::StdRng;

pub use financial::FinancialKind;
pub use registry::RegistryKind;
pub use seo::SeoKind;
pub use social::SocialKind;

use crate::error::SourceError;
use crate::fallback::seeded_rng;
use crate::services::{Payload, SourceServices};
use crate::transport::{DataSource, SourceRequest};

/// What one collector returned for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub slice: CollectedSlice,
    /// Why the slice is absent or simulated, when a source failed.
    pub warning: Option<String>,
}

/// Fetches one profile category for one entity. Never fails: failures
/// resolve to simulated fallback or explicit absence.
#[async_trait]
pub trait Collector: Send + Sync {
    fn source(&self) -> SourceId;

    async fn collect(&self, entity: &EntityRef) -> Collected;
}

/// Per-category behaviour plugged into [`SourceCollector`].
pub trait SliceKind: 'static {
    type Output: Clone + Send + Sync + 'static;

    const SOURCE: SourceId;

    /// Build the outbound request.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Terminal`] for a query that can never succeed.
    fn request(entity: &EntityRef) -> Result<SourceRequest, SourceError>;

    /// Normalised cache key, also the fallback seed.
    fn query_key(entity: &EntityRef) -> String {
        entity.query_key()
    }

    /// Decode a response body.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Deserialize`] or [`SourceError::Terminal`] when
    /// the body cannot be turned into a complete value.
    fn parse(body: serde_json::Value) -> Result<Self::Output, SourceError>;

    fn synthesize(entity: &EntityRef, rng: &mut StdRng) -> Self::Output;

    fn into_payload(value: Self::Output) -> Payload;

    fn from_payload(payload: Payload) -> Option<Self::Output>;

    fn into_slice(slice: Slice<Self::Output>) -> CollectedSlice;
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    source_id: SourceId,
    context: &str,
    body: serde_json::Value,
) -> Result<T, SourceError> {
    serde_json::from_value(body).map_err(|e| SourceError::Deserialize {
        source_id,
        context: context.to_string(),
        source: e,
    })
}

/// Collector for one [`SliceKind`] over a shared transport and services.
pub struct SourceCollector<K> {
    services: Arc<SourceServices>,
    transport: Arc<dyn DataSource>,
    kind: PhantomData<fn() -> K>,
}

impl<K: SliceKind> SourceCollector<K> {
    #[must_use]
    pub fn new(services: Arc<SourceServices>, transport: Arc<dyn DataSource>) -> Self {
        Self {
            services,
            transport,
            kind: PhantomData,
        }
    }

    async fn fetch(&self, entity: &EntityRef) -> Result<K::Output, SourceError> {
        let request = K::request(entity)?;
        let key = K::query_key(entity);
        let transport = &self.transport;
        let request = &request;
        let payload = self
            .services
            .fetch(K::SOURCE, &key, move || async move {
                let body = transport.fetch(request).await?;
                K::parse(body).map(K::into_payload)
            })
            .await?;
        K::from_payload(payload).ok_or_else(|| SourceError::Terminal {
            source_id: K::SOURCE,
            reason: format!("cached payload for '{key}' has the wrong kind"),
        })
    }
}

#[async_trait]
impl<K: SliceKind> Collector for SourceCollector<K> {
    fn source(&self) -> SourceId {
        K::SOURCE
    }

    async fn collect(&self, entity: &EntityRef) -> Collected {
        let settings = self.services.settings(K::SOURCE);
        let outcome = if settings.enabled {
            self.fetch(entity).await
        } else {
            Err(SourceError::Disabled {
                source_id: K::SOURCE,
            })
        };

        match outcome {
            Ok(value) => Collected {
                slice: K::into_slice(Slice::Real(value)),
                warning: None,
            },
            Err(err) if err.allows_fallback() && settings.fallback_enabled => {
                let key = K::query_key(entity);
                let warning = match err {
                    SourceError::Disabled { .. } => None,
                    ref err => {
                        tracing::warn!(
                            source = %K::SOURCE,
                            entity = %key,
                            error = %err,
                            "substituting simulated fallback data"
                        );
                        Some(format!("{err}; using simulated fallback"))
                    }
                };
                let value = K::synthesize(entity, &mut seeded_rng(K::SOURCE, &key));
                Collected {
                    slice: K::into_slice(Slice::SimulatedFallback(value)),
                    warning,
                }
            }
            Err(err) => {
                let warning = match err {
                    SourceError::Disabled { .. } => None,
                    ref err => {
                        tracing::warn!(
                            source = %K::SOURCE,
                            entity = %entity.name,
                            error = %err,
                            "slice marked absent"
                        );
                        Some(format!("{err}; slice absent"))
                    }
                };
                Collected {
                    slice: K::into_slice(Slice::Absent),
                    warning,
                }
            }
        }
    }
}

/// The four profile collectors over one transport, in profile order.
#[must_use]
pub fn build_all(
    services: &Arc<SourceServices>,
    transport: &Arc<dyn DataSource>,
) -> Vec<Arc<dyn Collector>> {
    vec![
        Arc::new(SourceCollector::<RegistryKind>::new(
            Arc::clone(services),
            Arc::clone(transport),
        )),
        Arc::new(SourceCollector::<FinancialKind>::new(
            Arc::clone(services),
            Arc::clone(transport),
        )),
        Arc::new(SourceCollector::<SeoKind>::new(
            Arc::clone(services),
            Arc::clone(transport),
        )),
        Arc::new(SourceCollector::<SocialKind>::new(
            Arc::clone(services),
            Arc::clone(transport),
        )),
    ]
}
