//! Data-source plumbing for competitive-intelligence runs.
//!
//! A [`SourceServices`] instance owns the shared rate limiter, response cache
//! and retry policy. Collectors (one per profile category) fetch through it
//! over a [`DataSource`] transport and turn failures into simulated fallback
//! data or explicit absence, so a single failing source never fails a profile.

pub mod cache;
pub mod collectors;
pub mod error;
pub mod fallback;
pub mod http;
pub mod rate_limit;
pub mod retry;
pub mod search;
pub mod services;
pub mod transport;

pub use cache::{CacheKey, CacheLayer};
pub use collectors::{build_all, Collected, Collector, SliceKind, SourceCollector};
pub use error::SourceError;
pub use http::HttpJsonSource;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use search::{CandidateSearch, StaticCandidates, TransportSearch};
pub use services::{Payload, SourceServices};
pub use transport::{DataSource, SourceRequest};
