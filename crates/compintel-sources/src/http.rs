//! JSON-over-HTTP transport for the external data sources.
//!
//! Each source lives at its own base URL and answers `GET {base}/{path}` with a
//! JSON body. HTTP status and network failures are classified here into
//! [`SourceError::Transient`] and [`SourceError::Terminal`]; retries happen in
//! the shared services layer above.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use compintel_core::{SourceId, SourceTable};
use reqwest::{Client, StatusCode, Url};

use crate::error::SourceError;
use crate::transport::{DataSource, SourceRequest};

#[derive(Debug, Clone)]
struct Endpoint {
    base_url: Url,
    api_key: Option<String>,
}

/// HTTP transport covering every configured source.
///
/// Sources without a base URL are not registered; requests for them fail with
/// [`SourceError::Disabled`].
pub struct HttpJsonSource {
    client: Client,
    endpoints: HashMap<SourceId, Endpoint>,
}

impl HttpJsonSource {
    /// Build a transport for every source in `sources` that has a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Terminal`] if a base URL is invalid or the
    /// underlying `reqwest::Client` cannot be constructed.
    pub fn from_sources(sources: &SourceTable, timeout: Duration) -> Result<Self, SourceError> {
        let mut transport = Self::new(timeout)?;
        for source in SourceId::ALL {
            let settings = sources.get(source);
            if let Some(base_url) = settings.base_url.as_deref() {
                transport = transport.with_endpoint(source, base_url, settings.api_key.as_deref())?;
            }
        }
        Ok(transport)
    }

    /// A transport with no endpoints yet.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Terminal`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("compintel/0.1 (competitive-intelligence)")
            .build()
            .map_err(|e| SourceError::Terminal {
                source_id: SourceId::Registry,
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoints: HashMap::new(),
        })
    }

    /// Register (or replace) the endpoint for one source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Terminal`] if `base_url` is not a valid URL.
    pub fn with_endpoint(
        mut self,
        source: SourceId,
        base_url: &str,
        api_key: Option<&str>,
    ) -> Result<Self, SourceError> {
        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| SourceError::Terminal {
            source_id: source,
            reason: format!("invalid base URL '{base_url}': {e}"),
        })?;
        self.endpoints.insert(
            source,
            Endpoint {
                base_url,
                api_key: api_key.map(str::to_owned),
            },
        );
        Ok(self)
    }

    fn build_url(&self, request: &SourceRequest) -> Result<Url, SourceError> {
        let endpoint = self
            .endpoints
            .get(&request.source)
            .ok_or(SourceError::Disabled {
                source_id: request.source,
            })?;
        let mut url = endpoint
            .base_url
            .join(request.path)
            .map_err(|e| SourceError::Terminal {
                source_id: request.source,
                reason: format!("invalid path '{}': {e}", request.path),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(key) = endpoint.api_key.as_deref() {
                pairs.append_pair("key", key);
            }
            for (name, value) in &request.params {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

/// 429 and 5xx are worth retrying; every other non-success status is not.
fn classify_status(source_id: SourceId, status: StatusCode) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        SourceError::Transient {
            source_id,
            reason: format!("HTTP {status}"),
        }
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        SourceError::Terminal {
            source_id,
            reason: format!("authentication failed: HTTP {status}"),
        }
    } else {
        SourceError::Terminal {
            source_id,
            reason: format!("request rejected: HTTP {status}"),
        }
    }
}

fn classify_transport(source_id: SourceId, err: &reqwest::Error) -> SourceError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        SourceError::Transient {
            source_id,
            reason: err.to_string(),
        }
    } else {
        SourceError::Terminal {
            source_id,
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl DataSource for HttpJsonSource {
    async fn fetch(&self, request: &SourceRequest) -> Result<serde_json::Value, SourceError> {
        let source_id = request.source;
        let url = self.build_url(request)?;
        tracing::debug!(source = %source_id, path = request.path, "outbound request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_transport(source_id, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(source_id, status));
        }
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(source_id, &e))?;
        serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
            source_id,
            context: url.path().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base_url: &str) -> HttpJsonSource {
        HttpJsonSource::new(Duration::from_secs(5))
            .and_then(|t| t.with_endpoint(SourceId::Seo, base_url, Some("test-key")))
            .expect("transport construction should not fail")
    }

    #[test]
    fn build_url_appends_key_and_params() {
        let t = transport("https://seo.example.com/api");
        let request = SourceRequest::new(SourceId::Seo, "seo").param("domain", "www.acme.it");
        let url = t.build_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://seo.example.com/api/seo?key=test-key&domain=www.acme.it"
        );
    }

    #[test]
    fn build_url_strips_trailing_slash() {
        let t = transport("https://seo.example.com/api///");
        let request = SourceRequest::new(SourceId::Seo, "seo");
        assert_eq!(
            t.build_url(&request).unwrap().as_str(),
            "https://seo.example.com/api/seo?key=test-key"
        );
    }

    #[test]
    fn build_url_encodes_special_characters() {
        let t = transport("https://seo.example.com");
        let request = SourceRequest::new(SourceId::Seo, "seo").param("domain", "rossi & figli");
        let url = t.build_url(&request).unwrap();
        assert!(
            url.as_str().contains("rossi+%26+figli"),
            "query param should be percent-encoded: {url}"
        );
    }

    #[test]
    fn unconfigured_source_is_disabled() {
        let t = transport("https://seo.example.com");
        let request = SourceRequest::new(SourceId::Social, "social");
        assert!(matches!(
            t.build_url(&request),
            Err(SourceError::Disabled {
                source_id: SourceId::Social
            })
        ));
    }

    #[test]
    fn status_classification() {
        assert!(classify_status(SourceId::Seo, StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(classify_status(SourceId::Seo, StatusCode::BAD_GATEWAY).is_transient());
        assert!(!classify_status(SourceId::Seo, StatusCode::UNAUTHORIZED).is_transient());
        assert!(!classify_status(SourceId::Seo, StatusCode::NOT_FOUND).is_transient());
    }
}
