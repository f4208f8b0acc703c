//! Paper-metadata source clients.
//!
//! Provides one adapter per external catalog:
//! - CORE (JSON, `apiKey` query parameter)
//! - arXiv (Atom XML, no auth)
//! - Semantic Scholar (JSON, optional `x-api-key` header)
//!
//! The set of providers is closed: [`SourceClient`] has one variant per
//! [`SourceId`] and each variant implements [`PaperSource`]. A provider is added
//! by adding a variant, never by branching on payload shape.
//!
//! No retries happen here. A failed call is reported once and the aggregator
//! carries on with the other providers.

mod arxiv;
mod core_api;
mod semantic_scholar;

pub use arxiv::ArxivClient;
pub use core_api::CoreClient;
pub use semantic_scholar::SemanticScholarClient;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use crate::config::{Config, api};
use crate::error::{SourceError, SourceFailure, SourceResult, body_excerpt};
use crate::models::{PaperRecord, SourceId};

/// Search capability shared by every provider.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Provider identity.
    fn id(&self) -> SourceId;

    /// Fetch and normalize papers for `query`.
    async fn fetch(&self, query: &str) -> SourceResult<Vec<PaperRecord>>;
}

/// One configured provider.
#[derive(Debug, Clone)]
pub enum SourceClient {
    /// CORE v3 works search.
    Core(CoreClient),
    /// arXiv Atom query API.
    Arxiv(ArxivClient),
    /// Semantic Scholar Graph paper search.
    SemanticScholar(SemanticScholarClient),
}

impl SourceClient {
    /// Build the client for `id` on a shared HTTP connection pool.
    #[must_use]
    pub fn from_config(id: SourceId, config: &Config, http: &Client) -> Self {
        let timeout = config.timeout_for(id);
        match id {
            SourceId::Core => Self::Core(CoreClient::new(
                http.clone(),
                &config.core_api_url,
                config.core_api_key.clone(),
                config.max_results,
                timeout,
            )),
            SourceId::Arxiv => Self::Arxiv(ArxivClient::new(
                http.clone(),
                &config.arxiv_api_url,
                config.max_results,
                timeout,
            )),
            SourceId::SemanticScholar => Self::SemanticScholar(SemanticScholarClient::new(
                http.clone(),
                &config.semantic_scholar_api_url,
                config.semantic_scholar_api_key.clone(),
                config.max_results,
                timeout,
            )),
        }
    }

    /// Build every configured provider, in configuration order.
    #[must_use]
    pub fn all_from_config(config: &Config, http: &Client) -> Vec<Self> {
        if config.core_api_key.is_none() && config.sources.contains(&SourceId::Core) {
            tracing::warn!("CORE_API_KEY is not set; CORE requests will likely be rejected");
        }
        config
            .sources
            .iter()
            .map(|id| Self::from_config(*id, config, http))
            .collect()
    }

    fn as_source(&self) -> &dyn PaperSource {
        match self {
            Self::Core(c) => c,
            Self::Arxiv(c) => c,
            Self::SemanticScholar(c) => c,
        }
    }

    /// Provider identity.
    #[must_use]
    pub fn id(&self) -> SourceId {
        self.as_source().id()
    }

    /// Per-call timeout for this provider.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        match self {
            Self::Core(c) => c.timeout,
            Self::Arxiv(c) => c.timeout,
            Self::SemanticScholar(c) => c.timeout,
        }
    }

    /// Search this provider.
    ///
    /// Never panics and never escapes as a pipeline error: every failure mode,
    /// including the timeout, comes back tagged with the provider identity.
    pub async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, SourceFailure> {
        let id = self.id();
        let timeout = self.timeout();
        let started = Instant::now();

        let fetch = self.as_source().fetch(query);
        let outcome = match tokio::time::timeout(timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(timeout)),
        };

        match outcome {
            Ok(papers) => {
                tracing::debug!(
                    source = %id,
                    count = papers.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Source search completed"
                );
                Ok(papers)
            }
            Err(error) => {
                let error = if error.is_timeout() {
                    SourceError::Timeout(timeout)
                } else {
                    error
                };
                tracing::warn!(source = %id, error = %error, "Source search failed");
                Err(SourceFailure::new(id, error))
            }
        }
    }
}

/// Build the HTTP connection pool shared by all providers.
///
/// # Errors
///
/// Returns error if the TLS backend cannot be initialized.
pub fn build_http_client(config: &Config) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(api::MAX_KEEPALIVE)
        .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
        .gzip(true)
        .build()
}

/// Map non-success statuses to [`SourceError`].
pub(crate) async fn check_status(response: reqwest::Response) -> SourceResult<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            Err(SourceError::rate_limited(retry_after))
        }
        code => {
            let message = body_excerpt(&response.text().await.unwrap_or_default());
            Err(match code {
                401 | 403 => SourceError::Unauthorized {
                    status: code,
                    message,
                },
                500..=599 => SourceError::Server {
                    status: code,
                    message,
                },
                _ => SourceError::UnexpectedStatus {
                    status: code,
                    message,
                },
            })
        }
    }
}

/// Read a JSON body, classifying decode problems as [`SourceError::Parse`].
pub(crate) async fn read_json<T>(response: reqwest::Response) -> SourceResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(SourceError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_from_config_preserves_order() {
        let mut config = Config::for_testing("http://127.0.0.1:9");
        config.sources = vec![SourceId::SemanticScholar, SourceId::Core];
        let http = build_http_client(&config).unwrap();

        let ids: Vec<SourceId> = SourceClient::all_from_config(&config, &http)
            .iter()
            .map(SourceClient::id)
            .collect();
        assert_eq!(ids, vec![SourceId::SemanticScholar, SourceId::Core]);
    }

    #[test]
    fn test_timeout_comes_from_config() {
        let mut config = Config::default();
        config.source_timeout = None;
        let http = build_http_client(&config).unwrap();
        let client = SourceClient::from_config(SourceId::Arxiv, &config, &http);
        assert_eq!(client.timeout(), api::ARXIV_TIMEOUT);
    }
}
