//! Semantic Scholar Graph API paper search.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{PaperSource, check_status, read_json};
use crate::error::SourceResult;
use crate::models::{PaperRecord, SourceId};

/// Fields requested from `/paper/search`.
const SEARCH_FIELDS: &[&str] = &[
    "title",
    "abstract",
    "authors",
    "citationCount",
    "publicationDate",
    "openAccessPdf",
    "externalIds",
];

/// Semantic Scholar API client.
#[derive(Clone)]
pub struct SemanticScholarClient {
    http: Client,
    graph_api_url: String,
    api_key: Option<String>,
    max_results: u32,
    pub(super) timeout: Duration,
}

impl SemanticScholarClient {
    /// Create a client for the Graph API rooted at `graph_api_url`.
    #[must_use]
    pub fn new(
        http: Client,
        graph_api_url: &str,
        api_key: Option<String>,
        max_results: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            graph_api_url: graph_api_url.trim_end_matches('/').to_string(),
            api_key,
            max_results,
            timeout,
        }
    }

    /// Check if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Debug for SemanticScholarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticScholarClient")
            .field("has_api_key", &self.has_api_key())
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Option<Vec<AuthorRef>>,
    #[serde(default)]
    citation_count: Option<i64>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    open_access_pdf: Option<OpenAccessPdf>,
    #[serde(default)]
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(default, rename = "ArXiv")]
    arxiv: Option<String>,
}

impl Paper {
    fn into_record(self) -> PaperRecord {
        let arxiv_abs = self
            .external_ids
            .as_ref()
            .and_then(|ids| ids.arxiv.as_deref())
            .map(|id| format!("https://arxiv.org/abs/{id}"));
        let pdf = self.open_access_pdf.as_ref().and_then(|p| p.url.as_deref());

        let authors = self
            .authors
            .iter()
            .flatten()
            .filter_map(|a| a.name.as_deref());

        PaperRecord::new(SourceId::SemanticScholar, self.title.as_deref())
            .with_authors(authors)
            .with_abstract(self.abstract_text.as_deref())
            .with_published(self.publication_date.as_deref())
            .with_citations(self.citation_count)
            .with_download_url(pdf.into_iter().chain(arxiv_abs.as_deref()))
    }
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    fn id(&self) -> SourceId {
        SourceId::SemanticScholar
    }

    async fn fetch(&self, query: &str) -> SourceResult<Vec<PaperRecord>> {
        let url = format!("{}/paper/search", self.graph_api_url);

        let params = vec![
            ("query".to_string(), query.to_string()),
            ("limit".to_string(), self.max_results.to_string()),
            ("fields".to_string(), SEARCH_FIELDS.join(",")),
        ];

        let mut request = self.http.get(&url).query(&params).timeout(self.timeout);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = check_status(request.send().await?).await?;
        let result: SearchResult = read_json(response).await?;

        Ok(result.data.into_iter().map(Paper::into_record).collect())
    }
}
