//! CORE v3 works search.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{PaperSource, check_status, read_json};
use crate::error::{SourceError, SourceResult};
use crate::models::{PaperRecord, SourceId};

/// CORE API client.
#[derive(Clone)]
pub struct CoreClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_results: u32,
    pub(super) timeout: Duration,
}

impl CoreClient {
    /// Create a client for the CORE API rooted at `base_url` (e.g. `https://api.core.ac.uk/v3`).
    #[must_use]
    pub fn new(
        http: Client,
        base_url: &str,
        api_key: Option<String>,
        max_results: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_results,
            timeout,
        }
    }
}

impl std::fmt::Debug for CoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<Work>>,
    #[serde(default)]
    data: Option<Vec<Work>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Work {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Option<Vec<Author>>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    citation_count: Option<i64>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    links: Option<Vec<Link>>,
    #[serde(default)]
    source_fulltext_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(default, rename = "type")]
    link_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl Work {
    fn into_record(self) -> PaperRecord {
        let download_links = self
            .links
            .iter()
            .flatten()
            .filter(|l| l.link_type.as_deref() == Some("download"))
            .filter_map(|l| l.url.as_deref());

        let candidates: Vec<&str> = self
            .download_url
            .as_deref()
            .into_iter()
            .chain(download_links)
            .chain(self.source_fulltext_urls.iter().flatten().map(String::as_str))
            .collect();

        let authors = self
            .authors
            .iter()
            .flatten()
            .filter_map(|a| a.name.as_deref());

        PaperRecord::new(SourceId::Core, self.title.as_deref())
            .with_authors(authors)
            .with_abstract(self.abstract_text.as_deref())
            .with_published(self.published_date.as_deref())
            .with_citations(self.citation_count)
            .with_download_url(candidates)
    }
}

#[async_trait]
impl PaperSource for CoreClient {
    fn id(&self) -> SourceId {
        SourceId::Core
    }

    async fn fetch(&self, query: &str) -> SourceResult<Vec<PaperRecord>> {
        let url = format!("{}/search/works/", self.base_url);

        let mut params = vec![
            ("q".to_string(), query.to_string()),
            ("limit".to_string(), self.max_results.to_string()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("apiKey".to_string(), key.clone()));
        }

        let response = self
            .http
            .get(&url)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: SearchResponse = read_json(response).await?;

        let works = body
            .results
            .or(body.data)
            .ok_or_else(|| SourceError::parse("CORE response has neither `results` nor `data`"))?;

        Ok(works.into_iter().map(Work::into_record).collect())
    }
}
