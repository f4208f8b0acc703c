//! arXiv Atom query API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{PaperSource, check_status};
use crate::error::{SourceError, SourceResult};
use crate::models::{PaperRecord, SourceId};

/// arXiv API client.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: Client,
    query_url: String,
    max_results: u32,
    pub(super) timeout: Duration,
}

impl ArxivClient {
    /// Create a client for the arXiv query endpoint (e.g. `http://export.arxiv.org/api/query`).
    #[must_use]
    pub fn new(http: Client, query_url: &str, max_results: u32, timeout: Duration) -> Self {
        Self {
            http,
            query_url: query_url.to_string(),
            max_results,
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@type", default)]
    link_type: Option<String>,
    #[serde(rename = "@title", default)]
    title: Option<String>,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

impl Link {
    fn is_pdf(&self) -> bool {
        self.link_type.as_deref() == Some("application/pdf") || self.title.as_deref() == Some("pdf")
    }
}

impl Entry {
    /// arXiv reports query errors as a single entry under `/api/errors`.
    fn is_error(&self) -> bool {
        self.id.as_deref().is_some_and(|id| id.contains("/api/errors"))
    }

    fn into_record(self) -> PaperRecord {
        let pdf = self
            .links
            .iter()
            .find(|l| l.is_pdf())
            .map(|l| l.href.as_str());
        let alternate = self
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .map(|l| l.href.as_str());

        PaperRecord::new(SourceId::Arxiv, self.title.as_deref())
            .with_authors(self.authors.iter().filter_map(|a| a.name.as_deref()))
            .with_abstract(self.summary.as_deref())
            .with_published(self.published.as_deref())
            .with_download_url(pdf.into_iter().chain(alternate).chain(self.id.as_deref()))
    }
}

/// Parse an Atom feed body into records.
fn parse_feed(body: &str) -> SourceResult<Vec<PaperRecord>> {
    let feed: Feed = quick_xml::de::from_str(body)?;

    if let Some(error) = feed.entries.iter().find(|e| e.is_error()) {
        let message = error
            .summary
            .as_deref()
            .unwrap_or("unknown error")
            .trim()
            .to_string();
        return Err(SourceError::parse(format!("arXiv reported an error: {message}")));
    }

    Ok(feed.entries.into_iter().map(Entry::into_record).collect())
}

#[async_trait]
impl PaperSource for ArxivClient {
    fn id(&self) -> SourceId {
        SourceId::Arxiv
    }

    async fn fetch(&self, query: &str) -> SourceResult<Vec<PaperRecord>> {
        let params = vec![
            ("search_query".to_string(), format!("all:{query}")),
            ("start".to_string(), "0".to_string()),
            ("max_results".to_string(), self.max_results.to_string()),
        ];

        let response = self
            .http
            .get(&self.query_url)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.text().await?;

        parse_feed(&body)
    }
}
