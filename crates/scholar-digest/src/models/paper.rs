//! Normalized paper record shared by all providers.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::SourceId;

/// Title used when a provider returns none.
pub const UNTITLED: &str = "Untitled Paper";

/// Rendering of any absent optional field.
pub const UNAVAILABLE: &str = "N/A";

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = r"^(\d{4})-(\d{2})-(\d{2})";
    Regex::new(pattern).expect("valid date regex")
});

static ARXIV_ABS: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = r"^(https?://(?:export\.)?arxiv\.org)/abs/([^?#]+?)(?:\.pdf)?$";
    Regex::new(pattern).expect("valid arxiv regex")
});

/// An author as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    /// Display name.
    pub name: String,
}

impl AuthorName {
    /// Build an author from a raw provider string, `None` if blank.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        normalize_text(raw).map(|name| Self { name })
    }
}

/// A paper normalized from one provider's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    /// Paper title, never empty.
    pub title: String,

    /// Authors in provider order.
    #[serde(default)]
    pub authors: Vec<AuthorName>,

    /// Publication date.
    #[serde(default)]
    pub published_date: Option<NaiveDate>,

    /// Number of citations, when the provider tracks them.
    #[serde(default)]
    pub citation_count: Option<u64>,

    /// Paper abstract.
    #[serde(default)]
    pub r#abstract: Option<String>,

    /// Full text or PDF link.
    #[serde(default)]
    pub download_url: Option<Url>,

    /// Provider the record came from.
    pub source_id: SourceId,
}

impl PaperRecord {
    /// Create a record with only a title; a blank or missing title becomes [`UNTITLED`].
    #[must_use]
    pub fn new(source_id: SourceId, title: Option<&str>) -> Self {
        Self {
            title: title
                .and_then(normalize_text)
                .unwrap_or_else(|| UNTITLED.to_string()),
            authors: Vec::new(),
            published_date: None,
            citation_count: None,
            r#abstract: None,
            download_url: None,
            source_id,
        }
    }

    /// Set authors from raw names, skipping blanks.
    #[must_use]
    pub fn with_authors<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.authors = names.into_iter().filter_map(AuthorName::parse).collect();
        self
    }

    /// Set the abstract from raw provider text.
    #[must_use]
    pub fn with_abstract(mut self, raw: Option<&str>) -> Self {
        self.r#abstract = raw.and_then(normalize_text);
        self
    }

    /// Set the publication date from raw provider text.
    #[must_use]
    pub fn with_published(mut self, raw: Option<&str>) -> Self {
        self.published_date = raw.and_then(parse_date);
        self
    }

    /// Set the citation count; negative values are treated as unknown.
    #[must_use]
    pub fn with_citations(mut self, count: Option<i64>) -> Self {
        self.citation_count = count.and_then(|c| u64::try_from(c).ok());
        self
    }

    /// Set the download link from the first candidate that parses.
    #[must_use]
    pub fn with_download_url<'a>(mut self, candidates: impl IntoIterator<Item = &'a str>) -> Self {
        self.download_url = candidates.into_iter().find_map(parse_download_url);
        self
    }

    /// Author names as a comma-separated string, or [`UNAVAILABLE`].
    #[must_use]
    pub fn author_names(&self) -> String {
        if self.authors.is_empty() {
            return UNAVAILABLE.to_string();
        }
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Publication date as `YYYY-MM-DD`, or [`UNAVAILABLE`].
    #[must_use]
    pub fn published_display(&self) -> String {
        self.published_date.map_or_else(
            || UNAVAILABLE.to_string(),
            |d| d.format("%Y-%m-%d").to_string(),
        )
    }

    /// Citation count, or [`UNAVAILABLE`].
    #[must_use]
    pub fn citations_display(&self) -> String {
        self.citation_count
            .map_or_else(|| UNAVAILABLE.to_string(), |c| c.to_string())
    }

    /// Download link, or [`UNAVAILABLE`].
    #[must_use]
    pub fn link_display(&self) -> &str {
        self.download_url.as_ref().map_or(UNAVAILABLE, Url::as_str)
    }

    /// Abstract text, or [`UNAVAILABLE`].
    #[must_use]
    pub fn abstract_display(&self) -> &str {
        self.r#abstract.as_deref().unwrap_or(UNAVAILABLE)
    }
}

/// Collapse internal whitespace and trim; `None` when nothing is left.
#[must_use]
pub fn normalize_text(raw: &str) -> Option<String> {
    let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Parse the date part of `YYYY-MM-DD`, RFC 3339 or `YYYY-MM-DDTHH:MM:SS` strings.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let caps = ISO_DATE.captures(raw.trim())?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a download link, rewriting arXiv abstract pages to their PDF.
#[must_use]
pub fn parse_download_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let rewritten = ARXIV_ABS
        .captures(raw)
        .map(|caps| format!("{}/pdf/{}.pdf", &caps[1], &caps[2]));
    let url = Url::parse(rewritten.as_deref().unwrap_or(raw)).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
