//! Export formatters for a finished query.
//!
//! Each format renders the same content: the query, the synthesis text and the
//! ranked papers, with absent fields shown as `N/A`.

mod json;
mod markdown;
mod text;

use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::QueryResult;

pub use self::json::format_json;
pub use markdown::format_markdown;
pub use text::format_text;

/// Characters of each abstract included in an export.
pub const ABSTRACT_EXCERPT_CHARS: usize = 500;

/// File format for an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Plain text (`summary.txt`).
    #[default]
    Text,
    /// Markdown (`summary.md`).
    Markdown,
    /// Pretty-printed JSON (`summary.json`).
    Json,
}

impl ExportFormat {
    /// Suggested download filename.
    #[must_use]
    pub const fn filename(self) -> &'static str {
        match self {
            Self::Text => "summary.txt",
            Self::Markdown => "summary.md",
            Self::Json => "summary.json",
        }
    }

    /// MIME type of the rendered body.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// A rendered, file-shaped export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    /// Suggested filename.
    pub filename: &'static str,
    /// MIME type.
    pub content_type: &'static str,
    /// File contents.
    pub body: Vec<u8>,
}

impl ExportPayload {
    /// `Content-Disposition` header value for an attachment.
    #[must_use]
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Render `result` in `format`.
#[must_use]
pub fn render(result: &QueryResult, format: ExportFormat) -> ExportPayload {
    let body = match format {
        ExportFormat::Text => format_text(result),
        ExportFormat::Markdown => format_markdown(result),
        ExportFormat::Json => format_json(result),
    };

    ExportPayload {
        filename: format.filename(),
        content_type: format.content_type(),
        body: body.into_bytes(),
    }
}

/// First `max` characters of `text`, with `...` appended when cut.
pub(crate) fn excerpt(text: &str, max: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &text[..idx])),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(
            "md".parse::<ExportFormat>().unwrap(),
            ExportFormat::Markdown
        );
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_default_is_text() {
        let format = ExportFormat::default();
        assert_eq!(format.filename(), "summary.txt");
        assert!(format.content_type().starts_with("text/plain"));
    }

    #[test]
    fn test_content_disposition() {
        let result = QueryResult {
            query: "q".into(),
            papers: vec![],
            answer: "a".into(),
        };
        let payload = render(&result, ExportFormat::Markdown);
        assert_eq!(
            payload.content_disposition(),
            "attachment; filename=\"summary.md\""
        );
    }

    #[test]
    fn test_excerpt_char_boundary() {
        assert_eq!(excerpt("héllo", 2), "hé...");
        assert_eq!(excerpt("short", 10), "short");
    }
}
