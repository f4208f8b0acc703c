//! Plain text export.

use super::{ABSTRACT_EXCERPT_CHARS, excerpt};
use crate::models::QueryResult;

/// Format a query result as plain text.
#[must_use]
pub fn format_text(result: &QueryResult) -> String {
    let mut output = format!("Query: {}\n\nSummary:\n{}\n\n", result.query, result.answer);

    for (i, paper) in result.papers.iter().enumerate() {
        output.push_str(&format!("\n--- Paper {} ---\n", i + 1));
        output.push_str(&format!("Title: {}\n", paper.title));
        output.push_str(&format!("Authors: {}\n", paper.author_names()));
        output.push_str(&format!("Published: {}\n", paper.published_display()));
        output.push_str(&format!("Citations: {}\n", paper.citations_display()));
        output.push_str(&format!("Link: {}\n", paper.link_display()));
        output.push_str(&format!(
            "Abstract: {}\n",
            excerpt(paper.abstract_display(), ABSTRACT_EXCERPT_CHARS)
        ));
    }

    output
}
