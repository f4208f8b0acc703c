//! Markdown export.

use super::{ABSTRACT_EXCERPT_CHARS, excerpt};
use crate::models::{PaperRecord, QueryResult};

/// Format a query result as Markdown.
#[must_use]
pub fn format_markdown(result: &QueryResult) -> String {
    let mut output = format!("# {}\n\n## Summary\n\n{}\n\n", result.query, result.answer);

    if result.papers.is_empty() {
        output.push_str("No papers found.\n");
        return output;
    }

    output.push_str(&format!("## Papers ({} results)\n\n", result.papers.len()));

    for (i, paper) in result.papers.iter().enumerate() {
        output.push_str(&format_paper_markdown(paper, i + 1));
        output.push_str("\n---\n\n");
    }

    output
}

/// Format a single paper as Markdown.
#[must_use]
pub fn format_paper_markdown(paper: &PaperRecord, index: usize) -> String {
    let mut output = format!("### {}. {}\n\n", index, paper.title);

    output.push_str(&format!("**Authors**: {}\n\n", paper.author_names()));

    let meta = [
        format!("**Published**: {}", paper.published_display()),
        format!("**Citations**: {}", paper.citations_display()),
        format!("**Source**: {}", paper.source_id),
    ];
    output.push_str(&format!("{}\n\n", meta.join(" | ")));

    if let Some(url) = &paper.download_url {
        output.push_str(&format!("**PDF**: [{url}]({url})\n\n"));
    }

    if let Some(abs) = &paper.r#abstract {
        output.push_str(&format!("**Abstract**: {}\n", excerpt(abs, ABSTRACT_EXCERPT_CHARS)));
    }

    output
}
