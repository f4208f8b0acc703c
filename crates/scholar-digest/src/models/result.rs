//! Aggregation and terminal query results.

use serde::{Deserialize, Serialize};

use super::{PaperRecord, SourceId};
use crate::error::SourceFailure;

/// Ranked papers from every source that answered, plus the ones that did not.
#[derive(Debug, Default)]
pub struct AggregatedResult {
    /// Papers ordered by descending citation count (stable).
    pub papers: Vec<PaperRecord>,

    /// Sources that failed, in completion order.
    pub failures: Vec<SourceFailure>,
}

impl AggregatedResult {
    /// Providers that failed.
    #[must_use]
    pub fn failed_sources(&self) -> Vec<SourceId> {
        self.failures.iter().map(|f| f.source_id).collect()
    }

    /// Top-ranked paper.
    #[must_use]
    pub fn top(&self) -> Option<&PaperRecord> {
        self.papers.first()
    }
}

/// Terminal artifact of one successful query execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The trimmed query text.
    pub query: String,

    /// Ranked papers.
    pub papers: Vec<PaperRecord>,

    /// Synthesis output.
    pub answer: String,
}
