//! Concurrent fan-out over every configured source, then merge and rank.

use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{AggregatedResult, PaperRecord};
use crate::progress::ProgressReporter;
use crate::sources::SourceClient;

/// Search every source concurrently and merge the answers.
///
/// One status line is emitted per source as it settles, in completion order.
/// All sources are awaited before ranking. Fails only when every source failed.
pub async fn aggregate(
    query: &str,
    sources: &[SourceClient],
    reporter: &ProgressReporter,
) -> PipelineResult<AggregatedResult> {
    let mut pending: FuturesUnordered<_> = sources
        .iter()
        .enumerate()
        .map(|(slot, source)| async move { (slot, source.id(), source.search(query).await) })
        .collect();

    let mut answered: Vec<Option<Vec<PaperRecord>>> = vec![None; sources.len()];
    let mut failures = Vec::new();

    while let Some((slot, id, outcome)) = pending.next().await {
        match outcome {
            Ok(papers) => {
                reporter
                    .report(format!("Found {} papers from {id}", papers.len()))
                    .await;
                answered[slot] = Some(papers);
            }
            Err(failure) => {
                reporter
                    .report(format!("{id} search failed: {}", failure.error))
                    .await;
                failures.push(failure);
            }
        }
    }

    if answered.iter().all(Option::is_none) {
        return Err(PipelineError::Aggregation { failures });
    }

    let papers = rank(answered.into_iter().flatten().flatten().collect());

    tracing::info!(
        papers = papers.len(),
        failed = failures.len(),
        sources = sources.len(),
        "Aggregation complete"
    );

    Ok(AggregatedResult { papers, failures })
}

/// Stable sort by descending citation count; records without a count go last.
///
/// `papers` must already be in provider-concatenation order, which ties keep.
#[must_use]
pub fn rank(mut papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    papers.sort_by(|a, b| b.citation_count.cmp(&a.citation_count));
    papers
}
