//! Query orchestrator: owns the lifecycle of every query execution.
//!
//! Two decoupled operations share per-execution state keyed by the query text:
//! - [`QueryOrchestrator::start_query`] spawns an execution and returns its
//!   live [`StatusStream`];
//! - [`QueryOrchestrator::fetch_result`] hands out the terminal outcome once.
//!
//! Fetching before the stream reached `[DONE]` is valid and yields
//! [`PipelineError::NotReady`]. Fetching with no execution on record runs the
//! pipeline without a stream. [`QueryOrchestrator::export_result`] always runs
//! the pipeline again; nothing is cached across operations. A finished
//! execution that is never fetched is dropped after `Config::result_ttl`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use crate::aggregator::aggregate;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::formatters::{self, ExportFormat, ExportPayload};
use crate::models::QueryResult;
use crate::progress::{self, ProgressReporter, StatusStream};
use crate::sources::{SourceClient, build_http_client};
use crate::synthesis::SynthesisEngine;

/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 500;

/// Lifecycle of one query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryState {
    Started,
    Fetching,
    Summarizing,
    Completed,
    Failed,
}

impl QueryState {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Started, Self::Fetching)
                | (Self::Fetching, Self::Summarizing | Self::Failed)
                | (Self::Summarizing, Self::Completed | Self::Failed)
        )
    }

    /// Completed and Failed accept no further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Started => "started",
            Self::Fetching => "fetching",
            Self::Summarizing => "summarizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Trim and check a raw query.
pub fn validate_query(raw: &str) -> PipelineResult<String> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(PipelineError::validation("query cannot be empty"));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(PipelineError::validation(format!(
            "query must be at most {MAX_QUERY_CHARS} characters"
        )));
    }
    Ok(query.to_string())
}

/// State of one streamed execution.
struct Execution {
    id: Uuid,
    state: QueryState,
    outcome: Option<PipelineResult<QueryResult>>,
}

struct Inner {
    config: Config,
    sources: Vec<SourceClient>,
    engine: SynthesisEngine,
    executions: RwLock<HashMap<String, Execution>>,
}

/// Top-level coordinator for research queries.
#[derive(Clone)]
pub struct QueryOrchestrator {
    inner: Arc<Inner>,
}

impl QueryOrchestrator {
    /// Build the orchestrator and its clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be initialized.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = build_http_client(&config)?;
        let sources = SourceClient::all_from_config(&config, &http);
        let engine = SynthesisEngine::new(&config, http);
        Ok(Self::from_parts(config, sources, engine))
    }

    /// Assemble an orchestrator from prebuilt clients.
    #[must_use]
    pub fn from_parts(config: Config, sources: Vec<SourceClient>, engine: SynthesisEngine) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sources,
                engine,
                executions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Configuration this orchestrator was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Configured sources, in merge order.
    #[must_use]
    pub fn sources(&self) -> &[SourceClient] {
        &self.inner.sources
    }

    /// Start a new execution and return its live status stream.
    ///
    /// A query already on record is replaced; the older execution keeps
    /// streaming to its own consumer but its outcome is never stored.
    /// Dropping the stream abandons the execution.
    pub async fn start_query(&self, raw: &str) -> PipelineResult<StatusStream> {
        let query = validate_query(raw)?;
        let (reporter, stream) = progress::channel();
        let id = Uuid::new_v4();

        let execution = Execution {
            id,
            state: QueryState::Started,
            outcome: None,
        };
        let replaced = {
            let mut executions = self.inner.executions.write().await;
            executions.insert(query.clone(), execution)
        };
        if let Some(previous) = replaced {
            tracing::debug!(
                previous = %previous.id,
                "Replacing earlier execution of the same query"
            );
        }

        let span = tracing::info_span!("query", %id, query = %query);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.drive(id, query, reporter).instrument(span));

        Ok(stream)
    }

    /// Take the outcome of the execution recorded for `raw`.
    ///
    /// Returns [`PipelineError::NotReady`] while that execution is running. With
    /// no execution on record, runs the full pipeline and returns its outcome.
    pub async fn fetch_result(&self, raw: &str) -> PipelineResult<QueryResult> {
        let query = validate_query(raw)?;

        let ready = {
            let mut executions = self.inner.executions.write().await;
            let running = executions
                .get(&query)
                .filter(|exec| exec.outcome.is_none())
                .map(|exec| exec.state);
            if let Some(state) = running {
                return Err(PipelineError::NotReady { state });
            }
            executions.remove(&query).and_then(|exec| exec.outcome)
        };

        match ready {
            Some(outcome) => outcome,
            None => {
                tracing::info!(query = %query, "No execution on record, running without stream");
                let silent = ProgressReporter::silent();
                self.inner.execute(None, &query, &silent).await
            }
        }
    }

    /// Run the pipeline once more and render the summary as a downloadable file.
    pub async fn export_result(
        &self,
        raw: &str,
        format: ExportFormat,
    ) -> PipelineResult<ExportPayload> {
        let query = validate_query(raw)?;
        let silent = ProgressReporter::silent();
        let result = self.inner.execute(None, &query, &silent).await?;
        Ok(formatters::render(&result, format))
    }

    /// Run the pipeline to completion without recording an execution.
    pub async fn run(&self, raw: &str, reporter: &ProgressReporter) -> PipelineResult<QueryResult> {
        let query = validate_query(raw)?;
        self.inner.execute(None, &query, reporter).await
    }

    /// State of the execution on record for `raw`, if any.
    pub async fn execution_state(&self, raw: &str) -> Option<QueryState> {
        let query = raw.trim();
        self.inner
            .executions
            .read()
            .await
            .get(query)
            .map(|exec| exec.state)
    }
}

impl fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("sources", &self.inner.sources.len())
            .field("model", &self.inner.engine.model_name())
            .finish()
    }
}

impl Inner {
    /// Drive one streamed execution to a terminal state, or abandon it when
    /// the consumer goes away.
    async fn drive(self: Arc<Self>, id: Uuid, query: String, reporter: ProgressReporter) {
        let outcome = tokio::select! {
            outcome = self.execute(Some(id), &query, &reporter) => outcome,
            () = reporter.cancelled() => {
                tracing::info!("Caller disconnected, abandoning query");
                self.discard(id, &query).await;
                return;
            }
        };

        if let Err(ref e) = outcome {
            reporter
                .report(format!("Query failed: {}", e.to_user_message()))
                .await;
        }
        self.complete(id, &query, outcome).await;
        reporter.finish().await;
        self.expire_later(id, query);
    }

    /// Drop the execution if it is still unfetched once the retention period ends.
    fn expire_later(self: Arc<Self>, id: Uuid, query: String) {
        let ttl = self.config.result_ttl;
        tokio::spawn(
            async move {
                tokio::time::sleep(ttl).await;
                if self.discard(id, &query).await {
                    tracing::debug!(?ttl, "Expired unfetched execution");
                }
            }
            .in_current_span(),
        );
    }

    /// The pipeline proper: fetch, rank, summarize.
    async fn execute(
        &self,
        slot: Option<Uuid>,
        query: &str,
        reporter: &ProgressReporter,
    ) -> PipelineResult<QueryResult> {
        self.transition(slot, query, QueryState::Fetching).await;
        reporter
            .report(format!("Searching {} sources for: {query}", self.sources.len()))
            .await;

        let aggregated = aggregate(query, &self.sources, reporter).await?;
        let top = aggregated.top().ok_or(PipelineError::NoPapers)?;

        reporter
            .report(format!(
                "Ranked {} papers from {} of {} sources",
                aggregated.papers.len(),
                self.sources.len() - aggregated.failures.len(),
                self.sources.len()
            ))
            .await;

        self.transition(slot, query, QueryState::Summarizing).await;
        reporter
            .report(format!("Summarizing top paper: {}", top.title))
            .await;

        let answer = self.engine.summarize(&aggregated.papers).await?;
        reporter.report("Summary generated").await;
        reporter.report("Analysis complete.").await;

        tracing::info!(papers = aggregated.papers.len(), "Query completed");

        Ok(QueryResult {
            query: query.to_string(),
            papers: aggregated.papers,
            answer,
        })
    }

    async fn transition(&self, slot: Option<Uuid>, query: &str, next: QueryState) {
        tracing::debug!(state = %next, "Query state transition");

        let Some(id) = slot else { return };
        let mut executions = self.executions.write().await;
        if let Some(exec) = executions.get_mut(query).filter(|exec| exec.id == id) {
            debug_assert!(
                exec.state.can_transition_to(next),
                "illegal transition {} -> {}",
                exec.state,
                next
            );
            exec.state = next;
        }
    }

    async fn complete(&self, id: Uuid, query: &str, outcome: PipelineResult<QueryResult>) {
        let state = if outcome.is_ok() {
            QueryState::Completed
        } else {
            QueryState::Failed
        };
        if let Err(ref e) = outcome {
            tracing::warn!(error = %e, "Query failed");
        }

        let mut executions = self.executions.write().await;
        match executions.get_mut(query) {
            Some(exec) if exec.id == id => {
                exec.state = state;
                exec.outcome = Some(outcome);
            }
            _ => tracing::debug!("Execution superseded, dropping outcome"),
        }
    }

    /// Remove the execution for `query` if it is still the one identified by `id`.
    async fn discard(&self, id: Uuid, query: &str) -> bool {
        let mut executions = self.executions.write().await;
        let owned = executions.get(query).is_some_and(|exec| exec.id == id);
        if owned {
            executions.remove(query);
        }
        owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank() {
        assert!(matches!(validate_query(""), Err(PipelineError::Validation { .. })));
        assert!(matches!(
            validate_query(" \t\n "),
            Err(PipelineError::Validation { .. })
        ));
    }

    #[test]
    fn test_validate_trims() {
        assert_eq!(
            validate_query("  graph neural networks ").unwrap(),
            "graph neural networks"
        );
    }

    #[test]
    fn test_validate_rejects_overlong() {
        let long = "a".repeat(MAX_QUERY_CHARS + 1);
        assert!(validate_query(&long).is_err());
        assert!(validate_query(&"a".repeat(MAX_QUERY_CHARS)).is_ok());
    }

    #[test]
    fn test_happy_path_transitions() {
        use QueryState::*;
        assert!(Started.can_transition_to(Fetching));
        assert!(Fetching.can_transition_to(Summarizing));
        assert!(Summarizing.can_transition_to(Completed));
    }

    #[test]
    fn test_failure_transitions() {
        use QueryState::*;
        assert!(Fetching.can_transition_to(Failed));
        assert!(Summarizing.can_transition_to(Failed));
        assert!(!Started.can_transition_to(Summarizing));
        assert!(!Fetching.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        use QueryState::*;
        for next in [Started, Fetching, Summarizing, Completed, Failed] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(Completed.is_terminal() && Failed.is_terminal());
        assert!(!Summarizing.is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(QueryState::Summarizing.to_string(), "summarizing");
    }
}
