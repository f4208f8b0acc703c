//! End-to-end orchestrator tests against mocked providers and a mocked model.
//!
//! Status lines from concurrent sources arrive in completion order, so these
//! tests only assert on lines whose position is fixed.

use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{any, body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scholar_digest::config::Config;
use scholar_digest::error::{PipelineError, SynthesisError};
use scholar_digest::formatters::ExportFormat;
use scholar_digest::models::SourceId;
use scholar_digest::orchestrator::{QueryOrchestrator, QueryState};
use scholar_digest::progress::{DONE_MARKER, ProgressReporter, StatusStream};

const QUERY: &str = "graph neural networks";
const SUMMARY: &str = "GCNs propagate node features over normalized adjacency.";

fn orchestrator(config: Config) -> QueryOrchestrator {
    QueryOrchestrator::new(config).unwrap()
}

/// CORE and Semantic Scholar only; arXiv is covered by the source tests.
fn two_source_config(mock_server: &MockServer) -> Config {
    let mut config = Config::for_testing(&mock_server.uri());
    config.sources = vec![SourceId::Core, SourceId::SemanticScholar];
    config
}

async fn mount_sources(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/core/v3/search/works/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "title": "Graph Convolutional Networks",
                    "authors": [{"name": "Thomas Kipf"}],
                    "citationCount": 20000,
                    "abstract": "We present a scalable approach."
                },
                {"title": "Obscure Graph Note", "citationCount": null}
            ]
        })))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"paperId": "gat", "title": "Graph Attention Networks", "citationCount": 15000}
            ]
        })))
        .mount(mock_server)
        .await;
}

async fn mount_failing_sources(mock_server: &MockServer) {
    for route in ["/core/v3/search/works/", "/graph/v1/paper/search"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(500))
            .mount(mock_server)
            .await;
    }
}

fn llm_mock(response: ResponseTemplate) -> Mock {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(response)
}

fn llm_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({"model": "test-model", "response": SUMMARY, "done": true}))
}

async fn drain(stream: StatusStream) -> Vec<String> {
    stream.map(|e| e.as_line().to_string()).collect().await
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_stream_then_fetch() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "test-model", "stream": false})))
        .and(body_string_contains("Title: Graph Convolutional Networks"))
        .respond_with(llm_ok())
        .expect(1)
        .mount(&mock_server)
        .await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let stream = assert_ok!(orchestrator.start_query(QUERY).await);
    let lines = drain(stream).await;

    assert_eq!(
        lines.first().map(String::as_str),
        Some("Searching 2 sources for: graph neural networks")
    );
    assert_eq!(lines.last().map(String::as_str), Some(DONE_MARKER));
    assert_eq!(lines.iter().filter(|l| *l == DONE_MARKER).count(), 1);
    for expected in [
        "Found 2 papers from CORE",
        "Found 1 papers from Semantic Scholar",
        "Ranked 3 papers from 2 of 2 sources",
        "Summarizing top paper: Graph Convolutional Networks",
    ] {
        assert!(
            lines.iter().any(|l| l == expected),
            "missing status line: {expected}"
        );
    }
    assert_eq!(lines[lines.len() - 2], "Analysis complete.");

    let state = orchestrator.execution_state(QUERY).await;
    assert_eq!(state, Some(QueryState::Completed));

    let result = assert_ok!(orchestrator.fetch_result(QUERY).await);
    assert_eq!(result.query, QUERY);
    assert_eq!(result.answer, SUMMARY);

    let titles: Vec<&str> = result.papers.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Graph Convolutional Networks",
            "Graph Attention Networks",
            "Obscure Graph Note",
        ]
    );

    // Outcome is handed out once
    assert_eq!(orchestrator.execution_state(QUERY).await, None);
}

#[tokio::test]
async fn test_query_is_trimmed_for_lookup() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok()).expect(1).mount(&mock_server).await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let stream = orchestrator
        .start_query("  graph neural networks \n")
        .await
        .unwrap();
    drain(stream).await;

    let result = orchestrator.fetch_result(QUERY).await.unwrap();
    assert_eq!(result.query, QUERY);
}

#[tokio::test]
async fn test_fetch_without_stream_runs_pipeline() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok()).expect(1).mount(&mock_server).await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let result = orchestrator.fetch_result(QUERY).await.unwrap();
    assert_eq!(result.papers.len(), 3);
    assert_eq!(orchestrator.execution_state(QUERY).await, None);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_blank_query_makes_no_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let orchestrator = orchestrator(Config::for_testing(&mock_server.uri()));

    let err = assert_err!(orchestrator.start_query("   ").await);
    assert!(matches!(err, PipelineError::Validation { .. }));

    let err = assert_err!(orchestrator.fetch_result("").await);
    assert!(matches!(err, PipelineError::Validation { .. }));

    let err = assert_err!(orchestrator.export_result("\t", ExportFormat::Text).await);
    assert!(matches!(err, PipelineError::Validation { .. }));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_all_sources_failing_skips_synthesis() {
    let mock_server = MockServer::start().await;
    mount_failing_sources(&mock_server).await;
    llm_mock(llm_ok()).expect(0).mount(&mock_server).await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let lines = drain(orchestrator.start_query(QUERY).await.unwrap()).await;
    assert_eq!(lines.last().map(String::as_str), Some(DONE_MARKER));
    let failure = &lines[lines.len() - 2];
    assert!(failure.starts_with("Query failed: No source could be reached"));

    let state = orchestrator.execution_state(QUERY).await;
    assert_eq!(state, Some(QueryState::Failed));

    let err = orchestrator.fetch_result(QUERY).await.unwrap_err();
    let mut failed = err.failed_sources();
    failed.sort();
    assert_eq!(failed, vec![SourceId::Core, SourceId::SemanticScholar]);
}

#[tokio::test]
async fn test_no_papers_is_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/core/v3/search/works/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    llm_mock(llm_ok()).expect(0).mount(&mock_server).await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let silent = ProgressReporter::silent();
    let err = orchestrator.run(QUERY, &silent).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoPapers));
}

#[tokio::test]
async fn test_synthesis_timeout() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok().set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = two_source_config(&mock_server);
    config.synthesis_timeout = Duration::from_millis(300);
    let orchestrator = orchestrator(config);

    let silent = ProgressReporter::silent();
    let err = orchestrator.run(QUERY, &silent).await.unwrap_err();
    let timed_out = matches!(err, PipelineError::Synthesis(SynthesisError::Timeout(_)));
    assert!(timed_out, "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_synthesis_timeout_fails_streamed_execution() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok().set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = two_source_config(&mock_server);
    config.synthesis_timeout = Duration::from_millis(300);
    let orchestrator = orchestrator(config);

    let lines = drain(orchestrator.start_query(QUERY).await.unwrap()).await;
    assert_eq!(lines.last().map(String::as_str), Some(DONE_MARKER));
    let failure = &lines[lines.len() - 2];
    assert!(failure.starts_with("Query failed: The summary model"));

    let state = orchestrator.execution_state(QUERY).await;
    assert_eq!(state, Some(QueryState::Failed));

    let err = assert_err!(orchestrator.fetch_result(QUERY).await);
    let timed_out = matches!(err, PipelineError::Synthesis(SynthesisError::Timeout(_)));
    assert!(timed_out, "unexpected error: {err:?}");
    assert_eq!(orchestrator.execution_state(QUERY).await, None);
}

#[tokio::test]
async fn test_blank_model_answer_is_failure() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(ResponseTemplate::new(200).set_body_json(json!({"response": "   "})))
        .mount(&mock_server)
        .await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let lines = drain(orchestrator.start_query(QUERY).await.unwrap()).await;
    assert_eq!(lines.last().map(String::as_str), Some(DONE_MARKER));

    let err = orchestrator.fetch_result(QUERY).await.unwrap_err();
    let blank = matches!(err, PipelineError::Synthesis(SynthesisError::EmptyResponse));
    assert!(blank, "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_model_error_status_is_failure() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(ResponseTemplate::new(404).set_body_string("model 'test-model' not found"))
        .mount(&mock_server)
        .await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let silent = ProgressReporter::silent();
    let err = orchestrator.run(QUERY, &silent).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Synthesis(SynthesisError::Status { status: 404, .. })
    ));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_fetch_before_done_is_not_ready() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok().set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let stream = orchestrator.start_query(QUERY).await.unwrap();

    let err = orchestrator.fetch_result(QUERY).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotReady { .. }));

    drain(stream).await;
    let result = orchestrator.fetch_result(QUERY).await.unwrap();
    assert_eq!(result.answer, SUMMARY);
}

#[tokio::test]
async fn test_repeated_query_runs_independently() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok()).expect(2).mount(&mock_server).await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    for _ in 0..2 {
        let lines = drain(orchestrator.start_query(QUERY).await.unwrap()).await;
        assert_eq!(lines.last().map(String::as_str), Some(DONE_MARKER));

        let result = orchestrator.fetch_result(QUERY).await.unwrap();
        assert_eq!(result.answer, SUMMARY);
    }
}

#[tokio::test]
async fn test_dropping_stream_abandons_execution() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok().set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    let mut stream = orchestrator.start_query(QUERY).await.unwrap();
    let first = stream.next().await.unwrap();
    assert!(first.as_line().starts_with("Searching"));
    drop(stream);

    let abandoned = tokio::time::timeout(Duration::from_secs(2), async {
        while orchestrator.execution_state(QUERY).await.is_some() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(
        abandoned.is_ok(),
        "execution should be discarded after disconnect"
    );
}

#[tokio::test]
async fn test_unfetched_executions_expire() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok()).expect(2).mount(&mock_server).await;

    let mut config = two_source_config(&mock_server);
    config.result_ttl = Duration::from_millis(200);
    let orchestrator = orchestrator(config);

    let queries = [QUERY, "graph attention networks"];
    for query in queries {
        drain(orchestrator.start_query(query).await.unwrap()).await;
        let state = orchestrator.execution_state(query).await;
        assert_eq!(state, Some(QueryState::Completed));
    }

    tokio::time::sleep(Duration::from_millis(700)).await;

    for query in queries {
        assert_eq!(orchestrator.execution_state(query).await, None);
    }
}

#[tokio::test]
async fn test_expiry_keeps_newer_execution() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok()).up_to_n_times(1).mount(&mock_server).await;
    llm_mock(llm_ok().set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = two_source_config(&mock_server);
    config.result_ttl = Duration::from_millis(200);
    let orchestrator = orchestrator(config);

    drain(orchestrator.start_query(QUERY).await.unwrap()).await;
    let _newer = orchestrator.start_query(QUERY).await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    let state = orchestrator.execution_state(QUERY).await;
    assert_eq!(state, Some(QueryState::Summarizing));
}

#[tokio::test]
async fn test_export_reruns_pipeline() {
    let mock_server = MockServer::start().await;
    mount_sources(&mock_server).await;
    llm_mock(llm_ok()).expect(2).mount(&mock_server).await;

    let orchestrator = orchestrator(two_source_config(&mock_server));

    orchestrator.fetch_result(QUERY).await.unwrap();
    let payload = orchestrator
        .export_result(QUERY, ExportFormat::Text)
        .await
        .unwrap();

    assert_eq!(payload.filename, "summary.txt");
    assert_eq!(
        payload.content_disposition(),
        "attachment; filename=\"summary.txt\""
    );

    let body = String::from_utf8(payload.body).unwrap();
    assert!(body.starts_with("Query: graph neural networks\n\nSummary:\n"));
    assert!(body.contains(SUMMARY));
    assert!(body.contains("--- Paper 1 ---\nTitle: Graph Convolutional Networks"));
    assert!(body.contains("--- Paper 3 ---\nTitle: Obscure Graph Note"));
}
