//! Terminal runner for a single query.
//!
//! Status lines go to stderr as they arrive; the summary goes to stdout.

use std::path::PathBuf;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::formatters::{self, ExportFormat};
use crate::orchestrator::QueryOrchestrator;

/// Stream one query to the terminal, then print its result.
pub async fn run_stdio(
    orchestrator: &QueryOrchestrator,
    query: &str,
    export: Option<(PathBuf, ExportFormat)>,
) -> anyhow::Result<()> {
    let mut stderr = tokio::io::stderr();
    let mut stdout = tokio::io::stdout();

    let mut status = orchestrator.start_query(query).await?;
    while let Some(event) = status.next().await {
        stderr.write_all(event.as_line().as_bytes()).await?;
        stderr.write_all(b"\n").await?;
        if event.is_terminal() {
            break;
        }
    }
    stderr.flush().await?;

    let result = orchestrator.fetch_result(query).await?;

    stdout.write_all(result.answer.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    if let Some((path, format)) = export {
        let payload = formatters::render(&result, format);
        tokio::fs::write(&path, &payload.body).await?;
        tracing::info!(path = %path.display(), "Wrote {}", payload.filename);
    }

    Ok(())
}
