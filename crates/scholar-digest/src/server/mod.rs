//! Caller-facing surfaces.
//!
//! Provides both an HTTP transport (SSE status stream, result retrieval and
//! export) and a stdio runner for one-shot queries from the terminal.
//!
//! ## Stream then fetch
//!
//! The HTTP surface mirrors the orchestrator's two decoupled operations:
//! - `GET /stream?query=` opens the live status stream of a new execution
//! - `POST /analyze` collects that execution's result once `[DONE]` was seen
//! - `POST /download` reruns the query and returns a file

pub mod stdio;
pub mod transport;

use std::net::SocketAddr;

use crate::formatters::ExportFormat;
use crate::orchestrator::QueryOrchestrator;

/// Research query server.
pub struct DigestServer {
    orchestrator: QueryOrchestrator,
}

impl DigestServer {
    /// Create a new server around an orchestrator.
    #[must_use]
    pub const fn new(orchestrator: QueryOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Run one query on stdio, optionally writing an export file.
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure or if the query fails.
    pub async fn run_stdio(
        self,
        query: &str,
        export: Option<(std::path::PathBuf, ExportFormat)>,
    ) -> anyhow::Result<()> {
        tracing::info!("Running query in stdio mode");
        stdio::run_stdio(&self.orchestrator, query, export).await
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        tracing::info!("Starting HTTP server on port {}", port);
        tracing::info!("Configured {} sources", self.orchestrator.sources().len());

        let router = transport::create_router(self.orchestrator);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// Orchestrator behind this server.
    #[must_use]
    pub const fn orchestrator(&self) -> &QueryOrchestrator {
        &self.orchestrator
    }
}

impl std::fmt::Debug for DigestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestServer")
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
