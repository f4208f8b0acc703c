//! Scholar Digest - Entry Point
//!
//! Serves the research query pipeline over HTTP, or runs one query in the terminal.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use scholar_digest::{
    Config, QueryOrchestrator, formatters::ExportFormat, models::SourceId, server::DigestServer,
};

#[derive(Parser, Debug)]
#[command(name = "scholar-digest")]
#[command(about = "Search academic sources and summarize the most cited paper")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// CORE API key (overrides CORE_API_KEY)
    #[arg(long, global = true)]
    core_api_key: Option<String>,

    /// Semantic Scholar API key (overrides SEMANTIC_SCHOLAR_API_KEY)
    #[arg(long, global = true)]
    semantic_scholar_api_key: Option<String>,

    /// Base URL of the Ollama-compatible model server (overrides LLM_URL)
    #[arg(long, global = true)]
    llm_url: Option<String>,

    /// Model name used for summaries (overrides LLM_MODEL)
    #[arg(long, global = true)]
    llm_model: Option<String>,

    /// Comma-separated sources: core, arxiv, semantic_scholar (overrides SOURCES)
    #[arg(long, global = true, value_delimiter = ',')]
    sources: Option<Vec<SourceId>>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// HTTP server port
        #[arg(long, default_value = "8000", env = "PORT")]
        port: u16,

        /// Frontend origin allowed by CORS (overrides FRONTEND_ORIGIN)
        #[arg(long)]
        allowed_origin: Option<String>,
    },
    /// Run a single query and print the summary
    Query {
        /// Research question
        text: String,

        /// Also write the summary to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Export format: text, markdown or json
        #[arg(long, default_value = "text")]
        format: ExportFormat,
    },
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries the summary in query mode
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if json {
        subscriber.with(layer.json()).init();
    } else {
        subscriber.with(layer.compact()).init();
    }
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(key) = &self.core_api_key {
            config.core_api_key = Some(key.clone());
        }
        if let Some(key) = &self.semantic_scholar_api_key {
            config.semantic_scholar_api_key = Some(key.clone());
        }
        if let Some(url) = &self.llm_url {
            config.llm_url.clone_from(url);
        }
        if let Some(model) = &self.llm_model {
            config.llm_model.clone_from(model);
        }
        if let Some(sources) = &self.sources {
            config.sources.clone_from(sources);
        }
        let origin = match &self.command {
            Command::Serve { allowed_origin, .. } => allowed_origin.as_ref(),
            Command::Query { .. } => None,
        };
        if let Some(origin) = origin {
            config.allowed_origin = Some(origin.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting scholar-digest"
    );

    let mut config = Config::from_env()?;
    cli.apply(&mut config);

    let server = DigestServer::new(QueryOrchestrator::new(config)?);

    match cli.command {
        Command::Serve { port, .. } => {
            tracing::info!(port, "Running in HTTP mode");
            server.run_http(port).await?;
        }
        Command::Query {
            text,
            export,
            format,
        } => {
            let export = export.map(|path| (path, format));
            server.run_stdio(&text, export).await?;
        }
    }

    Ok(())
}
