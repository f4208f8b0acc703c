//! Scholar Digest
//!
//! Answers a research question by searching several academic sources at once,
//! ranking the merged papers by citation count and summarizing the most cited
//! one through a locally hosted language model.
//!
//! # Features
//!
//! - **Concurrent fan-out**: CORE, arXiv and Semantic Scholar are queried in parallel
//! - **Partial failure tolerant**: one failing source never sinks the query
//! - **Live progress**: every execution streams human-readable status lines ending in `[DONE]`
//! - **Exports**: results render as plain text, Markdown or JSON
//!
//! # Example
//!
//! ```no_run
//! use scholar_digest::{Config, QueryOrchestrator};
//! use scholar_digest::progress::ProgressReporter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let orchestrator = QueryOrchestrator::new(config)?;
//!
//!     let result = orchestrator.run("graph neural networks", &ProgressReporter::silent()).await?;
//!     println!("{}", result.answer);
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod formatters;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod server;
pub mod sources;
pub mod synthesis;

pub use config::Config;
pub use error::{PipelineError, SourceError, SourceFailure, SynthesisError};
pub use orchestrator::{QueryOrchestrator, QueryState};
