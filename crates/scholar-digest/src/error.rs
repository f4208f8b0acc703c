//! Error types for the research query pipeline.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Per-source errors are recovered inside the aggregator; only [`PipelineError`]
//! crosses the orchestrator boundary.

use std::time::Duration;

use crate::formatters::excerpt;
use crate::models::{SourceId, normalize_text};
use crate::orchestrator::QueryState;

/// Longest slice of an upstream response body kept in an error message.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors from a single paper-metadata provider.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Credentials missing or rejected (401/403 response)
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// Rate limited by the provider (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before resubmitting
        retry_after: Duration,
    },

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// Payload could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl SourceError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited {
            retry_after: Duration::from_secs(seconds),
        }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if the provider did not answer in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("JSON: {err}"))
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Parse(format!("XML: {err}"))
    }
}

/// A failed source invocation, tagged with the provider that produced it.
#[derive(thiserror::Error, Debug)]
#[error("{source_id} failed: {error}")]
pub struct SourceFailure {
    /// Provider that failed.
    pub source_id: SourceId,
    /// Underlying cause.
    pub error: SourceError,
}

impl SourceFailure {
    /// Tag an error with its provider.
    #[must_use]
    pub const fn new(source_id: SourceId, error: SourceError) -> Self {
        Self { source_id, error }
    }
}

/// Errors from the text-generation capability.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generation did not finish in time
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    /// Non-success response from the model endpoint
    #[error("Model endpoint returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// Response body did not match the generate contract
    #[error("Failed to parse model response: {0}")]
    Parse(#[from] serde_json::Error),

    /// No papers to summarize
    #[error("No papers to summarize")]
    EmptyInput,

    /// The model answered with blank text
    #[error("Model returned an empty summary")]
    EmptyResponse,
}

/// Pipeline-level errors surfaced by the orchestrator.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The query was rejected before any work started
    #[error("Validation error: {message}")]
    Validation {
        /// Validation error message
        message: String,
    },

    /// Every configured source failed
    #[error("All {} sources failed", failures.len())]
    Aggregation {
        /// One entry per configured source
        failures: Vec<SourceFailure>,
    },

    /// Sources answered but none returned a paper
    #[error("No papers found for this query")]
    NoPapers,

    /// Text generation failed after papers were found
    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// The execution for this query has not reached a terminal state yet
    #[error("Result not ready (query is {state})")]
    NotReady {
        /// State the execution is currently in
        state: QueryState,
    },
}

impl PipelineError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Providers that failed, if this is an aggregation failure.
    #[must_use]
    pub fn failed_sources(&self) -> Vec<SourceId> {
        match self {
            Self::Aggregation { failures } => failures.iter().map(|f| f.source_id).collect(),
            _ => Vec::new(),
        }
    }

    /// Convert to a user-friendly message for the status stream and HTTP bodies.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Validation { message } => format!("Invalid request: {message}"),
            Self::Aggregation { failures } => {
                let causes: Vec<String> = failures.iter().map(ToString::to_string).collect();
                format!("No source could be reached ({})", causes.join("; "))
            }
            Self::Synthesis(SynthesisError::Timeout(after)) => {
                format!("The summary model did not answer within {after:?}")
            }
            Self::NotReady { state } => {
                format!("Query is still {state}; wait for [DONE] before fetching")
            }
            _ => self.to_string(),
        }
    }
}

/// Collapse an upstream response body into one line of at most
/// [`MAX_ERROR_BODY_CHARS`] characters, marking a cut with `...`.
#[must_use]
pub fn body_excerpt(body: &str) -> String {
    let Some(text) = normalize_text(body) else {
        return String::new();
    };
    excerpt(&text, MAX_ERROR_BODY_CHARS).into_owned()
}

/// Result type alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
