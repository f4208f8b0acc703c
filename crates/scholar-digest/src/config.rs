//! Configuration for the research query pipeline.
//!
//! Built once at process start and handed to [`crate::QueryOrchestrator::new`];
//! nothing below the orchestrator reads the environment.

use std::time::Duration;

use crate::models::SourceId;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// CORE v3 API endpoint.
    pub const CORE_API: &str = "https://api.core.ac.uk/v3";

    /// arXiv Atom query endpoint.
    pub const ARXIV_API: &str = "http://export.arxiv.org/api/query";

    /// Semantic Scholar Graph API endpoint.
    pub const SEMANTIC_SCHOLAR_API: &str = "https://api.semanticscholar.org/graph/v1";

    /// Local Ollama server.
    pub const LLM_URL: &str = "http://localhost:11434";

    /// Model used for summaries.
    pub const LLM_MODEL: &str = "llama3";

    /// CORE request timeout.
    pub const CORE_TIMEOUT: Duration = Duration::from_secs(10);

    /// arXiv request timeout (the export API is slow under load).
    pub const ARXIV_TIMEOUT: Duration = Duration::from_secs(15);

    /// Semantic Scholar request timeout.
    pub const SEMANTIC_SCHOLAR_TIMEOUT: Duration = Duration::from_secs(10);

    /// Summary generation timeout.
    pub const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(120);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Papers requested from each provider.
    pub const MAX_RESULTS: u32 = 5;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);

    /// Concurrent HTTP requests accepted by the server.
    pub const MAX_CONCURRENT_REQUESTS: usize = 64;

    /// How long a finished execution waits to be fetched before it is dropped.
    pub const RESULT_TTL: Duration = Duration::from_secs(600);
}

/// Pipeline configuration.
#[derive(Clone)]
pub struct Config {
    /// CORE API key (sent as `apiKey`).
    pub core_api_key: Option<String>,

    /// Semantic Scholar API key (sent as `x-api-key`, optional).
    pub semantic_scholar_api_key: Option<String>,

    /// Base URL for CORE (for testing with mock servers).
    pub core_api_url: String,

    /// arXiv query URL.
    pub arxiv_api_url: String,

    /// Base URL for the Semantic Scholar Graph API.
    pub semantic_scholar_api_url: String,

    /// Providers queried for every request, in merge order.
    pub sources: Vec<SourceId>,

    /// Overrides every provider's own timeout when set.
    pub source_timeout: Option<Duration>,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Papers requested from each provider.
    pub max_results: u32,

    /// Base URL of the Ollama-compatible generate endpoint.
    pub llm_url: String,

    /// Model identifier passed to the generate endpoint.
    pub llm_model: String,

    /// Summary generation timeout.
    pub synthesis_timeout: Duration,

    /// Browser origin allowed by CORS. `None` allows any origin.
    pub allowed_origin: Option<String>,

    /// Concurrent HTTP requests accepted by the server.
    pub max_concurrent_requests: usize,

    /// Retention of a finished, unfetched execution.
    pub result_ttl: Duration,
}

impl Config {
    /// Create a configuration with production endpoints and the given credentials.
    #[must_use]
    pub fn new(core_api_key: Option<String>, semantic_scholar_api_key: Option<String>) -> Self {
        Self {
            core_api_key,
            semantic_scholar_api_key,
            core_api_url: api::CORE_API.to_string(),
            arxiv_api_url: api::ARXIV_API.to_string(),
            semantic_scholar_api_url: api::SEMANTIC_SCHOLAR_API.to_string(),
            sources: SourceId::ALL.to_vec(),
            source_timeout: None,
            connect_timeout: api::CONNECT_TIMEOUT,
            max_results: api::MAX_RESULTS,
            llm_url: api::LLM_URL.to_string(),
            llm_model: api::LLM_MODEL.to_string(),
            synthesis_timeout: api::SYNTHESIS_TIMEOUT,
            allowed_origin: None,
            max_concurrent_requests: api::MAX_CONCURRENT_REQUESTS,
            result_ttl: api::RESULT_TTL,
        }
    }

    /// Create a test configuration pointing every endpoint at one mock server.
    ///
    /// Paths: `/core/v3`, `/arxiv/api/query`, `/graph/v1` and `/api/generate`.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            core_api_key: Some("test-core-key".to_string()),
            semantic_scholar_api_key: None,
            core_api_url: format!("{base_url}/core/v3"),
            arxiv_api_url: format!("{base_url}/arxiv/api/query"),
            semantic_scholar_api_url: format!("{base_url}/graph/v1"),
            sources: SourceId::ALL.to_vec(),
            source_timeout: Some(Duration::from_secs(2)),
            connect_timeout: Duration::from_secs(1),
            max_results: api::MAX_RESULTS,
            llm_url: base_url.to_string(),
            llm_model: "test-model".to_string(),
            synthesis_timeout: Duration::from_secs(2),
            allowed_origin: None,
            max_concurrent_requests: api::MAX_CONCURRENT_REQUESTS,
            result_ttl: api::RESULT_TTL,
        }
    }

    /// Create configuration from environment variables (and a `.env` file if present).
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::new(
            non_empty_var("CORE_API_KEY"),
            non_empty_var("SEMANTIC_SCHOLAR_API_KEY"),
        );

        if let Some(url) = non_empty_var("LLM_URL") {
            config.llm_url = url;
        }
        if let Some(model) = non_empty_var("LLM_MODEL") {
            config.llm_model = model;
        }
        config.allowed_origin = non_empty_var("FRONTEND_ORIGIN");

        if let Some(list) = non_empty_var("SOURCES") {
            config.sources = SourceId::parse_list(&list)?;
        }
        if let Some(secs) = non_empty_var("SOURCE_TIMEOUT_SECS") {
            config.source_timeout = Some(Duration::from_secs(secs.parse()?));
        }
        if let Some(secs) = non_empty_var("SYNTHESIS_TIMEOUT_SECS") {
            config.synthesis_timeout = Duration::from_secs(secs.parse()?);
        }
        if let Some(n) = non_empty_var("MAX_RESULTS") {
            config.max_results = n.parse()?;
        }
        if let Some(secs) = non_empty_var("RESULT_TTL_SECS") {
            config.result_ttl = Duration::from_secs(secs.parse()?);
        }

        Ok(config)
    }

    /// Timeout applied to one call against `source`.
    #[must_use]
    pub fn timeout_for(&self, source: SourceId) -> Duration {
        self.source_timeout
            .unwrap_or_else(|| source.default_timeout())
    }

    /// Check if a CORE API key is configured.
    #[must_use]
    pub const fn has_core_api_key(&self) -> bool {
        self.core_api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("has_core_api_key", &self.has_core_api_key())
            .field(
                "has_semantic_scholar_api_key",
                &self.semantic_scholar_api_key.is_some(),
            )
            .field("sources", &self.sources)
            .field("llm_url", &self.llm_url)
            .field("llm_model", &self.llm_model)
            .field("allowed_origin", &self.allowed_origin)
            .field("result_ttl", &self.result_ttl)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
