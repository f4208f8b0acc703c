//! Synthesis engine: turns ranked papers into one summary through an
//! Ollama-compatible `/api/generate` endpoint.
//!
//! Requests are deterministic (temperature 0, no streaming) and the prompt is a
//! pure function of the top-ranked paper. There is no local fallback summary.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{SynthesisError, body_excerpt};
use crate::models::PaperRecord;

/// Characters of abstract included in the prompt.
pub const MAX_ABSTRACT_CHARS: usize = 2000;

/// Text used when the top paper has no abstract.
const NO_ABSTRACT: &str = "No abstract available.";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for the text-generation capability.
#[derive(Debug, Clone)]
pub struct SynthesisEngine {
    http: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl SynthesisEngine {
    /// Create an engine from configuration, sharing the given connection pool.
    #[must_use]
    pub fn new(config: &Config, http: Client) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/generate", config.llm_url.trim_end_matches('/')),
            model: config.llm_model.clone(),
            timeout: config.synthesis_timeout,
        }
    }

    /// Model identifier sent with every request.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Summarize the ranked papers.
    ///
    /// Exactly one generate call is made, bounded by the configured timeout.
    pub async fn summarize(&self, papers: &[PaperRecord]) -> Result<String, SynthesisError> {
        let top = papers.first().ok_or(SynthesisError::EmptyInput)?;
        let prompt = build_prompt(top);

        tracing::info!(model = %self.model, title = %top.title, "Requesting summary");

        let call = self.generate(&prompt);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Err(SynthesisError::Http(e))) if e.is_timeout() => {
                Err(SynthesisError::Timeout(self.timeout))
            }
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout(self.timeout)),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, SynthesisError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = body_excerpt(&response.text().await.unwrap_or_default());
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&text)?;

        let answer = parsed.response.trim();
        if answer.is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }
        Ok(answer.to_string())
    }
}

/// Build the summary prompt for the top-ranked paper.
#[must_use]
pub fn build_prompt(paper: &PaperRecord) -> String {
    let abstract_text = paper
        .r#abstract
        .as_deref()
        .map(|a| truncate_chars(a, MAX_ABSTRACT_CHARS))
        .unwrap_or(NO_ABSTRACT);

    format!(
        "Summarize the key findings of the following paper.\n\n\
         Title: {}\n\
         Authors: {}\n\n\
         Abstract:\n{}",
        paper.title,
        paper.author_names(),
        abstract_text
    )
}

/// Longest prefix of `text` with at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    text.char_indices()
        .nth(max)
        .map_or(text, |(idx, _)| &text[..idx])
}
