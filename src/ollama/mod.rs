//! Reviewer backed by a local Ollama server.

mod types;

pub use types::{GenerateOptions, GenerateRequest, GenerateResponse, ModelTag, TagsResponse};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;

use crate::error::StetError;
use crate::review::{Generation, Prompt, Reviewer};

/// Default Ollama server URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// HTTP client for one model on an Ollama server
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    options: GenerateOptions,
    client: ureq::Agent,
}

impl OllamaClient {
    /// `timeout` bounds each response read; connecting is capped at 5 seconds.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(timeout)
            .build();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            options: GenerateOptions::default(),
            client,
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models installed on the server
    pub fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response: TagsResponse = self
            .client
            .get(&url)
            .call()
            .with_context(|| format!("Failed to connect to Ollama at {}", self.base_url))?
            .into_json()
            .context("Failed to parse Ollama model list")?;
        Ok(response.models.into_iter().map(|m| m.name).collect())
    }

    /// Blocking generation call
    pub fn generate_blocking(&self, prompt: &Prompt) -> Result<Generation> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            system: &prompt.system,
            prompt: &prompt.user,
            stream: false,
            format: "json",
            options: self.options,
        };

        let response: GenerateResponse = self
            .client
            .post(&url)
            .send_json(&request)
            .with_context(|| format!("Ollama generate request failed for model {}", self.model))?
            .into_json()
            .context("Failed to parse Ollama generate response")?;

        Ok(Generation {
            usage: response.usage(),
            text: response.response,
        })
    }
}

/// Whether the installed model name `available` satisfies `wanted`.
/// An untagged name matches its `:latest` tag.
fn model_matches(available: &str, wanted: &str) -> bool {
    if available == wanted {
        return true;
    }
    !wanted.contains(':') && available.strip_suffix(":latest") == Some(wanted)
}

#[async_trait]
impl Reviewer for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn check(&self) -> Result<()> {
        let client = self.clone();
        let models = tokio::task::spawn_blocking(move || client.list_models())
            .await
            .context("Ollama check task failed")?
            .context(StetError::ReviewerUnreachable)?;

        if models.iter().any(|m| model_matches(m, &self.model)) {
            tracing::debug!(model = %self.model, "Reviewer model available");
            return Ok(());
        }

        Err(anyhow!(
            "model {} is not installed on {} (found: {})",
            self.model,
            self.base_url,
            if models.is_empty() {
                "none".to_string()
            } else {
                models.join(", ")
            }
        )
        .context(StetError::ReviewerUnreachable))
    }

    async fn generate(&self, prompt: &Prompt) -> Result<Generation> {
        let client = self.clone();
        let prompt = prompt.clone();
        tokio::task::spawn_blocking(move || client.generate_blocking(&prompt))
            .await
            .context("Ollama generate task failed")?
    }
}
