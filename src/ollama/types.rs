//! Wire types for the Ollama HTTP API

use serde::{Deserialize, Serialize};

use crate::domain::Usage;

/// Response of `GET /api/tags`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}

/// Sampling options passed with every generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub num_ctx: u32,
    pub temperature: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            num_ctx: 32768,
            temperature: 0.2,
        }
    }
}

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub system: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub format: &'static str,
    pub options: GenerateOptions,
}

/// Non-streaming `POST /api/generate` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Nanoseconds spent generating the response
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

impl GenerateResponse {
    pub fn usage(&self) -> Usage {
        Usage {
            prompt_tokens: self.prompt_eval_count.unwrap_or(0),
            completion_tokens: self.eval_count.unwrap_or(0),
            eval_duration_ns: self.eval_duration.unwrap_or(0),
        }
    }
}
