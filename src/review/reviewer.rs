//! The model-facing side of a review

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::Usage;

/// A rendered prompt for one hunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Raw model output for one prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    /// Response text, expected to hold findings JSON
    pub text: String,
    pub usage: Usage,
}

/// Trait for model backends that review hunks
#[async_trait]
pub trait Reviewer: Send + Sync {
    /// Model name recorded in history and notes
    fn model(&self) -> &str;

    /// Pre-flight check; fails when the model cannot be used.
    async fn check(&self) -> Result<()>;

    /// Produce a response for `prompt`.
    async fn generate(&self, prompt: &Prompt) -> Result<Generation>;
}
