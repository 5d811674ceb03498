//! Configuration file I/O

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{Config, STATE_DIR_NAME};

/// One config file; unset keys leave earlier layers alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub model: Option<String>,
    pub ollama_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f64>,
    pub context_limit: Option<u32>,
    pub strictness: Option<String>,
    pub nitpicky: Option<bool>,
    pub rag_symbol_max_definitions: Option<u32>,
    pub rag_symbol_max_tokens: Option<u32>,
    pub history_max_records: Option<usize>,
    pub suppression_enabled: Option<bool>,
    pub suppression_history_records: Option<usize>,
    pub suppression_max_examples: Option<usize>,
    pub state_dir: Option<PathBuf>,
}

impl ConfigLayer {
    /// Load a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let layer: ConfigLayer = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(layer)
    }

    pub(super) fn from_file_if_exists(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "Loading config layer");
        Self::from_file(path).map(Some)
    }
}

impl Config {
    /// Get the global config directory path (`<config_dir>/stet`)
    pub fn global_config_dir() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stet")
    }

    /// Get the global config file path
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Repository config file (`<repo>/.review/config.toml`)
    pub fn repo_config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(STATE_DIR_NAME).join("config.toml")
    }
}
