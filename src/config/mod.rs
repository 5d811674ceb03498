//! Configuration loading
//!
//! Settings come from built-in defaults, the global config file, the
//! repository's `.review/config.toml` and finally `STET_*` environment
//! variables, each layer overriding the previous one.

mod io;

pub use io::ConfigLayer;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "qwen2.5-coder:32b";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CONTEXT_LIMIT: u32 = 32768;

/// Name of the per-repository state directory
pub const STATE_DIR_NAME: &str = ".review";

/// Environment switch for recording token usage
pub const CAPTURE_USAGE_ENV: &str = "STET_CAPTURE_USAGE";

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Ollama model used for reviews
    pub model: String,

    pub ollama_base_url: String,

    /// Per-request read timeout in seconds
    pub timeout_secs: u64,

    pub temperature: f64,

    /// Model context window, sent as `num_ctx`
    pub context_limit: u32,

    /// Strictness preset (`strict`, `default`, `lenient`, optionally with `+`)
    pub strictness: String,

    pub nitpicky: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_symbol_max_definitions: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_symbol_max_tokens: Option<u32>,

    /// Records kept in the active history file; 0 disables rotation
    pub history_max_records: usize,

    pub suppression_enabled: bool,
    pub suppression_history_records: usize,
    pub suppression_max_examples: usize,

    /// Overrides `<repo>/.review`; relative paths are taken from the repo root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            ollama_base_url: crate::ollama::DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            strictness: "default".to_string(),
            nitpicky: false,
            rag_symbol_max_definitions: None,
            rag_symbol_max_tokens: None,
            history_max_records: crate::history::DEFAULT_MAX_RECORDS,
            suppression_enabled: true,
            suppression_history_records: 200,
            suppression_max_examples: 30,
            state_dir: None,
        }
    }
}

impl Config {
    /// Load every layer for the repository at `repo_root`.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let global_path = Self::global_config_path();
        if let Some(layer) = ConfigLayer::from_file_if_exists(&global_path)? {
            config.apply(layer);
        }

        let repo_path = Self::repo_config_path(repo_root);
        if let Some(layer) = ConfigLayer::from_file_if_exists(&repo_path)? {
            config.apply(layer);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overwrite every field the layer sets.
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(v) = layer.model {
            self.model = v;
        }
        if let Some(v) = layer.ollama_base_url {
            self.ollama_base_url = v;
        }
        if let Some(v) = layer.timeout_secs {
            self.timeout_secs = v;
        }
        if let Some(v) = layer.temperature {
            self.temperature = v;
        }
        if let Some(v) = layer.context_limit {
            self.context_limit = v;
        }
        if let Some(v) = layer.strictness {
            self.strictness = v;
        }
        if let Some(v) = layer.nitpicky {
            self.nitpicky = v;
        }
        if layer.rag_symbol_max_definitions.is_some() {
            self.rag_symbol_max_definitions = layer.rag_symbol_max_definitions;
        }
        if layer.rag_symbol_max_tokens.is_some() {
            self.rag_symbol_max_tokens = layer.rag_symbol_max_tokens;
        }
        if let Some(v) = layer.history_max_records {
            self.history_max_records = v;
        }
        if let Some(v) = layer.suppression_enabled {
            self.suppression_enabled = v;
        }
        if let Some(v) = layer.suppression_history_records {
            self.suppression_history_records = v;
        }
        if let Some(v) = layer.suppression_max_examples {
            self.suppression_max_examples = v;
        }
        if layer.state_dir.is_some() {
            self.state_dir = layer.state_dir;
        }
    }

    /// Apply `STET_*` variables read through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("STET_MODEL") {
            self.model = v;
        }
        if let Some(v) = get("STET_OLLAMA_BASE_URL") {
            self.ollama_base_url = v;
        }
        if let Some(v) = get("STET_TIMEOUT") {
            self.timeout_secs = v
                .parse()
                .with_context(|| format!("Invalid STET_TIMEOUT value: {}", v))?;
        }
        if let Some(v) = get("STET_STRICTNESS") {
            self.strictness = v;
        }
        if let Some(v) = get("STET_NITPICKY") {
            self.nitpicky = parse_bool(&v)
                .with_context(|| format!("Invalid STET_NITPICKY value: {}", v))?;
        }
        if let Some(v) = get("STET_CONTEXT_LIMIT") {
            self.context_limit = v
                .parse()
                .with_context(|| format!("Invalid STET_CONTEXT_LIMIT value: {}", v))?;
        }
        if let Some(v) = get("STET_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// State directory for the repository at `repo_root`
    pub fn state_dir(&self, repo_root: &Path) -> PathBuf {
        match &self.state_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => repo_root.join(dir),
            None => repo_root.join(STATE_DIR_NAME),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("expected true or false"),
    }
}

/// Whether token usage is recorded; read from the environment on every call.
pub fn usage_capture_enabled() -> bool {
    match std::env::var(CAPTURE_USAGE_ENV) {
        Ok(value) => !matches!(
            value.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.model, "qwen2.5-coder:32b");
        assert_eq!(config.ollama_base_url, "http://localhost:11434");
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.context_limit, 32768);
        assert_eq!(config.history_max_records, 1000);
        assert_eq!(config.suppression_max_examples, 30);
        assert_eq!(config.state_dir(Path::new("/repo")), PathBuf::from("/repo/.review"));
    }

    #[test]
    fn environment_overrides_files() {
        let mut config = Config::default();
        config.apply(ConfigLayer {
            model: Some("from-file".to_string()),
            nitpicky: Some(true),
            ..Default::default()
        });
        config
            .apply_env(env(&[
                ("STET_MODEL", "from-env"),
                ("STET_TIMEOUT", "30"),
                ("STET_NITPICKY", "off"),
                ("STET_STATE_DIR", "state"),
                ("STET_STRICTNESS", "  "),
            ]))
            .unwrap();

        assert_eq!(config.model, "from-env");
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.nitpicky);
        assert_eq!(config.strictness, "default");
        assert_eq!(config.state_dir(Path::new("/repo")), PathBuf::from("/repo/state"));
    }

    #[test]
    fn invalid_environment_numbers_are_errors() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("STET_CONTEXT_LIMIT", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("STET_CONTEXT_LIMIT"));
    }

    #[test]
    #[serial]
    fn usage_capture_follows_environment() {
        unsafe { std::env::remove_var(CAPTURE_USAGE_ENV) };
        assert!(usage_capture_enabled());

        for off in ["0", "false", " NO ", "Off"] {
            unsafe { std::env::set_var(CAPTURE_USAGE_ENV, off) };
            assert!(!usage_capture_enabled(), "{:?} should disable capture", off);
        }

        unsafe { std::env::set_var(CAPTURE_USAGE_ENV, "1") };
        assert!(usage_capture_enabled());
        unsafe { std::env::remove_var(CAPTURE_USAGE_ENV) };
    }
}
