//! Shared test utilities for review integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tempfile::TempDir;

use stet::Usage;
use stet::git::GitManager;
use stet::review::{Generation, Orchestrator, Prompt, Reviewer};

/// Run git in `repo` and return trimmed stdout, panicking on failure
pub fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Creates a temporary git repository with one commit holding `a.txt`,
/// `b.txt` and a `.gitignore` for the state directory
pub fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let repo_path = temp_dir.path();

    git(repo_path, &["init", "-q"]);
    git(repo_path, &["config", "user.email", "test@test.com"]);
    git(repo_path, &["config", "user.name", "Test User"]);
    git(repo_path, &["config", "commit.gpgsign", "false"]);

    fs::write(repo_path.join(".gitignore"), ".review/\n").expect("Failed to write .gitignore");
    fs::write(repo_path.join("a.txt"), "one\ntwo\nthree\n").expect("Failed to write a.txt");
    fs::write(repo_path.join("b.txt"), "alpha\nbeta\ngamma\n").expect("Failed to write b.txt");
    git(repo_path, &["add", "-A"]);
    git(repo_path, &["commit", "-q", "-m", "Initial commit"]);

    temp_dir
}

/// Write `content` to `name` and commit it, returning the new HEAD
pub fn commit_file(repo: &Path, name: &str, content: &str, message: &str) -> String {
    let path = repo.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(&path, content).expect("Failed to write file");
    git(repo, &["add", "-A"]);
    git(repo, &["commit", "-q", "-m", message]);
    head(repo)
}

pub fn head(repo: &Path) -> String {
    git(repo, &["rev-parse", "HEAD"])
}

pub fn state_dir(repo: &Path) -> PathBuf {
    repo.join(".review")
}

/// Orchestrator over the real git backend with no reviewer attached
pub fn orchestrator(repo: &Path) -> Orchestrator {
    let state = state_dir(repo);
    let git = GitManager::new(repo)
        .expect("Failed to create GitManager")
        .with_state_dir(&state);
    Orchestrator::new(Arc::new(git), state)
}

pub fn git_manager(repo: &Path) -> GitManager {
    GitManager::new(repo)
        .expect("Failed to create GitManager")
        .with_state_dir(&state_dir(repo))
}

/// Reviewer returning canned responses in order and recording prompts
pub struct ScriptedReviewer {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<Prompt>>,
    reachable: bool,
}

impl ScriptedReviewer {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().rev().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            reachable: true,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new(&[])
        }
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reviewer for ScriptedReviewer {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn check(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(anyhow!("connection refused"))
        }
    }

    async fn generate(&self, prompt: &Prompt) -> Result<Generation> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let text = self
            .responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| "[]".to_string());
        Ok(Generation {
            text,
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 20,
                eval_duration_ns: 1_000,
            },
        })
    }
}
