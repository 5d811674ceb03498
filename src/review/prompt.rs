//! Prompt construction for hunk reviews

use crate::domain::{Category, Hunk};
use crate::session::PromptShadow;

use super::Prompt;

/// Shadows beyond this count are left out of prompts, oldest first
const MAX_PROMPT_SHADOWS: usize = 5;

/// Inputs shared by every prompt of one review pass
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub nitpicky: bool,
    /// Dismissed findings rendered as `file:line: message`
    pub suppression_examples: Vec<String>,
    /// Hunks whose findings the user dismissed
    pub shadows: Vec<PromptShadow>,
    pub rag_symbol_max_definitions: Option<u32>,
    pub rag_symbol_max_tokens: Option<u32>,
}

/// Renders the prompt for one hunk
pub trait PromptBuilder: Send + Sync {
    fn build(&self, hunk: &Hunk, context: &PromptContext) -> Prompt;
}

/// Prompt asking for a `{"findings": [...]}` object
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPromptBuilder;

const SYSTEM_PROMPT: &str = "\
You are a meticulous senior engineer reviewing a single diff hunk.
Report only concrete, actionable problems introduced or exposed by the change.
Respond with a JSON object of the form {\"findings\": [...]} and nothing else.
Return {\"findings\": []} when the hunk is fine.

Each entry of \"findings\" is an object with:
- \"file\": path of the file (string)
- \"line\": line number in the new file (integer), or
- \"range\": {\"start\": n, \"end\": m} for multi-line issues
- \"severity\": one of \"error\", \"warning\", \"info\", \"nitpick\"
- \"category\": one of CATEGORIES
- \"confidence\": how sure you are, from 0.0 to 1.0
- \"message\": one or two sentences describing the problem
- \"suggestion\": optional concrete fix

Only reference lines that appear in the hunk. Do not comment on formatting,
missing comments or documentation unless it causes a real defect.";

const NITPICKY_ADDENDUM: &str = "\
Nitpicky mode is on: also report style issues, naming problems, typos and
small readability improvements, using severity \"nitpick\".";

impl PromptBuilder for DefaultPromptBuilder {
    fn build(&self, hunk: &Hunk, context: &PromptContext) -> Prompt {
        let categories = Category::ALL
            .iter()
            .map(|c| format!("\"{}\"", c.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut system = SYSTEM_PROMPT.replace("CATEGORIES", &categories);
        if context.nitpicky {
            system.push_str("\n\n");
            system.push_str(NITPICKY_ADDENDUM);
        }

        let mut user = String::new();
        if let Some(section) = suppression_section(context) {
            user.push_str(&section);
            user.push('\n');
        }
        user.push_str(&format!("File: {}\n\n```diff\n{}", hunk.file, hunk.content));
        if !hunk.content.ends_with('\n') {
            user.push('\n');
        }
        user.push_str("```\n");

        Prompt { system, user }
    }
}

fn suppression_section(context: &PromptContext) -> Option<String> {
    let shadows: Vec<&PromptShadow> = context
        .shadows
        .iter()
        .filter(|s| !s.prompt_context.trim().is_empty())
        .collect();
    if context.suppression_examples.is_empty() && shadows.is_empty() {
        return None;
    }

    let mut section = String::from("Do not report issues like these; the user rejected them before:\n");
    for example in &context.suppression_examples {
        section.push_str(&format!("- {}\n", example));
    }

    let skip = shadows.len().saturating_sub(MAX_PROMPT_SHADOWS);
    for shadow in &shadows[skip..] {
        section.push_str(&format!(
            "\nA finding on this code was dismissed:\n```diff\n{}\n```\n",
            shadow.prompt_context.trim_end()
        ));
    }
    Some(section)
}
