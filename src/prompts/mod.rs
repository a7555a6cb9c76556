//! Prompt templates for the agent and assistant roles.
//!
//! Templates live in YAML files (one sequence of strings per file) and carry
//! `XXX...XXX` placeholder tokens that are filled by exact substring
//! replacement. The submodules hold the tokens and builders for each
//! pipeline.

pub mod evaluation;
pub mod extraction;

use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::error::{Result, SkgcError};

/// System turn that opens every agent ledger
pub const AGENT_SYSTEM_PROMPT: &str =
    "Hello GPT, you are my very helpful and intelligent assistant for a difficult task today.";

/// System turn sent with every assistant verification call
pub const ASSISTANT_SYSTEM_PROMPT: &str = "Hello GPT, you are my very helpful and intelligent \
assistant for checking the answers of another GPT sister of yourself.";

/// Agent templates for topic extraction (3 entries)
pub const AGENT_EXTRACTION_FILE: &str = "prompts_agent.yaml";
/// Assistant templates for topic extraction (3 entries)
pub const ASSISTANT_EXTRACTION_FILE: &str = "prompts_assistant.yaml";
/// Agent templates for evaluation (4 entries)
pub const AGENT_EVALUATION_FILE: &str = "prompts_agent_eval.yaml";
/// Assistant templates for evaluation (4 entries)
pub const ASSISTANT_EVALUATION_FILE: &str = "prompts_assistant_eval.yaml";

/// Parse a YAML sequence of template strings. Each entry is trimmed.
pub fn parse_templates(yaml: &str) -> Result<Vec<String>> {
    let raw: Vec<String> = serde_yaml::from_str(yaml)?;
    Ok(raw.into_iter().map(|t| t.trim().to_string()).collect())
}

/// Load an ordered template list from a YAML file.
///
/// Returns an empty list if the file is missing or malformed; callers treat
/// an empty list as "this stage cannot run".
pub fn load_templates(path: &Path) -> Vec<String> {
    match try_load_templates(path) {
        Ok(templates) => {
            debug!(path = %path.display(), count = templates.len(), "Loaded prompt templates");
            templates
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to load prompt templates");
            Vec::new()
        }
    }
}

fn try_load_templates(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SkgcError::Template(format!("cannot read {}: {}", path.display(), e)))?;
    parse_templates(&content)
}

/// Agent/assistant template pair for one pipeline.
#[derive(Debug, Clone, Default)]
pub struct StageTemplates {
    pub agent: Vec<String>,
    pub assistant: Vec<String>,
}

impl StageTemplates {
    pub fn new(agent: Vec<String>, assistant: Vec<String>) -> Self {
        Self { agent, assistant }
    }

    /// Templates for stage `idx`, if both roles have one.
    pub fn stage(&self, idx: usize) -> Option<(&str, &str)> {
        let agent = self.agent.get(idx)?;
        let assistant = self.assistant.get(idx)?;
        Some((agent.as_str(), assistant.as_str()))
    }
}

/// All templates needed for a run. Loaded once and reused for every
/// publication.
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    pub extraction: StageTemplates,
    pub evaluation: StageTemplates,
}

impl PromptSet {
    /// Load the four template files from `dir`.
    pub fn load_dir(dir: &Path) -> Self {
        let file = |name: &str| -> PathBuf { dir.join(name) };
        Self {
            extraction: StageTemplates::new(
                load_templates(&file(AGENT_EXTRACTION_FILE)),
                load_templates(&file(ASSISTANT_EXTRACTION_FILE)),
            ),
            evaluation: StageTemplates::new(
                load_templates(&file(AGENT_EVALUATION_FILE)),
                load_templates(&file(ASSISTANT_EVALUATION_FILE)),
            ),
        }
    }
}

/// Render a list the way templates expect it: `a, b, c`.
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}
