// kubeintent-core/src/knowledge.rs

//! Prompt templates and optional cluster notes injected into them.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::extractor::COMMAND_MARKER;

const COMMAND_INSTRUCTIONS: &str = r#"You translate Kubernetes and OpenShift requests into shell commands.

Rules:
- Put every command on its own line, prefixed with the marker shown below.
- Use only kubectl, oc or helm unless the request clearly needs another tool.
- List commands in the order they must run. Later commands may depend on earlier ones
  (create a namespace before creating resources inside it).
- Never use sudo, rm, chmod, chown or pipes into a shell.
- Do not use interactive flags (-it) or commands that never exit (logs -f, get -w).
- Keep any explanation short and outside the command lines.

Example:
COMMAND: kubectl create namespace testing
COMMAND: kubectl create serviceaccount test-sa -n testing"#;

const LABEL_INSTRUCTIONS: &str = r#"Decide how to handle a Kubernetes request.
Answer EXECUTE if the request asks to create, change, inspect or list cluster resources.
Answer EXPLAIN if it asks for a concept, a comparison or general advice.
Reply with exactly one word: EXECUTE or EXPLAIN."#;

const EXPLAIN_INSTRUCTIONS: &str = r#"You are a Kubernetes and OpenShift expert.
Answer the question clearly in Markdown. Keep it under 300 words.
Include example commands in fenced code blocks only when they help."#;

/// Cluster-specific notes appended to generation prompts.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    notes: Option<String>,
}

impl KnowledgeBase {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_notes(notes: impl Into<String>) -> Self {
        let notes = notes.into();
        Self {
            notes: (!notes.trim().is_empty()).then_some(notes),
        }
    }

    /// Loads notes from `path`. A missing file is an error; an empty one is not.
    pub fn load(path: &Path) -> Result<Self> {
        let notes = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge file: {:?}", path))?;
        info!(path = ?path, bytes = notes.len(), "Loaded knowledge file");
        Ok(Self::from_notes(notes))
    }

    pub fn has_notes(&self) -> bool {
        self.notes.is_some()
    }

    /// System prompt for command generation. `override_prompt` replaces the
    /// built-in instructions; the marker rule and notes are always kept.
    pub fn command_prompt(&self, override_prompt: Option<&str>) -> String {
        let instructions = override_prompt.unwrap_or(COMMAND_INSTRUCTIONS);
        let mut prompt = format!(
            "{}\n\nPrefix each command line with `{}`.",
            instructions, COMMAND_MARKER
        );
        self.append_notes(&mut prompt);
        prompt
    }

    pub fn label_prompt(&self) -> String {
        LABEL_INSTRUCTIONS.to_string()
    }

    pub fn explain_prompt(&self) -> String {
        let mut prompt = EXPLAIN_INSTRUCTIONS.to_string();
        self.append_notes(&mut prompt);
        prompt
    }

    fn append_notes(&self, prompt: &mut String) {
        if let Some(notes) = &self.notes {
            debug!(bytes = notes.len(), "Injecting cluster notes into prompt");
            prompt.push_str("\n\nCluster notes:\n");
            prompt.push_str(notes.trim());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_prompt_names_marker() {
        let prompt = KnowledgeBase::empty().command_prompt(None);
        assert!(prompt.contains("Prefix each command line with `COMMAND:`"));
        assert!(!prompt.contains("Cluster notes"));
    }

    #[test]
    fn test_override_keeps_marker_and_notes() {
        let kb = KnowledgeBase::from_notes("Ingress class is nginx-internal.");
        let prompt = kb.command_prompt(Some("Only emit oc commands."));
        assert!(prompt.starts_with("Only emit oc commands."));
        assert!(prompt.contains("COMMAND:"));
        assert!(prompt.ends_with("Ingress class is nginx-internal."));
        assert!(kb.explain_prompt().contains("Cluster notes:"));
        assert!(!kb.label_prompt().contains("Cluster notes:"));
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "   \n").unwrap();
        assert!(!KnowledgeBase::load(&path).unwrap().has_notes());

        std::fs::write(&path, "Prod clusters run OpenShift 4.14.").unwrap();
        assert!(KnowledgeBase::load(&path).unwrap().has_notes());

        assert!(KnowledgeBase::load(&dir.path().join("missing.md")).is_err());
    }
}
