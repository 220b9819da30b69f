// kubeintent-core/src/handlers/generic.rs

//! Requests that are neither operator checks nor network diagnostics.

use tracing::{debug, info, warn};

use super::HandlerContext;
use crate::errors::AssistantError;
use crate::extractor::extract_commands;
use crate::models::response::{AssistantResponse, ExplanationResult};
use crate::providers::generate_text;

/// Leading verbs that always mean "change something". Read verbs such as
/// "describe" or "show" also open prose questions, so those get labelled.
pub const ACTION_VERBS: &[&str] = &[
    "create", "delete", "scale", "apply", "deploy", "install", "restart", "expose", "label",
    "annotate", "rollout",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericIntent {
    Execute,
    Explain,
}

pub fn starts_with_action_verb(query: &str) -> bool {
    query
        .split_whitespace()
        .next()
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_lowercase())
        .map_or(false, |word| ACTION_VERBS.contains(&word.as_str()))
}

/// Parses the generator's one-word label.
pub fn parse_intent_label(text: &str) -> Option<GenericIntent> {
    let upper = text.to_uppercase();
    match (upper.contains("EXECUTE"), upper.contains("EXPLAIN")) {
        (true, false) => Some(GenericIntent::Execute),
        (false, true) => Some(GenericIntent::Explain),
        _ => None,
    }
}

async fn label_intent(
    ctx: &HandlerContext<'_>,
    query: &str,
) -> Result<GenericIntent, AssistantError> {
    let text = generate_text(ctx.provider, &ctx.knowledge.label_prompt(), query).await?;
    parse_intent_label(&text).ok_or_else(|| {
        AssistantError::generation(format!("unrecognized intent label: {}", text.trim()))
    })
}

pub async fn handle_generic(ctx: &HandlerContext<'_>, query: &str) -> AssistantResponse {
    let intent = if starts_with_action_verb(query) {
        GenericIntent::Execute
    } else {
        match label_intent(ctx, query).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "Intent labeling failed, using the execution path");
                GenericIntent::Execute
            }
        }
    };
    debug!(intent = ?intent, "Generic request labelled");

    if intent == GenericIntent::Explain {
        match generate_text(ctx.provider, &ctx.knowledge.explain_prompt(), query).await {
            Ok(explanation) if !explanation.trim().is_empty() => {
                return AssistantResponse::Explanation(ExplanationResult {
                    query: query.to_string(),
                    explanation: explanation.trim().to_string(),
                });
            }
            Ok(_) => warn!("Explanation was empty, using the execution path"),
            Err(e) => warn!(error = %e, "Explanation failed, using the execution path"),
        }
    }

    execute_path(ctx, query).await
}

async fn execute_path(ctx: &HandlerContext<'_>, query: &str) -> AssistantResponse {
    let prompt = ctx.knowledge.command_prompt(ctx.system_prompt);
    let text = match generate_text(ctx.provider, &prompt, query).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Command generation failed");
            return AssistantResponse::GenerationFailed {
                query: query.to_string(),
                message: format!("failed to generate commands: {}", e),
            };
        }
    };

    let commands = extract_commands(&text);
    info!(count = commands.len(), "Extracted commands from generated text");
    AssistantResponse::Commands(ctx.orchestrator.run_all(&commands, query).await)
}
