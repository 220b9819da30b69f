// kubeintent-core/src/extractor.rs

//! Pulls candidate commands out of generated text.

/// Literal prefix the generator is instructed to put before each command.
pub const COMMAND_MARKER: &str = "COMMAND:";

/// Cluster CLI prefixes accepted even when the marker is missing.
const CLI_PREFIXES: &[&str] = &["kubectl ", "oc ", "helm "];

const CODE_FENCE: &str = "```";

/// Extracts commands from `response_text`, preserving their order of appearance.
///
/// A line counts when, after trimming (and dropping a leading `-`/`*` list
/// bullet), it starts with [`COMMAND_MARKER`] or with a cluster CLI prefix.
/// Code-fence lines are skipped. Results that are blank after stripping the
/// marker are dropped.
pub fn extract_commands(response_text: &str) -> Vec<String> {
    response_text
        .lines()
        .filter_map(|line| {
            let trimmed = strip_bullet(line.trim());
            if trimmed.starts_with(CODE_FENCE) {
                return None;
            }
            let candidate = if let Some(rest) = trimmed.strip_prefix(COMMAND_MARKER) {
                rest.trim()
            } else if CLI_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
                trimmed
            } else {
                return None;
            };
            let candidate = strip_inline_code(candidate);
            (!candidate.is_empty()).then(|| candidate.to_string())
        })
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    match line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}

/// `COMMAND: \`kubectl get pods\`` is common enough to unwrap.
fn strip_inline_code(candidate: &str) -> &str {
    candidate
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
        .map(str::trim)
        .unwrap_or(candidate)
}
