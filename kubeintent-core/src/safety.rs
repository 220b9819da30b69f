// kubeintent-core/src/safety.rs

//! Heuristic safety gate for generated commands.
//!
//! A command passes when its base program is on a fixed allow-list and the
//! lower-cased command text contains none of the deny patterns below.
//!
//! **Warning:** matching is substring based. It over-blocks (a deny pattern
//! appearing inside an unrelated argument) and under-blocks (trivial
//! obfuscation defeats it). Acceptance is not a safety guarantee against a
//! malicious or compromised text generator.

use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Programs a generated command may start with.
pub const ALLOWED_COMMANDS: &[&str] = &[
    // Cluster CLIs
    "kubectl", "oc", "helm",
    // Container tools
    "docker", "podman",
    // Network utilities
    "curl", "ping", "nslookup", "dig", "telnet",
    // Text utilities
    "cat", "grep", "awk", "sed", "head", "tail",
];

/// Substrings that reject an otherwise allowed command.
pub const DENY_PATTERNS: &[&str] = &[
    // Destructive filesystem operations
    "rm -rf",
    "rm -fr",
    "rm -r /",
    "mkfs",
    "dd if=",
    "shred ",
    ":(){",
    // Privilege escalation
    "sudo ",
    "su -",
    "su root",
    "doas ",
    // Permission widening
    "chmod 777",
    "chmod -r 777",
    "chmod a+w",
    "chmod o+w",
    "chown ",
    // Device redirection
    "> /dev/sd",
    "> /dev/nvme",
    "of=/dev/",
    // Host control
    "shutdown",
    "reboot",
    "> /etc/",
    // Pipe to shell from a network fetch
    "| sh",
    "|sh",
    "| bash",
    "|bash",
    "| zsh",
    "base64 -d |",
];

/// Why a command was accepted or refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum SafetyVerdict {
    Allowed,
    Empty,
    NotAllowListed(String),
    Denied(String),
}

impl SafetyVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SafetyVerdict::Allowed)
    }
}

impl fmt::Display for SafetyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyVerdict::Allowed => write!(f, "allowed"),
            SafetyVerdict::Empty => write!(f, "rejected: empty command"),
            SafetyVerdict::NotAllowListed(base) => {
                write!(f, "rejected: '{}' is not an allowed command", base)
            }
            SafetyVerdict::Denied(pattern) => {
                write!(f, "rejected: matches deny pattern '{}'", pattern)
            }
        }
    }
}

/// First whitespace-delimited token of `command`, if any.
pub fn base_command(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}

/// Classifies `command` against the allow-list and deny patterns.
///
/// Deny-pattern hits are logged on the audit target even though nothing runs.
pub fn classify(command: &str) -> SafetyVerdict {
    let base = match base_command(command) {
        Some(base) => base,
        None => return SafetyVerdict::Empty,
    };

    if !ALLOWED_COMMANDS.contains(&base) {
        debug!(command = %command, base = %base, "Command base is not allow-listed");
        return SafetyVerdict::NotAllowListed(base.to_string());
    }

    let lowered = command.to_lowercase();
    if let Some(pattern) = DENY_PATTERNS.iter().find(|p| lowered.contains(*p)) {
        warn!(
            target: "kubeintent::audit",
            command = %command,
            pattern = %pattern,
            "Rejected allow-listed command matching deny pattern"
        );
        return SafetyVerdict::Denied(pattern.to_string());
    }

    SafetyVerdict::Allowed
}

/// Whether `command` may be executed.
pub fn is_safe(command: &str) -> bool {
    classify(command).is_allowed()
}
