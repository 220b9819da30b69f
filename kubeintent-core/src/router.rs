// kubeintent-core/src/router.rs

//! Chooses the handling path for a request.
//!
//! The checks run in a fixed order and the first match wins:
//!
//! 1. operator-presence questions,
//! 2. network diagnostics,
//! 3. everything else.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ClassificationDecision {
    OperatorCheck { operator: String },
    NetworkWorkflow,
    GenericCommand,
}

/// Stems matched against the start of each query word.
pub const NETWORK_VOCABULARY: &[&str] = &[
    "tcpdump",
    "packet",
    "capture",
    "dns",
    "nslookup",
    "connectivity",
    "reachab",
    "ping",
    "traceroute",
    "latency",
    "socket",
    "interface",
    "netstat",
    "port",
    "network",
];

/// Words the operator patterns can capture that are never operator names.
const NON_NAMES: &[&str] = &["the", "a", "an", "my", "this", "that", "for", "any", "your"];

const OPERATOR_NAME: &str = r"([a-z0-9][a-z0-9._-]*)";

lazy_static! {
    static ref OPERATOR_PATTERNS: Vec<Regex> = [
        format!(
            r"(?i)\bis\s+(?:the\s+)?{}\s+operator\s+(?:installed|present|running|enabled|deployed|available)\b",
            OPERATOR_NAME
        ),
        format!(r"(?i)\bcheck\s+(?:for\s+)?(?:the\s+)?{}\s+operator\b", OPERATOR_NAME),
        format!(r"(?i)\b{}\s+operator\s+status\b", OPERATOR_NAME),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("operator pattern is valid"))
    .collect();
}

pub fn classify(query: &str) -> ClassificationDecision {
    if let Some(operator) = operator_name(query) {
        debug!(operator = %operator, "Routing to operator check");
        return ClassificationDecision::OperatorCheck { operator };
    }
    if mentions_network(query) {
        debug!("Routing to network workflow");
        return ClassificationDecision::NetworkWorkflow;
    }
    debug!("Routing to generic command handling");
    ClassificationDecision::GenericCommand
}

/// The operator name from the first matching pattern, lower-cased.
pub fn operator_name(query: &str) -> Option<String> {
    OPERATOR_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(query)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
            .filter(|name| !NON_NAMES.contains(&name.as_str()))
    })
}

pub fn mentions_network(query: &str) -> bool {
    query
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| NETWORK_VOCABULARY.iter().any(|stem| word.starts_with(stem)))
}
