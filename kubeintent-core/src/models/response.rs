// kubeintent-core/src/models/response.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::Analysis;
use crate::models::execution::{ExecutionOutcome, OrchestrationResult};

/// One read-only lookup run while checking for an operator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OperatorProbe {
    /// Short resource label, e.g. "subscriptions" or "crds".
    pub kind: String,
    pub outcome: ExecutionOutcome,
    /// The lookup succeeded and its output mentions the operator.
    pub found: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OperatorCheckResult {
    pub query: String,
    pub operator: String,
    pub installed: bool,
    pub probes: Vec<OperatorProbe>,
    pub summary: String,
}

impl OperatorCheckResult {
    /// Kinds of the probes that found the operator, in battery order.
    pub fn hits(&self) -> Vec<&str> {
        self.probes
            .iter()
            .filter(|p| p.found)
            .map(|p| p.kind.as_str())
            .collect()
    }

    /// True when not a single lookup exited 0.
    pub fn all_lookups_failed(&self) -> bool {
        !self.probes.iter().any(|p| p.outcome.success())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetworkWorkflow {
    Dns,
    Connectivity,
    PacketCapture,
    SocketStats,
    General,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkTarget {
    pub pod: Option<String>,
    pub namespace: String,
    pub interface: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NetworkWorkflowResult {
    pub query: String,
    pub workflow: NetworkWorkflow,
    pub target: NetworkTarget,
    /// The node lookup, run only when a pod was named.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub discovery: Option<ExecutionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node: Option<String>,
    /// Suggested commands. None of these were executed.
    pub guidance: Vec<String>,
    pub summary: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExplanationResult {
    pub query: String,
    pub explanation: String,
}

/// What the assistant produced for one request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantResponse {
    Commands(OrchestrationResult),
    Operator(OperatorCheckResult),
    Network(NetworkWorkflowResult),
    Explanation(ExplanationResult),
    GenerationFailed { query: String, message: String },
}

impl AssistantResponse {
    pub fn query(&self) -> &str {
        match self {
            AssistantResponse::Commands(r) => &r.query,
            AssistantResponse::Operator(r) => &r.query,
            AssistantResponse::Network(r) => &r.query,
            AssistantResponse::Explanation(r) => &r.query,
            AssistantResponse::GenerationFailed { query, .. } => query,
        }
    }

    /// The one-line text shown under the response.
    pub fn summary(&self) -> &str {
        match self {
            AssistantResponse::Commands(r) => &r.summary,
            AssistantResponse::Operator(r) => &r.summary,
            AssistantResponse::Network(r) => &r.summary,
            AssistantResponse::Explanation(r) => &r.explanation,
            AssistantResponse::GenerationFailed { message, .. } => message,
        }
    }
}

/// A response plus its interaction-log key and assessment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub id: Uuid,
    pub response: AssistantResponse,
    pub analysis: Analysis,
}
