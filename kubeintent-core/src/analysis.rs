// kubeintent-core/src/analysis.rs

//! Confidence and severity attached to each reply.
//!
//! The numbers are heuristics for ranking and colouring output, not a
//! calibrated probability.

use serde::{Deserialize, Serialize};

use crate::models::execution::BatchStatus;
use crate::models::response::AssistantResponse;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Analysis {
    /// In `[0, 1]`.
    pub confidence: f32,
    pub severity: Severity,
    pub headline: String,
}

impl Analysis {
    fn new(confidence: f32, severity: Severity, headline: impl Into<String>) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
            severity,
            headline: headline.into(),
        }
    }
}

pub fn assess(response: &AssistantResponse) -> Analysis {
    match response {
        AssistantResponse::Commands(result) => {
            let total = result.outcomes.len();
            let rejected = result.outcomes.iter().filter(|o| o.is_rejected()).count();
            let timed_out = result.outcomes.iter().filter(|o| o.is_timeout()).count();
            let mut analysis = match result.status {
                BatchStatus::Empty => Analysis::new(0.3, Severity::Low, "No commands were run"),
                BatchStatus::Succeeded => Analysis::new(
                    0.9,
                    Severity::Info,
                    format!("{} of {} commands succeeded", total, total),
                ),
                BatchStatus::Partial => Analysis::new(
                    0.6,
                    Severity::Medium,
                    format!("{} of {} commands succeeded", result.succeeded_count(), total),
                ),
                BatchStatus::Rescued => Analysis::new(
                    0.5,
                    Severity::Medium,
                    "Generated commands failed, fallback succeeded",
                ),
                BatchStatus::Failed => Analysis::new(0.2, Severity::High, "All commands failed"),
            };
            if rejected > 0 {
                analysis.severity = analysis.severity.max(Severity::Medium);
                analysis.confidence = (analysis.confidence - 0.1).max(0.0);
                analysis.headline =
                    format!("{} ({} rejected by safety policy)", analysis.headline, rejected);
            }
            if timed_out > 0 {
                analysis.severity = Severity::High;
                analysis.headline = format!("{} ({} timed out)", analysis.headline, timed_out);
            }
            analysis
        }
        AssistantResponse::Operator(result) => {
            if result.installed {
                Analysis::new(
                    0.85,
                    Severity::Info,
                    format!("Operator '{}' found ({})", result.operator, result.hits().join(", ")),
                )
            } else if result.all_lookups_failed() {
                Analysis::new(
                    0.2,
                    Severity::High,
                    format!("Could not query the cluster for operator '{}'", result.operator),
                )
            } else {
                Analysis::new(
                    0.7,
                    Severity::Low,
                    format!("Operator '{}' not found", result.operator),
                )
            }
        }
        AssistantResponse::Network(result) => match (&result.target.pod, &result.node) {
            (Some(pod), Some(node)) => Analysis::new(
                0.75,
                Severity::Info,
                format!("Pod '{}' runs on node '{}'", pod, node),
            ),
            (Some(pod), None) => Analysis::new(
                0.4,
                Severity::Medium,
                format!("Could not resolve the node for pod '{}'", pod),
            ),
            (None, _) => {
                Analysis::new(0.5, Severity::Low, "Generic diagnostic guidance; no pod named")
            }
        },
        AssistantResponse::Explanation(_) => Analysis::new(0.6, Severity::Info, "Explanation"),
        AssistantResponse::GenerationFailed { .. } => {
            Analysis::new(0.0, Severity::High, "Command generation failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::execution::{ExecutionOutcome, OrchestrationResult};
    use std::time::Duration;

    fn batch(outcomes: Vec<ExecutionOutcome>, status: BatchStatus) -> AssistantResponse {
        AssistantResponse::Commands(OrchestrationResult {
            query: "q".to_string(),
            commands: outcomes.iter().map(|o| o.command.clone()).collect(),
            outcomes,
            fallback: None,
            status,
            summary: String::new(),
        })
    }

    fn ok(cmd: &str) -> ExecutionOutcome {
        ExecutionOutcome::new(cmd, "done", "", 0, Duration::from_millis(3))
    }

    #[test]
    fn test_full_success_is_confident() {
        let analysis = assess(&batch(vec![ok("a"), ok("b")], BatchStatus::Succeeded));
        assert_eq!(analysis.severity, Severity::Info);
        assert!(analysis.confidence > 0.8);
        assert_eq!(analysis.headline, "2 of 2 commands succeeded");
    }

    #[test]
    fn test_rejection_and_timeout_raise_severity() {
        let rejected = assess(&batch(
            vec![ok("a"), ExecutionOutcome::rejected("sudo x")],
            BatchStatus::Partial,
        ));
        assert_eq!(rejected.severity, Severity::Medium);
        assert!(rejected.headline.contains("1 rejected by safety policy"));

        let timed_out = assess(&batch(
            vec![
                ok("a"),
                ExecutionOutcome::timed_out("kubectl logs -f x", "", Duration::from_secs(1)),
            ],
            BatchStatus::Partial,
        ));
        assert_eq!(timed_out.severity, Severity::High);
    }

    #[test]
    fn test_generation_failure() {
        let analysis = assess(&AssistantResponse::GenerationFailed {
            query: "q".into(),
            message: "m".into(),
        });
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.severity, Severity::High);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Info < Severity::Low);
    }
}
