// kubeintent-core/src/handlers/operator.rs

//! Operator-presence checks.

use tracing::{debug, info};

use crate::models::response::{OperatorCheckResult, OperatorProbe};
use crate::orchestrator::Orchestrator;

/// Read-only lookups, as (kind, command). All run in direct mode.
pub const OPERATOR_PROBES: &[(&str, &str)] = &[
    ("subscriptions", "kubectl get subscriptions.operators.coreos.com -A"),
    ("csvs", "kubectl get csv -A"),
    ("installplans", "kubectl get installplans -A"),
    ("pods", "kubectl get pods -A"),
    ("crds", "kubectl get crd"),
];

pub async fn check_operator(
    orchestrator: &Orchestrator,
    query: &str,
    operator: &str,
) -> OperatorCheckResult {
    check_operator_with(orchestrator, query, operator, OPERATOR_PROBES).await
}

/// Runs every probe in order; the operator counts as installed if any probe
/// exits 0 with the name in its output (case-insensitive).
pub async fn check_operator_with(
    orchestrator: &Orchestrator,
    query: &str,
    operator: &str,
    probes: &[(&str, &str)],
) -> OperatorCheckResult {
    let needle = operator.to_lowercase();
    let mut results = Vec::with_capacity(probes.len());

    for (kind, command) in probes {
        let outcome = orchestrator.execute(command).await;
        let found = outcome.success() && outcome.output.to_lowercase().contains(&needle);
        debug!(
            kind = %kind,
            exit_code = outcome.exit_code,
            found = found,
            "Operator probe finished"
        );
        results.push(OperatorProbe {
            kind: kind.to_string(),
            outcome,
            found,
        });
    }

    let hits: Vec<&str> = results
        .iter()
        .filter(|p| p.found)
        .map(|p| p.kind.as_str())
        .collect();
    let installed = !hits.is_empty();
    let summary = if installed {
        format!(
            "Operator '{}' appears to be installed (found in: {}).",
            operator,
            hits.join(", ")
        )
    } else if results.iter().all(|p| !p.outcome.success()) {
        let reason = results
            .first()
            .map(|p| p.outcome.failure_reason())
            .unwrap_or_else(|| "no lookups configured".to_string());
        format!(
            "Could not determine whether operator '{}' is installed: every lookup failed ({}).",
            operator, reason
        )
    } else {
        format!(
            "Operator '{}' was not found by any of {} lookups.",
            operator,
            results.len()
        )
    };

    info!(operator = %operator, installed = installed, "Operator check finished");
    OperatorCheckResult {
        query: query.to_string(),
        operator: operator.to_string(),
        installed,
        probes: results,
        summary,
    }
}
