// kubeintent-core/src/orchestrator.rs

//! Sequential execution of a command batch for one request.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::fallback::select_fallback;
use crate::models::execution::{BatchStatus, ExecutionOutcome, OrchestrationResult};
use crate::safety;
use crate::tools::ProcessRunner;

pub const NO_COMMANDS_SUMMARY: &str = "No executable command was found for this request.";

type FallbackSelector = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Runs commands one at a time, in order, through the safety gate and the
/// process runner. Holds no per-request state.
#[derive(Clone)]
pub struct Orchestrator {
    runner: ProcessRunner,
    timeout: Duration,
    audit: Arc<AuditLog>,
    fallback: FallbackSelector,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("runner", &self.runner)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(runner: ProcessRunner, timeout: Duration, audit: Arc<AuditLog>) -> Self {
        Self {
            runner,
            timeout,
            audit,
            fallback: Arc::new(select_fallback),
        }
    }

    /// Replaces the keyword fallback table, mainly for tests.
    pub fn with_fallback_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.fallback = Arc::new(selector);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Runs one command if the safety classifier allows it.
    ///
    /// Refused commands are never spawned; they get a synthetic
    /// [`ExecutionOutcome::rejected`] instead.
    pub async fn execute(&self, command: &str) -> ExecutionOutcome {
        let verdict = safety::classify(command);
        if !verdict.is_allowed() {
            self.audit.record_rejected(command, &verdict.to_string());
            return ExecutionOutcome::rejected(command);
        }
        let outcome = self.runner.run(command, self.timeout).await;
        self.audit.record_executed(&outcome);
        outcome
    }

    /// Runs every command in order. A failure does not stop the sequence.
    ///
    /// When every command fails, a fallback for `query` is tried once, using
    /// the first command as the reference.
    pub async fn run_all(&self, commands: &[String], query: &str) -> OrchestrationResult {
        if commands.is_empty() {
            info!(query = %query, "No commands to run");
            return OrchestrationResult::empty(query, NO_COMMANDS_SUMMARY);
        }

        info!(count = commands.len(), "Running command batch");
        let mut outcomes = Vec::with_capacity(commands.len());
        for (index, command) in commands.iter().enumerate() {
            debug!(index = index, command = %command, "Running batch command");
            outcomes.push(self.execute(command).await);
        }

        let total = outcomes.len();
        let succeeded = outcomes.iter().filter(|o| o.success()).count();

        let (status, summary, fallback) = if succeeded == total {
            (
                BatchStatus::Succeeded,
                format!("All {} command(s) succeeded.", total),
                None,
            )
        } else if succeeded > 0 {
            let (index, first_failure) = outcomes
                .iter()
                .enumerate()
                .find(|(_, o)| !o.success())
                .map(|(i, o)| (i, o.clone()))
                .unwrap_or_else(|| (0, outcomes[0].clone()));
            (
                BatchStatus::Partial,
                format!(
                    "{} of {} command(s) succeeded. First failure was command {} `{}`: {}",
                    succeeded,
                    total,
                    index + 1,
                    first_failure.command,
                    first_failure.failure_reason()
                ),
                None,
            )
        } else {
            self.attempt_fallback(query, &commands[0], &outcomes[0], total)
                .await
        };

        info!(status = ?status, succeeded = succeeded, total = total, "Command batch finished");
        OrchestrationResult {
            query: query.to_string(),
            commands: commands.to_vec(),
            outcomes,
            fallback,
            status,
            summary,
        }
    }

    async fn attempt_fallback(
        &self,
        query: &str,
        first_command: &str,
        first_outcome: &ExecutionOutcome,
        total: usize,
    ) -> (BatchStatus, String, Option<ExecutionOutcome>) {
        match (self.fallback)(query) {
            Some(candidate) if candidate.trim() != first_command.trim() => {
                info!(fallback = %candidate, "All commands failed, trying fallback");
                let outcome = self.execute(&candidate).await;
                if outcome.success() {
                    return (
                        BatchStatus::Rescued,
                        format!(
                            "All {} command(s) failed; fallback `{}` succeeded.",
                            total, candidate
                        ),
                        Some(outcome),
                    );
                }
                warn!(
                    fallback = %candidate,
                    exit_code = outcome.exit_code,
                    "Fallback command failed too"
                );
            }
            Some(_) => debug!("Fallback matches the first command, not retrying it"),
            None => debug!(query = %query, "No fallback available"),
        }

        (
            BatchStatus::Failed,
            format!(
                "All {} command(s) failed. First error: {}",
                total,
                first_outcome.failure_reason()
            ),
            None,
        )
    }
}
