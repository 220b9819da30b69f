// kubeintent-core/src/models/execution.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exit code reported when a command overran its time budget.
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Synthetic exit code for commands the safety classifier refused to run.
pub const SAFETY_REJECTED_EXIT_CODE: i32 = 126;
/// Exit code reported when the process could not be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

pub const SAFETY_REJECTED_MESSAGE: &str = "command rejected by safety policy";

/// How a command string is handed to the operating system.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// `sh -c <command>`, so pipes and redirects take effect.
    Shell,
    /// The first token is the program, the rest are its arguments. No shell.
    Direct,
}

/// Captured result of running one command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub command: String,
    /// Combined stdout and stderr, trimmed.
    pub output: String,
    /// Empty when there was no error.
    pub error: String,
    pub exit_code: i32,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionOutcome {
    pub fn new(
        command: impl Into<String>,
        output: impl Into<String>,
        error: impl Into<String>,
        exit_code: i32,
        duration: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            error: error.into(),
            exit_code,
            duration,
            timestamp: Utc::now(),
        }
    }

    /// Outcome for a command that was refused before execution.
    pub fn rejected(command: impl Into<String>) -> Self {
        Self::new(
            command,
            "",
            SAFETY_REJECTED_MESSAGE,
            SAFETY_REJECTED_EXIT_CODE,
            Duration::ZERO,
        )
    }

    /// Outcome for a command that was killed after `timeout`.
    pub fn timed_out(
        command: impl Into<String>,
        output: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self::new(
            command,
            output,
            format!("command timed out after {}", format_duration(timeout)),
            TIMEOUT_EXIT_CODE,
            timeout,
        )
    }

    /// Outcome for a process that could not be spawned.
    pub fn spawn_failed(
        command: impl Into<String>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self::new(command, "", error, SPAWN_FAILURE_EXIT_CODE, duration)
    }

    /// Checks if the command executed successfully (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn is_timeout(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }

    pub fn is_rejected(&self) -> bool {
        self.exit_code == SAFETY_REJECTED_EXIT_CODE && self.error == SAFETY_REJECTED_MESSAGE
    }

    /// The error text plus the first line of output, whichever exist.
    pub fn failure_reason(&self) -> String {
        let first_line = self.output.lines().next().filter(|l| !l.trim().is_empty());
        match (self.error.is_empty(), first_line) {
            (false, Some(line)) => format!("{}: {}", self.error, line),
            (false, None) => self.error.clone(),
            (true, Some(line)) => line.to_string(),
            (true, None) => "no output".to_string(),
        }
    }
}

/// Aggregate state of a command batch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Nothing was run.
    Empty,
    /// Every command exited 0.
    Succeeded,
    /// At least one command succeeded and at least one failed.
    Partial,
    /// Every command failed and no fallback rescued the request.
    Failed,
    /// Every command failed but the fallback succeeded.
    Rescued,
}

/// Outcome of running an ordered sequence of commands for one request.
///
/// `commands` and `outcomes` always have the same length and index
/// correspondence; both are empty only for [`BatchStatus::Empty`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrchestrationResult {
    pub query: String,
    pub commands: Vec<String>,
    pub outcomes: Vec<ExecutionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fallback: Option<ExecutionOutcome>,
    pub status: BatchStatus,
    pub summary: String,
}

impl OrchestrationResult {
    pub fn empty(query: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            commands: Vec::new(),
            outcomes: Vec::new(),
            fallback: None,
            status: BatchStatus::Empty,
            summary: summary.into(),
        }
    }

    /// "The" command for single-command callers.
    pub fn first_command(&self) -> Option<&str> {
        self.commands.first().map(String::as_str)
    }

    /// "The" result for single-command callers.
    pub fn first_outcome(&self) -> Option<&ExecutionOutcome> {
        self.outcomes.first()
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    pub fn first_failure(&self) -> Option<&ExecutionOutcome> {
        self.outcomes.iter().find(|o| !o.success())
    }
}

/// Renders a duration as whole seconds when possible ("30s"), else milliseconds.
pub fn format_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 && duration.as_secs() > 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejected_outcome_shape() {
        let outcome = ExecutionOutcome::rejected("rm -rf /");
        assert_eq!(outcome.exit_code, SAFETY_REJECTED_EXIT_CODE);
        assert!(outcome.is_rejected());
        assert!(!outcome.success());
        assert_eq!(outcome.duration, Duration::ZERO);
    }

    #[test]
    fn test_timed_out_uses_timeout_as_duration() {
        let outcome = ExecutionOutcome::timed_out("sleep 10", "", Duration::from_secs(2));
        assert_eq!(outcome.exit_code, TIMEOUT_EXIT_CODE);
        assert_eq!(outcome.duration, Duration::from_secs(2));
        assert_eq!(outcome.error, "command timed out after 2s");
        assert!(outcome.is_timeout());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::ZERO), "0ms");
    }

    #[test]
    fn test_failure_reason_combines_error_and_first_output_line() {
        let mut outcome =
            ExecutionOutcome::new("kubectl get x", "line one\nline two", "", 1, Duration::ZERO);
        assert_eq!(outcome.failure_reason(), "line one");
        outcome.error = "exit status 1".to_string();
        assert_eq!(outcome.failure_reason(), "exit status 1: line one");
        outcome.output.clear();
        assert_eq!(outcome.failure_reason(), "exit status 1");
        outcome.error.clear();
        assert_eq!(outcome.failure_reason(), "no output");
    }

    #[test]
    fn test_outcome_serializes_duration_as_millis() {
        let outcome =
            ExecutionOutcome::new("kubectl version", "v1", "", 0, Duration::from_millis(250));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["duration_ms"], json!(250));
        assert_eq!(value["exit_code"], json!(0));
        let back: ExecutionOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(back.duration, Duration::from_millis(250));
    }

    #[test]
    fn test_empty_result_has_no_first_entries() {
        let result = OrchestrationResult::empty("do nothing", "no commands produced");
        assert_eq!(result.status, BatchStatus::Empty);
        assert!(result.first_command().is_none());
        assert!(result.first_outcome().is_none());
        assert!(result.first_failure().is_none());
    }
}
