// kubeintent-core/src/audit.rs

//! Process-wide, append-only record of every command the core ran or refused.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::models::execution::ExecutionOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Executed,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub command: String,
    pub exit_code: Option<i32>,
    pub detail: String,
}

/// Appends are serialized behind a mutex, so concurrent requests may share one log.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rejected(&self, command: &str, reason: &str) {
        warn!(
            target: "kubeintent::audit",
            command = %command,
            reason = %reason,
            "Command rejected"
        );
        self.push(AuditEntry {
            timestamp: Utc::now(),
            action: AuditAction::Rejected,
            command: command.to_string(),
            exit_code: None,
            detail: reason.to_string(),
        });
    }

    pub fn record_executed(&self, outcome: &ExecutionOutcome) {
        info!(
            target: "kubeintent::audit",
            command = %outcome.command,
            exit_code = outcome.exit_code,
            duration_ms = outcome.duration.as_millis() as u64,
            "Command executed"
        );
        self.push(AuditEntry {
            timestamp: outcome.timestamp,
            action: AuditAction::Executed,
            command: outcome.command.clone(),
            exit_code: Some(outcome.exit_code),
            detail: outcome.error.clone(),
        });
    }

    /// Copy of every entry so far, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, entry: AuditEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
